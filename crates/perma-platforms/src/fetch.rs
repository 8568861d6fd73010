//! HTTP helpers shared by the platform strategies.

use perma_chain::{StrategyError, StrategyResult};
use perma_net::{HttpRequest, HttpTransport, NetError};
use serde_json::Value;

/// Map a transport error onto the strategy taxonomy. A definitive
/// "gone" from the server is `NotFound`; everything else is a network
/// failure and the chain falls through.
pub fn classify(error: NetError) -> StrategyError {
    match error.status() {
        Some(404) | Some(410) => StrategyError::NotFound(error.to_string()),
        _ => StrategyError::Network(error),
    }
}

pub fn get_json(transport: &dyn HttpTransport, request: &HttpRequest) -> StrategyResult<Value> {
    let response = transport.execute(request).map_err(classify)?;
    response.json().map_err(|e| StrategyError::Malformed(e.to_string()))
}

pub fn get_text(transport: &dyn HttpTransport, request: &HttpRequest) -> StrategyResult<String> {
    let response = transport.execute(request).map_err(classify)?;
    response.text().map_err(|e| StrategyError::Malformed(e.to_string()))
}
