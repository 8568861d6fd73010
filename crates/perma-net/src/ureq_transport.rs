use std::io::Read;

use tracing::debug;

use crate::config::NetConfig;
use crate::error::{NetError, NetResult};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Production transport backed by a shared `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl UreqTransport {
    pub fn new(config: &NetConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn read_body(&self, url: &str, response: ureq::Response) -> NetResult<HttpResponse> {
        let status = response.status();
        let final_url = response.get_url().to_string();
        let body = read_limited(url, response.into_reader(), self.max_body_bytes)?;
        Ok(HttpResponse {
            status,
            url: final_url,
            body,
        })
    }
}

/// Read at most `max` bytes; a longer body is an error rather than a
/// truncated success.
fn read_limited(url: &str, reader: impl Read, max: u64) -> NetResult<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .take(max.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|e| NetError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    if body.len() as u64 > max {
        return Err(NetError::Decode {
            url: url.to_string(),
            message: format!("body exceeds {max} bytes"),
        });
    }
    Ok(body)
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&NetConfig::default())
    }
}

impl HttpTransport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> NetResult<HttpResponse> {
        debug!(method = request.method.as_str(), url = %request.url, "HTTP request");

        let mut call = self.agent.request(request.method.as_str(), &request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match &request.body {
            Some(body) => call.send_bytes(body),
            None => call.call(),
        };

        match result {
            Ok(response) => self.read_body(&request.url, response),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(NetError::Status {
                    status,
                    url: request.url.clone(),
                    body,
                })
            }
            Err(ureq::Error::Transport(transport)) => Err(NetError::Transport {
                url: request.url.clone(),
                message: transport.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const URL: &str = "https://files.example/media/big.mp4";

    #[test]
    fn body_within_limit_is_read_whole() {
        let body = read_limited(URL, Cursor::new(vec![7u8; 10]), 10).unwrap();
        assert_eq!(body.len(), 10);
    }

    #[test]
    fn oversized_body_is_rejected_not_truncated() {
        let err = read_limited(URL, Cursor::new(vec![7u8; 100]), 10).unwrap_err();
        match &err {
            NetError::Decode { url, message } => {
                assert_eq!(url, URL);
                assert!(message.contains("exceeds 10 bytes"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.is_transient());
    }

    #[test]
    fn one_byte_over_is_rejected() {
        assert!(read_limited(URL, Cursor::new(vec![0u8; 11]), 10).is_err());
        assert!(read_limited(URL, Cursor::new(Vec::new()), 0).unwrap().is_empty());
    }
}
