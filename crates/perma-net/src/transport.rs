use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{NetError, NetResult};

/// HTTP method. Only what the platform clients need.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A single outbound request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// POST with a JSON body and matching content type.
    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> NetResult<Self> {
        let url = url.into();
        let bytes = serde_json::to_vec(body).map_err(|e| NetError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            method: Method::Post,
            url,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Some(bytes),
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }
}

/// A successful (2xx/3xx) response with its body fully read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn text(&self) -> NetResult<String> {
        String::from_utf8(self.body.clone()).map_err(|e| NetError::Decode {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> NetResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| NetError::Decode {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }
}

/// Blocking HTTP client.
///
/// Implementations return `Err(NetError::Status)` for 4xx/5xx so callers
/// never have to inspect the status of an `Ok` response.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> NetResult<HttpResponse>;

    fn get(&self, url: &str) -> NetResult<HttpResponse> {
        self.execute(&HttpRequest::get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_json_sets_body_and_type() {
        let req = HttpRequest::post_json("https://x.example", &json!({"a": 1})).unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
        assert!(req
            .headers
            .contains(&("Content-Type".into(), "application/json".into())));
    }

    #[test]
    fn bearer_header() {
        let req = HttpRequest::get("https://x.example").bearer("tok");
        assert_eq!(req.headers, vec![("Authorization".into(), "Bearer tok".into())]);
    }

    #[test]
    fn response_decoding() {
        let resp = HttpResponse {
            status: 200,
            url: "https://x.example".into(),
            body: br#"{"id": "1"}"#.to_vec(),
        };
        let v: serde_json::Value = resp.json().unwrap();
        assert_eq!(v["id"], "1");
        assert_eq!(resp.text().unwrap(), r#"{"id": "1"}"#);

        let bad = HttpResponse {
            body: b"<html>".to_vec(),
            ..resp
        };
        assert!(bad.json::<serde_json::Value>().is_err());
    }
}
