// Request parser - request line and query string from a single read

use std::collections::HashMap;
use std::fmt;

/// Request line and query parameters taken from one connection.
///
/// Headers and body are never consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// HTTP method as sent (GET, POST, ...)
    pub method: String,
    /// Path with the query string removed
    pub path: String,
    /// Decoded query parameters, last value wins on duplicate keys
    pub query_params: HashMap<String, String>,
}

impl ParsedRequest {
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Peer sent nothing before closing or timing out
    Empty,
    /// Request line lacks a method and a path
    MalformedRequestLine(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty request"),
            Self::MalformedRequestLine(line) => write!(f, "malformed request line: {:?}", line),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse the bytes of a single read into a `ParsedRequest`.
pub fn parse_request(buf: &[u8]) -> Result<ParsedRequest, ParseError> {
    if buf.is_empty() {
        return Err(ParseError::Empty);
    }

    let text = String::from_utf8_lossy(buf);
    let request_line = text.split("\r\n").next().unwrap_or("");

    let mut parts = request_line.split(' ').filter(|p| !p.is_empty());
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method, target),
        _ => return Err(ParseError::MalformedRequestLine(request_line.to_string())),
    };

    let (path, query_params) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query_string(query)),
        None => (target, HashMap::new()),
    };

    Ok(ParsedRequest {
        method: method.to_string(),
        path: path.to_string(),
        query_params,
    })
}

/// Split `a=1&b=2` into a map.
///
/// Only `key=value` pairs with a non-empty key and a value are kept; `a`,
/// `a=` and `a=b=c` are dropped.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        let mut kv = pair.split('=');
        let (key, value) = match (kv.next(), kv.next(), kv.next()) {
            (Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() => (key, value),
            _ => continue,
        };
        params.insert(decode_component(key), decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}
