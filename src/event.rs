//! Invocation event destructuring.
//!
//! API Gateway delivers one of two payload shapes: the REST API ("v1")
//! shape keyed by `httpMethod`, which carries repeated header and query
//! names natively in `multiValue*` maps, and the HTTP API ("v2") shape
//! marked `"version": "2.0"`, which pre-joins repeated headers with commas
//! and splits cookies into their own array. Both are destructured into a
//! plain `http::Request` so the application never sees platform schema.

use std::collections::HashMap;
use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use http::{Method, Request, Uri};
use serde::Deserialize;
use serde_json::Value;

use crate::error::EventError;

/// Which payload shape delivered the event. The response encoder needs
/// this: REST responses may carry repeated header names distinctly, HTTP
/// API responses may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// REST API, payload format 1.0.
    Rest,
    /// HTTP API, payload format 2.0.
    Http,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestEvent {
    http_method: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    headers: Option<HashMap<String, String>>,
    #[serde(default)]
    multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    multi_value_query_string_parameters: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpEvent {
    raw_path: String,
    #[serde(default)]
    raw_query_string: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    cookies: Vec<String>,
    request_context: HttpRequestContext,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: bool,
}

#[derive(Debug, Deserialize)]
struct HttpRequestContext {
    http: HttpDescriptor,
}

#[derive(Debug, Deserialize)]
struct HttpDescriptor {
    method: String,
}

/// Destructure an invocation payload into a synthetic request.
pub(crate) fn parse_event(
    payload: &Value,
    base_path: Option<&str>,
) -> Result<(Request<Bytes>, PayloadFormat), EventError> {
    let object = payload.as_object().ok_or(EventError::NotAnObject)?;

    if object.get("version").and_then(Value::as_str) == Some("2.0") {
        let event = HttpEvent::deserialize(payload)?;
        Ok((http_request(event, base_path)?, PayloadFormat::Http))
    } else if object.contains_key("httpMethod") {
        let event = RestEvent::deserialize(payload)?;
        Ok((rest_request(event, base_path)?, PayloadFormat::Rest))
    } else {
        Err(EventError::UnrecognizedFormat)
    }
}

fn rest_request(event: RestEvent, base_path: Option<&str>) -> Result<Request<Bytes>, EventError> {
    let method = Method::from_bytes(event.http_method.as_bytes())?;
    let path = strip_base_path(event.path.as_deref().unwrap_or("/"), base_path);

    // multiValue* maps are the superset when both are present.
    let query = if let Some(params) = &event.multi_value_query_string_parameters {
        let pairs = params
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name, value)));
        encode_query(pairs)
    } else if let Some(params) = &event.query_string_parameters {
        encode_query(params.iter())
    } else {
        String::new()
    };

    let mut headers = HeaderMap::new();
    if let Some(multi) = &event.multi_value_headers {
        for (name, values) in multi {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            for value in values {
                headers.append(name.clone(), HeaderValue::from_str(value)?);
            }
        }
    } else if let Some(single) = &event.headers {
        for (name, value) in single {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            headers.append(name, HeaderValue::from_str(value)?);
        }
    }

    let body = decode_body(event.body, event.is_base64_encoded)?;
    assemble(method, &path, &query, headers, body)
}

fn http_request(event: HttpEvent, base_path: Option<&str>) -> Result<Request<Bytes>, EventError> {
    let method = Method::from_bytes(event.request_context.http.method.as_bytes())?;
    let path = strip_base_path(&event.raw_path, base_path);

    let mut headers = HeaderMap::new();
    for (name, value) in &event.headers {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        headers.append(name, HeaderValue::from_str(value)?);
    }
    // HTTP API strips cookies out of the header map; put them back where
    // the application expects them.
    if !event.cookies.is_empty() {
        headers.insert(COOKIE, HeaderValue::from_str(&event.cookies.join("; "))?);
    }

    let body = decode_body(event.body, event.is_base64_encoded)?;
    assemble(method, &path, &event.raw_query_string, headers, body)
}

fn assemble(
    method: Method,
    path: &str,
    query: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Request<Bytes>, EventError> {
    let path = encode_path(path);
    let target = if query.is_empty() {
        path
    } else {
        format!("{path}?{query}")
    };
    let uri: Uri = target.parse()?;

    let mut request = Request::new(body);
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;
    Ok(request)
}

fn decode_body(body: Option<String>, is_base64_encoded: bool) -> Result<Bytes, EventError> {
    match body {
        None => Ok(Bytes::new()),
        Some(text) if is_base64_encoded => Ok(Bytes::from(BASE64.decode(text)?)),
        Some(text) => Ok(Bytes::from(text)),
    }
}

/// Remove a configured stage prefix (e.g. `/prod`) from the request path.
fn strip_base_path(path: &str, base_path: Option<&str>) -> String {
    let path = if path.is_empty() { "/" } else { path };
    let Some(base) = base_path else {
        return path.to_string();
    };

    let prefix = format!("/{}", base.trim_matches('/'));
    match path.strip_prefix(&prefix) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Rebuild a query string from decoded parameters, percent-encoding each
/// name and value (RFC 3986 unreserved characters pass through).
fn encode_query<I, K, V>(pairs: I) -> String
where
    I: Iterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut query = String::new();
    for (name, value) in pairs {
        if !query.is_empty() {
            query.push('&');
        }
        encode_component(&mut query, name.as_ref());
        query.push('=');
        encode_component(&mut query, value.as_ref());
    }
    query
}

fn encode_component(out: &mut String, raw: &str) {
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
}

/// Re-encode any bytes a URI cannot carry literally, leaving existing
/// percent escapes and path structure alone.
fn encode_path(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'.'
            | b'_'
            | b'~'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b':'
            | b'@'
            | b'/'
            | b'%' => out.push(byte as char),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
