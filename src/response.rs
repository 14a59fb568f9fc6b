//! Invocation response encoding.
//!
//! The application's `http::Response` is flattened into the payload shape
//! API Gateway expects. REST responses keep repeated header names distinct
//! in `multiValueHeaders`; HTTP API responses join repeated values with a
//! comma and carry `set-cookie` values in the dedicated `cookies` array.
//! Bodies that are not text travel base64-encoded with the
//! `isBase64Encoded` flag set.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use http::header::{HeaderMap, CONTENT_TYPE, SET_COOKIE};
use http::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::event::PayloadFormat;

/// The payload handed back to the platform. Every invocation produces one
/// of these, including failed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<String>>,
    pub body: String,
    pub is_base64_encoded: bool,
}

pub(crate) fn encode_response(
    response: Response<Bytes>,
    format: PayloadFormat,
) -> InvocationResponse {
    let (parts, body) = response.into_parts();
    let (body, is_base64_encoded) = encode_body(&parts.headers, &body);

    let mut headers = HashMap::new();
    let mut multi_value_headers = HashMap::new();
    let mut cookies = Vec::new();

    for name in parts.headers.keys() {
        let values: Vec<String> = parts
            .headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();

        if format == PayloadFormat::Http && name == &SET_COOKIE {
            cookies.extend(values);
            continue;
        }
        headers.insert(name.as_str().to_string(), values.join(","));
        multi_value_headers.insert(name.as_str().to_string(), values);
    }

    InvocationResponse {
        status_code: parts.status.as_u16(),
        headers,
        multi_value_headers: match format {
            PayloadFormat::Rest => Some(multi_value_headers),
            PayloadFormat::Http => None,
        },
        cookies: match format {
            PayloadFormat::Http if !cookies.is_empty() => Some(cookies),
            _ => None,
        },
        body,
        is_base64_encoded,
    }
}

/// Synthetic response for faults the adapter absorbs: malformed events and
/// application failures. Always well-formed, never format-specific.
pub(crate) fn error_response(status: StatusCode, error: &str, message: &str) -> InvocationResponse {
    InvocationResponse {
        status_code: status.as_u16(),
        headers: HashMap::from([(
            "content-type".to_string(),
            "application/json".to_string(),
        )]),
        multi_value_headers: None,
        cookies: None,
        body: json!({"error": error, "message": message}).to_string(),
        is_base64_encoded: false,
    }
}

/// A body travels as text when its declared content type is textual and
/// the bytes are valid UTF-8; anything else is base64-encoded.
fn encode_body(headers: &HeaderMap, body: &Bytes) -> (String, bool) {
    if body.is_empty() {
        return (String::new(), false);
    }

    let declared_text = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(true, is_text_mime);

    match std::str::from_utf8(body) {
        Ok(text) if declared_text => (text.to_string(), false),
        _ => (BASE64.encode(body), true),
    }
}

fn is_text_mime(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/")
        || matches!(
            mime.as_str(),
            "application/json" | "application/javascript" | "application/xml"
        )
        || mime.ends_with("+json")
        || mime.ends_with("+xml")
}
