//! Typed POST and GET helpers over the shared reqwest client.
//!
//! Each helper resolves to exactly one `Result`: either the parsed JSON
//! document of a 2xx response, or a classified error. Redirects are followed
//! by the client.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{AuthError, Result, Status};

/// Encoding applied to a POST body before it is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ContentType {
    /// Percent-encode the body and send it as a form.
    FormUrlEncoded,
    /// Send the body verbatim as JSON.
    Json,
}

/// Percent-encodes everything except alphanumerics and `- _ . = & +`.
///
/// The preserve set includes the form separators so that a pre-formed
/// `key=value&key=value` body round-trips unchanged. Only bodies and query
/// values go through this; URLs are never passed whole.
pub(crate) fn url_encode(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_' | b'.' | b'=' | b'&' | b'+' => {
                escaped.push(byte as char)
            }
            _ => escaped.push_str(&format!("%{:02X}", byte)),
        }
    }
    escaped
}

pub(crate) async fn post(
    client: &reqwest::Client,
    url: &str,
    body: &str,
    content_type: ContentType,
) -> Result<Value> {
    let encoded_body = match content_type {
        ContentType::FormUrlEncoded => url_encode(body),
        ContentType::Json => body.to_owned(),
    };

    let request = client.post(url).header(CONTENT_LENGTH, encoded_body.len());
    let request = match content_type {
        ContentType::FormUrlEncoded => {
            request.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        }
        ContentType::Json => request
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json"),
    };

    let response = request
        .body(encoded_body)
        .send()
        .await
        .map_err(|error| AuthError::new(Status::NetworkError, format!("POST error: {}", error)))?;
    read_json_response(response).await
}

pub(crate) async fn get(client: &reqwest::Client, url: &str, access_token: &str) -> Result<Value> {
    let response = client
        .get(url)
        .header(AUTHORIZATION, format!("Bearer {}", access_token))
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|error| AuthError::new(Status::NetworkError, format!("GET error: {}", error)))?;
    read_json_response(response).await
}

async fn read_json_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.map_err(|error| {
        AuthError::new(
            Status::NetworkError,
            format!("Failed to read response with status {}: {}", status, error),
        )
    })?;

    if !status.is_success() {
        return Err(AuthError::new(
            Status::OauthServerError,
            format!(
                "Received status code:{}, and response body:{}",
                status.as_u16(),
                body
            ),
        ));
    }

    // The revocation endpoint answers 2xx with no body; callers that care
    // about the document treat null as missing fields.
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body)
        .map_err(|error| AuthError::new(Status::BadResponse, format!("JSON parse error: {}", error)))
}

/// Deserializes an endpoint document, reporting the pretty-printed response
/// when required fields are missing.
pub(crate) fn parse_response<T: DeserializeOwned>(document: Value) -> Result<T> {
    serde_json::from_value(document.clone()).map_err(|_| {
        AuthError::new(
            Status::BadResponse,
            format!("Invalid response: {}", pretty(&document)),
        )
    })
}

pub(crate) fn pretty(document: &Value) -> String {
    serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string())
}
