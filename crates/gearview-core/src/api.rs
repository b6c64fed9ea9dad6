//! Model generation API wire types
//!
//! Shared by the browser viewer and the native CLI so both interpret backend
//! responses the same way:
//!
//! - `POST {backend}/generate-model` with `{"command": "..."}`
//! - `POST {backend}/{part_type}` with the parameter set
//!
//! Both answer `{"glb_base64": "...", "parsed"?: {"type", "params"}, "params"?: {...}}`.

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::glb::{GlbError, GlbHeader};
use crate::params::ParamSet;

/// Longest error body echoed back to the user
const MAX_ERROR_BODY: usize = 200;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Payload is not a GLB model: {0}")]
    NotGlb(#[from] GlbError),
}

/// Body of `POST /generate-model`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub command: String,
}

/// Backend's interpretation of a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub params: ParamSet,
}

/// Successful response of either generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub glb_base64: String,
    /// Echo of the submitted command
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub parsed: Option<ParsedCommand>,
    /// Parameters actually used (parameter update endpoint)
    #[serde(default)]
    pub params: Option<ParamSet>,
}

/// Error body shapes the backend uses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A decoded model ready for the loading pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedModel {
    pub bytes: Vec<u8>,
    /// Part type, if the backend reported one or the request named it
    pub part_type: Option<String>,
    /// Parameters, if the backend reported them
    pub params: Option<ParamSet>,
}

impl GenerateRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl GenerateResponse {
    /// Decode the payload and attach whatever part information is known
    ///
    /// `requested_part` is the part type the request was made for, used when the
    /// backend does not report one.
    pub fn into_model(self, requested_part: Option<&str>) -> Result<GeneratedModel, ApiError> {
        let bytes = decode_glb(&self.glb_base64)?;

        let (part_type, params) = match self.parsed {
            Some(parsed) => (Some(parsed.part_type), Some(parsed.params)),
            None => (requested_part.map(str::to_string), self.params),
        };

        Ok(GeneratedModel {
            bytes,
            part_type,
            params,
        })
    }
}

/// Decode a base64 GLB payload and check its header
pub fn decode_glb(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned.as_bytes())?;
    GlbHeader::parse(&bytes)?;
    Ok(bytes)
}

/// Interpret an HTTP status and body from a generation endpoint
pub fn parse_generate_response(status: u16, body: &str) -> Result<GenerateResponse, ApiError> {
    if !(200..300).contains(&status) {
        return Err(ApiError::Status {
            status,
            message: error_message(body),
        });
    }
    Ok(serde_json::from_str(body)?)
}

/// Best-effort human readable message from an error body
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.error.or(parsed.message) {
            return msg;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glb::minimal_glb;

    fn encoded_glb() -> String {
        base64::engine::general_purpose::STANDARD.encode(minimal_glb())
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_string(&GenerateRequest::new("画个齿轮")).unwrap();
        assert_eq!(body, r#"{"command":"画个齿轮"}"#);
    }

    #[test]
    fn test_generate_response_with_parsed() {
        let body = format!(
            r#"{{"glb_base64":"{}","command":"20齿齿轮","parsed":{{"type":"gear","params":{{"teeth":20,"module":1.0,"width":5.0,"bore_diameter":3.0}}}}}}"#,
            encoded_glb()
        );
        let response = parse_generate_response(200, &body).unwrap();
        let model = response.into_model(None).unwrap();

        assert_eq!(model.bytes, minimal_glb());
        assert_eq!(model.part_type.as_deref(), Some("gear"));
        assert_eq!(model.params.unwrap()["teeth"], 20.0);
    }

    #[test]
    fn test_param_update_response_uses_requested_part() {
        let body = format!(r#"{{"glb_base64":"{}","params":{{"size":12.5}}}}"#, encoded_glb());
        let model = parse_generate_response(200, &body)
            .unwrap()
            .into_model(Some("cube"))
            .unwrap();

        assert_eq!(model.part_type.as_deref(), Some("cube"));
        assert_eq!(model.params.unwrap()["size"], 12.5);
    }

    #[test]
    fn test_error_status() {
        let err = parse_generate_response(400, r#"{"error":"未识别到有效建模指令","text":"x"}"#).unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "未识别到有效建模指令");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = parse_generate_response(502, "Bad Gateway").unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, ref message } if message == "Bad Gateway"));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_generate_response(200, "<html>"),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(
            parse_generate_response(200, r#"{"command":"x"}"#),
            Err(ApiError::Malformed(_))
        ));
    }

    #[test]
    fn test_bad_payloads() {
        assert!(matches!(decode_glb("!!not base64!!"), Err(ApiError::Base64(_))));

        let not_glb = base64::engine::general_purpose::STANDARD.encode(b"solid ascii stl");
        assert!(matches!(
            decode_glb(&not_glb),
            Err(ApiError::NotGlb(GlbError::BadMagic(_)))
        ));
    }

    #[test]
    fn test_payload_with_line_breaks() {
        let encoded = encoded_glb();
        let (a, b) = encoded.split_at(8);
        let wrapped = format!("{a}\n{b}\r\n");
        assert_eq!(decode_glb(&wrapped).unwrap(), minimal_glb());
    }
}
