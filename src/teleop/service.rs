//! Boolean request/response triggers for the runtime flags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which flag a trigger toggles
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Publish velocity commands or not
    Enable,
    /// Forward (`true`) or backward (`false`) drive direction
    DriveForward,
    /// Car style (`true`) or normal (`false`) turning
    CarStyleTurning,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Enable => write!(f, "enable"),
            ServiceKind::DriveForward => write!(f, "drive_forward"),
            ServiceKind::CarStyleTurning => write!(f, "car_style_turning"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub message: String,
}

impl ServiceResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
struct BoolRequest {
    data: bool,
}

/// Accepts `true`/`false` (any case, surrounding whitespace ignored), `1`/`0`
/// or `{"data": bool}`
pub fn parse_bool_request(payload: &[u8]) -> Option<bool> {
    let text = std::str::from_utf8(payload).ok()?.trim();
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" => return Some(true),
        "false" | "0" => return Some(false),
        _ => {}
    }
    serde_json::from_str::<BoolRequest>(text)
        .ok()
        .map(|request| request.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_json_payloads() {
        assert_eq!(parse_bool_request(b"true"), Some(true));
        assert_eq!(parse_bool_request(b" False\n"), Some(false));
        assert_eq!(parse_bool_request(b"1"), Some(true));
        assert_eq!(parse_bool_request(br#"{"data": false}"#), Some(false));
        assert_eq!(parse_bool_request(br#"{"data": true}"#), Some(true));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_bool_request(b"yes please"), None);
        assert_eq!(parse_bool_request(br#"{"data": 3}"#), None);
        assert_eq!(parse_bool_request(&[0xff, 0xfe]), None);
    }

    #[test]
    fn response_serializes_like_a_set_bool_reply() {
        let json = serde_json::to_string(&ServiceResponse::ok("Driving forward")).unwrap();
        assert_eq!(json, r#"{"success":true,"message":"Driving forward"}"#);
    }
}
