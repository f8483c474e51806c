//! IPC protocol and webhook request types for notehub-daemon.
//!
//! This crate is shared by the daemon, the tracker core and the CLI so the
//! request schema cannot drift between them. The daemon remains the authority
//! on validation; clients reuse the same types to build requests.
//!
//! A webhook request mirrors what a plain HTTP endpoint would receive: a flat
//! map of query parameters plus an optional raw body. Parsing it yields a
//! [`ParsedWebhook`] with a strict [`Action`] and normalized booleans, so the
//! tracker core never sees `"true"`/`"false"` strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Method {
    GetHealth,
    Webhook,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }

    /// Wraps a webhook reply. `ok` mirrors the reply's success flag and the
    /// reply body always travels in `data`, failures included.
    pub fn from_reply(id: Option<String>, reply: &WebhookReply) -> Self {
        let data = serde_json::to_value(reply).unwrap_or(Value::Null);
        if reply.is_success() {
            return Self::ok(id, data);
        }
        let message = reply.error.clone().unwrap_or_default();
        Self {
            ok: false,
            id,
            data: Some(data),
            error: Some(ErrorInfo::new(reply.error_code(), message)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Webhook Requests
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw inbound webhook: query parameters plus the untouched request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebhookRequest {
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl WebhookRequest {
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Append,
    SetConfig,
    RegisterDoc,
    UpdateStats,
}

impl Action {
    /// `applyStatsSettings` is accepted as an alias of `setConfig`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "append" => Some(Self::Append),
            "setConfig" | "applyStatsSettings" => Some(Self::SetConfig),
            "registerDoc" => Some(Self::RegisterDoc),
            "updateStats" => Some(Self::UpdateStats),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::SetConfig => "setConfig",
            Self::RegisterDoc => "registerDoc",
            Self::UpdateStats => "updateStats",
        }
    }
}

/// Tracker settings carried by a request. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub stats_top: Option<bool>,
    pub stats_bottom: Option<bool>,
    pub stats_anywhere: Option<bool>,
    pub timezone: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.stats_top.is_none()
            && self.stats_bottom.is_none()
            && self.stats_anywhere.is_none()
            && self.timezone.is_none()
    }
}

/// A validated webhook, ready for the tracker pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedWebhook {
    pub token: String,
    pub doc_id: String,
    pub action: Action,
    /// Content to append: the `text` parameter, else the raw body.
    pub text: Option<String>,
    pub settings: SettingsPatch,
}

/// Validates a raw webhook.
///
/// The action comes from the `action` parameter (default `append`) unless the
/// body is a JSON object with a string `mode`. A body that is not JSON is not
/// an error; it is simply not consulted for overrides.
pub fn parse_webhook(request: &WebhookRequest) -> Result<ParsedWebhook, ErrorInfo> {
    let payload = parse_payload(request.body.as_deref());

    let mut action_name = request.param("action").unwrap_or("append").to_string();
    if let Some(mode) = payload
        .as_ref()
        .and_then(|object| object.get("mode"))
        .and_then(Value::as_str)
        .filter(|mode| !mode.is_empty())
    {
        action_name = mode.to_string();
    }

    let (token, doc_id) = match (request.param("token"), request.param("docId")) {
        (Some(token), Some(doc_id)) => (token.to_string(), doc_id.to_string()),
        _ => {
            return Err(ErrorInfo::new(
                "invalid_params",
                "Invalid token or docId",
            ))
        }
    };

    let action = Action::parse(&action_name).ok_or_else(|| {
        ErrorInfo::new("unknown_action", format!("Unknown action: {}", action_name))
    })?;

    let text = request
        .param("text")
        .map(str::to_string)
        .or_else(|| request.body.clone().filter(|body| !body.is_empty()));

    Ok(ParsedWebhook {
        token,
        doc_id,
        action,
        text,
        settings: merge_settings(request, payload.as_ref()),
    })
}

/// Normalizes a boolean-like value: native booleans or the strings
/// `"true"`/`"false"`. Anything else is treated as absent.
pub fn parse_bool_like(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => parse_bool_str(text),
        _ => None,
    }
}

pub fn parse_bool_str(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_payload(body: Option<&str>) -> Option<Map<String, Value>> {
    let body = body?.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Body fields win over query parameters, field by field.
fn merge_settings(request: &WebhookRequest, payload: Option<&Map<String, Value>>) -> SettingsPatch {
    let body_bool = |key: &str| payload.and_then(|object| object.get(key)).and_then(parse_bool_like);
    let query_bool = |key: &str| request.param(key).and_then(parse_bool_str);

    let timezone = payload
        .and_then(|object| object.get("timezone"))
        .and_then(Value::as_str)
        .filter(|tz| !tz.is_empty())
        .map(str::to_string)
        .or_else(|| request.param("timezone").map(str::to_string));

    SettingsPatch {
        stats_top: body_bool("statsTop").or_else(|| query_bool("statsTop")),
        stats_bottom: body_bool("statsBottom").or_else(|| query_bool("statsBottom")),
        stats_anywhere: body_bool("statsAnywhere").or_else(|| query_bool("statsAnywhere")),
        timezone,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Webhook Replies
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON reply body. Success replies carry `success: true`; failures carry
/// only `error`. `status` is a nominal HTTP-like code and is not serialized,
/// since hosts are not guaranteed to propagate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub status: u16,
}

impl WebhookReply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            message: Some(message.into()),
            config: None,
            error: None,
            status: 200,
        }
    }

    pub fn with_config(config: Value) -> Self {
        Self {
            success: Some(true),
            message: None,
            config: Some(config),
            error: None,
            status: 200,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failure(message, 400)
    }

    pub fn critical(detail: impl std::fmt::Display) -> Self {
        Self::failure(format!("Critical Error: {}", detail), 500)
    }

    fn failure(message: impl Into<String>, status: u16) -> Self {
        Self {
            success: None,
            message: None,
            config: None,
            error: Some(message.into()),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.success == Some(true)
    }

    fn error_code(&self) -> &'static str {
        if self.status >= 500 {
            "critical_error"
        } else {
            "bad_request"
        }
    }
}

impl From<ErrorInfo> for WebhookReply {
    fn from(info: ErrorInfo) -> Self {
        Self::bad_request(info.message)
    }
}

pub fn parse_webhook_params(params: Value) -> Result<WebhookRequest, ErrorInfo> {
    serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("webhook payload is invalid JSON: {}", err),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> WebhookRequest {
        WebhookRequest::default()
            .with_param("token", "tok-1")
            .with_param("docId", "doc-1")
    }

    #[test]
    fn defaults_to_append() {
        let parsed = parse_webhook(&base_request().with_param("text", "hi")).unwrap();
        assert_eq!(parsed.action, Action::Append);
        assert_eq!(parsed.text.as_deref(), Some("hi"));
    }

    #[test]
    fn rejects_missing_token_or_doc() {
        let request = WebhookRequest::default().with_param("token", "tok-1");
        let err = parse_webhook(&request).unwrap_err();
        assert_eq!(err.message, "Invalid token or docId");

        let request = WebhookRequest::default()
            .with_param("token", "")
            .with_param("docId", "doc-1");
        assert!(parse_webhook(&request).is_err());
    }

    #[test]
    fn rejects_unknown_action() {
        let err = parse_webhook(&base_request().with_param("action", "explode")).unwrap_err();
        assert_eq!(err.message, "Unknown action: explode");
    }

    #[test]
    fn apply_stats_settings_is_set_config() {
        let parsed =
            parse_webhook(&base_request().with_param("action", "applyStatsSettings")).unwrap();
        assert_eq!(parsed.action, Action::SetConfig);
    }

    #[test]
    fn body_mode_overrides_action() {
        let request = base_request()
            .with_param("action", "append")
            .with_body(r#"{"mode":"setConfig","statsTop":true}"#);
        let parsed = parse_webhook(&request).unwrap();
        assert_eq!(parsed.action, Action::SetConfig);
        assert_eq!(parsed.settings.stats_top, Some(true));
    }

    #[test]
    fn malformed_body_falls_back_to_query() {
        let request = base_request()
            .with_param("action", "setConfig")
            .with_param("statsBottom", "false")
            .with_body("{not json");
        let parsed = parse_webhook(&request).unwrap();
        assert_eq!(parsed.action, Action::SetConfig);
        assert_eq!(parsed.settings.stats_bottom, Some(false));
    }

    #[test]
    fn body_fields_override_query_fields() {
        let request = base_request()
            .with_param("action", "setConfig")
            .with_param("statsTop", "false")
            .with_param("statsBottom", "true")
            .with_param("timezone", "UTC")
            .with_body(r#"{"statsTop":"true","timezone":"Europe/Paris"}"#);
        let parsed = parse_webhook(&request).unwrap();
        assert_eq!(parsed.settings.stats_top, Some(true));
        assert_eq!(parsed.settings.stats_bottom, Some(true));
        assert_eq!(parsed.settings.timezone.as_deref(), Some("Europe/Paris"));
    }

    #[test]
    fn plain_body_is_append_text() {
        let parsed = parse_webhook(&base_request().with_body("note from phone")).unwrap();
        assert_eq!(parsed.action, Action::Append);
        assert_eq!(parsed.text.as_deref(), Some("note from phone"));
    }

    #[test]
    fn bool_like_values() {
        assert_eq!(parse_bool_like(&Value::Bool(true)), Some(true));
        assert_eq!(parse_bool_like(&Value::String("false".into())), Some(false));
        assert_eq!(parse_bool_like(&Value::String("yes".into())), None);
        assert_eq!(parse_bool_like(&Value::from(1)), None);
    }

    #[test]
    fn failure_reply_serializes_error_only() {
        let reply = WebhookReply::bad_request("No content to append");
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value, serde_json::json!({"error": "No content to append"}));

        let response = Response::from_reply(Some("req-1".into()), &reply);
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().code, "bad_request");
    }

    #[test]
    fn success_reply_round_trips_through_response() {
        let reply = WebhookReply::success("Content appended");
        let response = Response::from_reply(None, &reply);
        assert!(response.ok);
        let data = response.data.unwrap();
        assert_eq!(data["success"], Value::Bool(true));
        assert_eq!(data["message"], "Content appended");
    }
}
