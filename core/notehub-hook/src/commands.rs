//! Turns CLI arguments into webhook requests and runs them.
//!
//! ## Usage
//!
//! ```bash
//! notehub-hook append --token tok --doc-id doc "Picked up milk"
//! echo "from a pipe" | notehub-hook append --token tok --doc-id doc
//! notehub-hook config --token tok --doc-id doc --stats-top true --timezone Europe/Paris
//! ```

use notehub_protocol::{Action, WebhookReply, WebhookRequest};
use std::io::Read;
use thiserror::Error;

use crate::daemon_client;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("{0}")]
    Rejected(String),
}

/// Tracker settings a command may carry. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub stats_top: Option<bool>,
    pub stats_bottom: Option<bool>,
    pub stats_anywhere: Option<bool>,
    pub timezone: Option<String>,
}

pub fn build_request(
    token: &str,
    doc_id: &str,
    action: Action,
    text: Option<&str>,
    settings: &Settings,
) -> WebhookRequest {
    let mut request = WebhookRequest::default()
        .with_param("token", token)
        .with_param("docId", doc_id)
        .with_param("action", action.as_str());

    if let Some(text) = text {
        request = request.with_param("text", text);
    }
    let flags = [
        ("statsTop", settings.stats_top),
        ("statsBottom", settings.stats_bottom),
        ("statsAnywhere", settings.stats_anywhere),
    ];
    for (key, value) in flags {
        if let Some(value) = value {
            request = request.with_param(key, value.to_string());
        }
    }
    if let Some(timezone) = settings.timezone.as_deref() {
        request = request.with_param("timezone", timezone);
    }
    request
}

/// Text given on the command line, or stdin when it is absent or `-`.
pub fn resolve_text(arg: Option<String>, stdin: &mut impl Read) -> Result<String, CommandError> {
    match arg {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut buffer = String::new();
            stdin.read_to_string(&mut buffer)?;
            Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

pub fn run(request: &WebhookRequest) -> Result<WebhookReply, CommandError> {
    let reply = daemon_client::send_webhook(request).map_err(CommandError::DaemonUnavailable)?;
    if reply.is_success() {
        tracing::info!(message = ?reply.message, "Webhook accepted");
        Ok(reply)
    } else {
        let error = reply
            .error
            .clone()
            .unwrap_or_else(|| "Unknown webhook error".to_string());
        tracing::warn!(error = %error, "Webhook rejected");
        Err(CommandError::Rejected(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_request_carries_text_and_action() {
        let request = build_request("tok", "doc", Action::Append, Some("hello"), &Settings::default());
        let expected = WebhookRequest::default()
            .with_param("token", "tok")
            .with_param("docId", "doc")
            .with_param("action", "append")
            .with_param("text", "hello");
        assert_eq!(request, expected);
        assert!(request.body.is_none());
    }

    #[test]
    fn settings_become_boolean_strings() {
        let settings = Settings {
            stats_top: Some(true),
            stats_bottom: Some(false),
            stats_anywhere: None,
            timezone: Some("Europe/Paris".to_string()),
        };
        let request = build_request("tok", "doc", Action::SetConfig, None, &settings);

        assert_eq!(request.query.get("action").map(String::as_str), Some("setConfig"));
        assert_eq!(request.query.get("statsTop").map(String::as_str), Some("true"));
        assert_eq!(request.query.get("statsBottom").map(String::as_str), Some("false"));
        assert!(!request.query.contains_key("statsAnywhere"));
        assert_eq!(
            request.query.get("timezone").map(String::as_str),
            Some("Europe/Paris")
        );
    }

    #[test]
    fn built_requests_parse_on_the_daemon_side() {
        let settings = Settings {
            stats_anywhere: Some(true),
            ..Settings::default()
        };
        let request = build_request("tok", "doc", Action::RegisterDoc, None, &settings);
        let parsed = notehub_protocol::parse_webhook(&request).expect("valid webhook");
        assert_eq!(parsed.action, Action::RegisterDoc);
        assert_eq!(parsed.settings.stats_anywhere, Some(true));
        assert_eq!(parsed.settings.stats_top, None);
    }

    #[test]
    fn text_falls_back_to_stdin() {
        let mut stdin = "piped note\n".as_bytes();
        assert_eq!(resolve_text(None, &mut stdin).unwrap(), "piped note");

        let mut stdin = "dash note\r\n".as_bytes();
        assert_eq!(resolve_text(Some("-".to_string()), &mut stdin).unwrap(), "dash note");

        let mut stdin = "ignored".as_bytes();
        assert_eq!(
            resolve_text(Some("inline".to_string()), &mut stdin).unwrap(),
            "inline"
        );
    }
}
