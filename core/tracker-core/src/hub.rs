//! Webhook pipeline: validate, load config, mutate the document, refresh the
//! tracker, persist, reply.
//!
//! Validation failures reply 400 without touching anything. Collaborator
//! failures (opening or committing the document, reading or writing the
//! store) reply 500 with `Critical Error: <detail>`. A failing tracker
//! refresh is logged and never fails the request it rides on.

use chrono::{DateTime, Utc};
use notehub_protocol::{parse_webhook, Action, ParsedWebhook, WebhookReply, WebhookRequest};

use crate::block::is_stats_paragraph;
use crate::config::{load_config, save_config, TrackerConfig};
use crate::document::{Document, DocumentHost};
use crate::error::Result;
use crate::store::StateStore;
use crate::tracker::update_stats;

/// Separator written before every appended note.
pub const APPEND_SEPARATOR: &str = "—\n\n";

pub struct NoteHub<H, S> {
    host: H,
    store: S,
    defaults: TrackerConfig,
}

impl<H: DocumentHost, S: StateStore> NoteHub<H, S> {
    pub fn new(host: H, store: S) -> Self {
        Self::with_defaults(host, store, TrackerConfig::default())
    }

    /// Uses `defaults` for documents with no stored config.
    pub fn with_defaults(host: H, store: S, defaults: TrackerConfig) -> Self {
        Self {
            host,
            store,
            defaults,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn defaults(&self) -> &TrackerConfig {
        &self.defaults
    }

    pub fn handle(&mut self, request: &WebhookRequest, now: DateTime<Utc>) -> WebhookReply {
        let parsed = match parse_webhook(request) {
            Ok(parsed) => parsed,
            Err(info) => {
                tracing::info!(code = %info.code, message = %info.message, "Rejected webhook");
                return info.into();
            }
        };

        tracing::debug!(
            doc_id = %parsed.doc_id,
            action = parsed.action.as_str(),
            "Handling webhook"
        );

        let result = match parsed.action {
            Action::Append => self.append(&parsed, now),
            Action::SetConfig => self.set_config(&parsed, now),
            Action::RegisterDoc => self.register_doc(&parsed, now),
            Action::UpdateStats => self.refresh(&parsed, now),
        };

        match result {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(
                    doc_id = %parsed.doc_id,
                    action = parsed.action.as_str(),
                    error = %err,
                    "Webhook failed"
                );
                WebhookReply::critical(err)
            }
        }
    }

    fn append(&mut self, parsed: &ParsedWebhook, now: DateTime<Utc>) -> Result<WebhookReply> {
        let text = match parsed.text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(WebhookReply::bad_request("No content to append")),
        };

        let mut doc = self.host.open(&parsed.doc_id)?;
        let config = load_config(&self.store, &parsed.token, &parsed.doc_id, &self.defaults)?;

        let paragraphs = doc.paragraphs()?;
        let entry = format!("{}{}\n", APPEND_SEPARATOR, text);
        // Notes go above the bottom block so it stays last.
        if config.stats_bottom && is_stats_paragraph(paragraphs.last()) {
            doc.insert_paragraph(paragraphs.len() - 1, &entry)?;
        } else {
            doc.append_paragraph(&entry)?;
        }
        tracing::info!(doc_id = %parsed.doc_id, chars = text.chars().count(), "Appended note");

        self.refresh_isolated(&mut doc, &config, now);
        self.host.commit(&doc)?;
        Ok(WebhookReply::success("Content appended"))
    }

    fn set_config(&mut self, parsed: &ParsedWebhook, now: DateTime<Utc>) -> Result<WebhookReply> {
        let mut config = load_config(&self.store, &parsed.token, &parsed.doc_id, &self.defaults)?;
        config.apply(&parsed.settings);
        save_config(&mut self.store, &parsed.token, &parsed.doc_id, &config)?;
        tracing::info!(doc_id = %parsed.doc_id, config = ?config, "Tracker config updated");

        self.refresh_and_commit(&parsed.doc_id, &config, now)?;
        Ok(WebhookReply::with_config(config.to_json()?))
    }

    fn register_doc(&mut self, parsed: &ParsedWebhook, now: DateTime<Utc>) -> Result<WebhookReply> {
        let config = TrackerConfig::registered(&parsed.settings, &self.defaults);
        save_config(&mut self.store, &parsed.token, &parsed.doc_id, &config)?;
        tracing::info!(doc_id = %parsed.doc_id, config = ?config, "Document registered");

        self.refresh_and_commit(&parsed.doc_id, &config, now)?;
        Ok(WebhookReply::success("Document registered"))
    }

    fn refresh(&mut self, parsed: &ParsedWebhook, now: DateTime<Utc>) -> Result<WebhookReply> {
        let config = load_config(&self.store, &parsed.token, &parsed.doc_id, &self.defaults)?;
        self.refresh_and_commit(&parsed.doc_id, &config, now)?;
        Ok(WebhookReply::success("Stats updated"))
    }

    fn refresh_and_commit(
        &mut self,
        doc_id: &str,
        config: &TrackerConfig,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut doc = self.host.open(doc_id)?;
        self.refresh_isolated(&mut doc, config, now);
        self.host.commit(&doc)
    }

    fn refresh_isolated(&mut self, doc: &mut H::Doc, config: &TrackerConfig, now: DateTime<Utc>) {
        if let Err(err) = update_stats(doc, &mut self.store, config, now) {
            tracing::warn!(doc_id = %doc.id(), error = %err, "Tracker refresh failed");
        }
    }
}
