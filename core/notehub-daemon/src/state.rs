//! Shared state for connection threads.
//!
//! Every connection gets its own thread, but webhooks run one at a time: the
//! hub sits behind a mutex so reads and writes of a document never interleave
//! inside this process. Writers outside the daemon are not coordinated.

use chrono::{DateTime, Utc};
use notehub_protocol::{WebhookReply, WebhookRequest};
use std::sync::Mutex;

use tracker_core::{NoteHub, TrackerConfig};

use crate::db::Db;

pub struct SharedState {
    hub: Mutex<NoteHub<Db, Db>>,
}

impl SharedState {
    pub fn new(db: Db, defaults: TrackerConfig) -> Self {
        Self {
            hub: Mutex::new(NoteHub::with_defaults(db.clone(), db, defaults)),
        }
    }

    pub fn handle_webhook(&self, request: &WebhookRequest, now: DateTime<Utc>) -> WebhookReply {
        match self.hub.lock() {
            Ok(mut hub) => hub.handle(request, now),
            Err(_) => {
                tracing::error!("Webhook pipeline lock poisoned");
                WebhookReply::critical("webhook pipeline unavailable")
            }
        }
    }

    pub fn defaults(&self) -> Option<TrackerConfig> {
        self.hub.lock().ok().map(|hub| hub.defaults().clone())
    }
}
