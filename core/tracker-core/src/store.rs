//! Key-value persistence for tracker state and per-document configuration.
//!
//! The core never assumes a backing technology: anything that can `get` and
//! `set` strings by key is a [`StateStore`]. Keys are deterministic and flat
//! so existing stores can be read by other tools:
//!
//! | Key                          | Value                               |
//! |------------------------------|-------------------------------------|
//! | `config_<token>_<docId>`     | `TrackerConfig` as camelCase JSON    |
//! | `lastContent_<docId>`        | last normalized body text           |
//! | `lastChangeTime_<docId>`     | epoch milliseconds                  |
//! | `longestTime_<docId>`        | milliseconds                        |
//! | `lastLiveTime_<docId>`       | epoch milliseconds                  |

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use crate::error::Result;

pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

pub fn config_key(token: &str, doc_id: &str) -> String {
    format!("config_{}_{}", token, doc_id)
}

pub fn last_content_key(doc_id: &str) -> String {
    format!("lastContent_{}", doc_id)
}

pub fn last_change_time_key(doc_id: &str) -> String {
    format!("lastChangeTime_{}", doc_id)
}

pub fn longest_time_key(doc_id: &str) -> String {
    format!("longestTime_{}", doc_id)
}

pub fn last_live_time_key(doc_id: &str) -> String {
    format!("lastLiveTime_{}", doc_id)
}

/// Persisted tracking state for one document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerState {
    /// Body text with all tracker blocks stripped, as of the last update.
    pub last_content: String,
    pub last_change: Option<DateTime<Utc>>,
    /// Longest idle gap ever observed. Never decreases.
    pub longest_idle_ms: u64,
    /// Most recent edit that put the document into Live status.
    pub last_live: Option<DateTime<Utc>>,
}

impl TrackerState {
    /// Loads state for `doc_id`. Missing or unparseable values read as unset.
    pub fn load<S: StateStore + ?Sized>(store: &S, doc_id: &str) -> Result<Self> {
        let last_content = store.get(&last_content_key(doc_id))?.unwrap_or_default();
        let last_change = store
            .get(&last_change_time_key(doc_id))?
            .and_then(|value| parse_epoch_ms(&value));
        let longest_idle_ms = store
            .get(&longest_time_key(doc_id))?
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let last_live = store
            .get(&last_live_time_key(doc_id))?
            .and_then(|value| parse_epoch_ms(&value));

        Ok(Self {
            last_content,
            last_change,
            longest_idle_ms,
            last_live,
        })
    }

    pub fn save<S: StateStore + ?Sized>(&self, store: &mut S, doc_id: &str) -> Result<()> {
        if let Some(last_change) = self.last_change {
            store.set(
                &last_change_time_key(doc_id),
                &last_change.timestamp_millis().to_string(),
            )?;
        }
        if let Some(last_live) = self.last_live {
            store.set(
                &last_live_time_key(doc_id),
                &last_live.timestamp_millis().to_string(),
            )?;
        }
        store.set(&longest_time_key(doc_id), &self.longest_idle_ms.to_string())?;
        store.set(&last_content_key(doc_id), &self.last_content)?;
        Ok(())
    }
}

/// Epoch-millisecond timestamps; zero and garbage mean "unset".
fn parse_epoch_ms(value: &str) -> Option<DateTime<Utc>> {
    let millis = value.trim().parse::<i64>().ok().filter(|ms| *ms > 0)?;
    Utc.timestamp_millis_opt(millis).single()
}

/// In-memory store. Counts writes so callers can assert on side effects.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.writes += 1;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
