//! # tracker-core
//!
//! Core library for notehub: appends notes to shared documents and keeps a
//! self-updating activity tracker block at the top and/or bottom of each one.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. One request runs to completion.
//! - **Injected collaborators**: Documents come from a [`DocumentHost`], state
//!   lives in a [`StateStore`], and `now` is always passed in.
//! - **Graceful degradation**: Tracker maintenance never fails the request that
//!   triggered it. Unremovable paragraphs are left in place and logged.
//! - **Idempotent**: Refreshing twice at the same instant changes nothing.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use notehub_protocol::WebhookRequest;
//! use tracker_core::{MemoryHost, MemoryStore, NoteHub};
//!
//! let mut hub = NoteHub::new(MemoryHost::new(), MemoryStore::new());
//! let request = WebhookRequest::default()
//!     .with_param("token", "tok")
//!     .with_param("docId", "doc")
//!     .with_param("text", "hello");
//! let reply = hub.handle(&request, Utc::now());
//! assert!(reply.is_success());
//! ```

pub mod block;
pub mod config;
pub mod detector;
pub mod document;
pub mod duration;
pub mod error;
pub mod hub;
pub mod markers;
pub mod placement;
pub mod removal;
pub mod store;
pub mod tracker;

pub use block::{is_stats_paragraph, render_block, BlockContents, Status, MARKER, SENTINEL};
pub use config::{load_config, save_config, TrackerConfig};
pub use document::{
    Document, DocumentHost, ElementKind, MemoryDocument, MemoryHost, Paragraph,
};
pub use duration::format_elapsed;
pub use error::{Result, TrackerError};
pub use hub::NoteHub;
pub use placement::{PlacementAction, PlacementMode, PlacementReport};
pub use store::{MemoryStore, StateStore, TrackerState};
pub use tracker::{update_stats, UpdateReport};
