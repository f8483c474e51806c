//! Document collaborator contract.
//!
//! The tracker never owns a document. It works against the [`Document`] trait:
//! an ordered body of elements that can be read, edited in place, inserted
//! into and removed from. Hosts open and commit documents through
//! [`DocumentHost`].
//!
//! ## Host Rules
//!
//! - A body may never become fully empty. Removing the only remaining element
//!   is refused; callers clear its text instead (see `removal`).
//! - Element kinds other than plain paragraphs (list items, tables, ...) may
//!   appear in the body. The tracker reads them but never treats them as
//!   tracker blocks.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Result, TrackerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Paragraph,
    ListItem,
    Table,
    HorizontalRule,
    /// Anything the host reports that we do not model.
    Unsupported,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::ListItem => "list_item",
            ElementKind::Table => "table",
            ElementKind::HorizontalRule => "horizontal_rule",
            ElementKind::Unsupported => "unsupported",
        }
    }

    /// Unknown names map to [`ElementKind::Unsupported`] rather than failing.
    pub fn parse(value: &str) -> Self {
        match value {
            "paragraph" => ElementKind::Paragraph,
            "list_item" => ElementKind::ListItem,
            "table" => ElementKind::Table,
            "horizontal_rule" => ElementKind::HorizontalRule,
            _ => ElementKind::Unsupported,
        }
    }
}

/// One element of a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub kind: ElementKind,
    pub text: String,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Paragraph,
            text: text.into(),
        }
    }

    pub fn with_kind(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// An ordered, mutable document body.
pub trait Document {
    fn id(&self) -> &str;

    /// Snapshot of the body, in order.
    fn paragraphs(&self) -> Result<Vec<Paragraph>>;

    fn set_text(&mut self, index: usize, text: &str) -> Result<()>;

    fn insert_paragraph(&mut self, index: usize, text: &str) -> Result<()>;

    fn append_paragraph(&mut self, text: &str) -> Result<()>;

    /// Structural removal. Hosts refuse to remove the last remaining element.
    fn remove_paragraph(&mut self, index: usize) -> Result<()>;

    /// Clears the element's contents, keeping the element itself.
    fn clear_paragraph(&mut self, index: usize) -> Result<()>;

    /// Full body text: element texts joined by newlines.
    fn body_text(&self) -> Result<String> {
        let paragraphs = self.paragraphs()?;
        Ok(paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.paragraphs()?.len())
    }
}

/// Opens and persists documents by id.
pub trait DocumentHost {
    type Doc: Document;

    fn open(&self, doc_id: &str) -> Result<Self::Doc>;

    /// Writes a (possibly mutated) document back to the host.
    fn commit(&self, doc: &Self::Doc) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-memory implementation
// ═══════════════════════════════════════════════════════════════════════════════

/// A document held entirely in memory. Hosts that persist elsewhere load
/// into one of these, let the pipeline mutate it, then write it back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryDocument {
    id: String,
    body: Vec<Paragraph>,
}

impl MemoryDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: Vec::new(),
        }
    }

    pub fn from_paragraphs(id: impl Into<String>, body: Vec<Paragraph>) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    pub fn from_texts(id: impl Into<String>, texts: &[&str]) -> Self {
        Self::from_paragraphs(id, texts.iter().map(|t| Paragraph::new(*t)).collect())
    }

    pub fn body(&self) -> &[Paragraph] {
        &self.body
    }

    pub fn texts(&self) -> Vec<&str> {
        self.body.iter().map(|p| p.text.as_str()).collect()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.body.len() {
            Ok(())
        } else {
            Err(TrackerError::IndexOutOfRange {
                index,
                len: self.body.len(),
            })
        }
    }
}

impl Document for MemoryDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn paragraphs(&self) -> Result<Vec<Paragraph>> {
        Ok(self.body.clone())
    }

    fn set_text(&mut self, index: usize, text: &str) -> Result<()> {
        self.check_index(index)?;
        self.body[index].text = text.to_string();
        Ok(())
    }

    fn insert_paragraph(&mut self, index: usize, text: &str) -> Result<()> {
        if index > self.body.len() {
            return Err(TrackerError::IndexOutOfRange {
                index,
                len: self.body.len(),
            });
        }
        self.body.insert(index, Paragraph::new(text));
        Ok(())
    }

    fn append_paragraph(&mut self, text: &str) -> Result<()> {
        self.body.push(Paragraph::new(text));
        Ok(())
    }

    fn remove_paragraph(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if self.body.len() == 1 {
            return Err(TrackerError::document(
                "remove_paragraph",
                "cannot remove the last element of a document body",
            ));
        }
        self.body.remove(index);
        Ok(())
    }

    fn clear_paragraph(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.body[index].text.clear();
        Ok(())
    }

    fn body_text(&self) -> Result<String> {
        Ok(self.texts().join("\n"))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.body.len())
    }
}

/// Host keeping documents in a map. Unknown ids open as empty documents.
#[derive(Debug, Default)]
pub struct MemoryHost {
    docs: RefCell<HashMap<String, MemoryDocument>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, doc: MemoryDocument) {
        self.docs.borrow_mut().insert(doc.id.clone(), doc);
    }

    pub fn get(&self, doc_id: &str) -> Option<MemoryDocument> {
        self.docs.borrow().get(doc_id).cloned()
    }
}

impl DocumentHost for MemoryHost {
    type Doc = MemoryDocument;

    fn open(&self, doc_id: &str) -> Result<MemoryDocument> {
        Ok(self
            .docs
            .borrow()
            .get(doc_id)
            .cloned()
            .unwrap_or_else(|| MemoryDocument::new(doc_id)))
    }

    fn commit(&self, doc: &MemoryDocument) -> Result<()> {
        self.docs
            .borrow_mut()
            .insert(doc.id.clone(), doc.clone());
        Ok(())
    }
}
