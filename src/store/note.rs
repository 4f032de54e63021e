use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const ALL_NOTES_LABEL: &str = "All Notes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(Uuid);

impl NoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Note {
    pub fn display_title(&self) -> Option<&str> {
        if self.title.is_empty() {
            None
        } else {
            Some(self.title.as_str())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
}

impl Draft {
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditingTarget {
    #[default]
    New,
    Existing(NoteId),
}

/// The active folder selection. `AllNotes` is the unfiltered view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FolderFilter {
    #[default]
    AllNotes,
    Folder(String),
}

impl FolderFilter {
    /// Folder a note committed under this selection is filed in.
    pub fn note_folder(&self) -> Option<String> {
        match self {
            FolderFilter::AllNotes => None,
            FolderFilter::Folder(name) => Some(name.clone()),
        }
    }

    pub fn admits(&self, note: &Note) -> bool {
        match self {
            FolderFilter::AllNotes => true,
            FolderFilter::Folder(name) => note.folder.as_deref() == Some(name.as_str()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FolderFilter::AllNotes => ALL_NOTES_LABEL,
            FolderFilter::Folder(name) => name,
        }
    }
}

/// Reference to a note either by position in the full list or by durable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteRef {
    Index(usize),
    Id(NoteId),
}

impl From<usize> for NoteRef {
    fn from(index: usize) -> Self {
        NoteRef::Index(index)
    }
}

impl From<NoteId> for NoteRef {
    fn from(id: NoteId) -> Self {
        NoteRef::Id(id)
    }
}
