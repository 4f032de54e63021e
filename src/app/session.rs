use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::config::OrphanPolicy;
use crate::error::{PersistError, StoreError};
use crate::storage::{KeyValueStore, PersistenceAdapter};
use crate::store::{Change, Command, NoteStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(Change),
    Rejected(StoreError),
}

impl Outcome {
    pub fn into_result(self) -> Result<Change, StoreError> {
        match self {
            Outcome::Applied(change) => Ok(change),
            Outcome::Rejected(err) => Err(err),
        }
    }
}

/// Note Store plus the persistence effect that follows every persisted change.
pub struct Session<S> {
    store: NoteStore,
    persistence: PersistenceAdapter<S>,
}

impl<S: KeyValueStore> Session<S> {
    pub fn open(
        persistence: PersistenceAdapter<S>,
        orphan_policy: OrphanPolicy,
    ) -> Result<(Self, Vec<PersistError>)> {
        let report = persistence.load().context("loading persisted notes")?;
        for warning in &report.warnings {
            tracing::warn!(%warning, "persisted state fell back to defaults");
        }
        tracing::debug!(
            notes = report.slice.notes.len(),
            folders = report.slice.folders.len(),
            theme = %report.slice.theme,
            "session opened"
        );
        let store = NoteStore::from_slice(report.slice, orphan_policy);
        Ok((Self { store, persistence }, report.warnings))
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        self.dispatch_at(command, OffsetDateTime::now_utc())
    }

    /// Applies `command`. A persisted change whose save fails is rolled back, so the
    /// in-memory store never runs ahead of what is stored.
    pub fn dispatch_at(&mut self, command: Command, now: OffsetDateTime) -> Result<Outcome> {
        let label = command_label(&command);
        let before = self.store.clone();
        match self.store.apply(command, now) {
            Ok(change) => {
                if change == Change::Persisted {
                    if let Err(err) = self.persistence.save(&self.store.slice()) {
                        self.store = before;
                        return Err(err).with_context(|| format!("saving after {label}"));
                    }
                }
                tracing::debug!(command = label, ?change, "applied");
                Ok(Outcome::Applied(change))
            }
            Err(err) => {
                tracing::debug!(command = label, %err, "rejected");
                Ok(Outcome::Rejected(err))
            }
        }
    }
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::SetDraftTitle(_) => "set-draft-title",
        Command::SetDraftContent(_) => "set-draft-content",
        Command::CommitDraft => "commit-draft",
        Command::DiscardDraft => "discard-draft",
        Command::BeginEdit(_) => "begin-edit",
        Command::DeleteNote(_) => "delete-note",
        Command::AddFolder(_) => "add-folder",
        Command::DeleteFolder(_) => "delete-folder",
        Command::SelectFolder(_) => "select-folder",
        Command::SetTheme(_) => "set-theme",
    }
}
