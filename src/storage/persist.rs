use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use super::KeyValueStore;
use crate::config::ThemeId;
use crate::error::PersistError;
use crate::store::{Note, PersistedSlice};

pub const NOTES_KEY: &str = "notes";
pub const FOLDERS_KEY: &str = "folders";
pub const THEME_KEY: &str = "theme";

/// Slice read at startup plus any keys that had to fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub slice: PersistedSlice,
    pub warnings: Vec<PersistError>,
}

pub struct PersistenceAdapter<S> {
    store: S,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load(&self) -> Result<LoadReport> {
        let mut warnings = Vec::new();
        let notes: Vec<Note> = self.read_json(NOTES_KEY, &mut warnings)?;
        let folders: Vec<String> = self.read_json(FOLDERS_KEY, &mut warnings)?;
        let theme = match self.store.get(THEME_KEY)? {
            None => ThemeId::default(),
            Some(raw) => ThemeId::parse(&raw).unwrap_or_else(|err| {
                warnings.push(PersistError::CorruptPersistedState {
                    key: THEME_KEY,
                    reason: err.to_string(),
                });
                ThemeId::default()
            }),
        };
        Ok(LoadReport {
            slice: PersistedSlice {
                notes,
                folders,
                theme,
            },
            warnings,
        })
    }

    /// Writes every key of the slice, replacing whatever was stored.
    pub fn save(&mut self, slice: &PersistedSlice) -> Result<()> {
        let notes = serde_json::to_string(&slice.notes).context("serializing notes")?;
        let folders = serde_json::to_string(&slice.folders).context("serializing folders")?;
        self.store.set(NOTES_KEY, &notes)?;
        self.store.set(FOLDERS_KEY, &folders)?;
        self.store.set(THEME_KEY, slice.theme.as_ref())?;
        tracing::trace!(
            notes = slice.notes.len(),
            folders = slice.folders.len(),
            theme = %slice.theme,
            "persisted slice"
        );
        Ok(())
    }

    fn read_json<T>(&self, key: &'static str, warnings: &mut Vec<PersistError>) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.store.get(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                warnings.push(PersistError::CorruptPersistedState {
                    key,
                    reason: err.to_string(),
                });
                Ok(T::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::NoteId;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    fn sample_slice() -> PersistedSlice {
        PersistedSlice {
            notes: vec![
                Note {
                    id: NoteId::new(),
                    title: String::new(),
                    content: "Buy milk".into(),
                    folder: Some("Work".into()),
                    timestamp: datetime!(2024-05-01 12:00:00.123 UTC),
                },
                Note {
                    id: NoteId::new(),
                    title: "Plan".into(),
                    content: "line one\nline two".into(),
                    folder: None,
                    timestamp: datetime!(2024-05-02 08:15 UTC),
                },
            ],
            folders: vec!["Work".into()],
            theme: ThemeId::DesertRose,
        }
    }

    #[test]
    fn empty_store_loads_defaults() -> Result<()> {
        let adapter = PersistenceAdapter::new(MemoryStore::new());
        let report = adapter.load()?;
        assert_eq!(report.slice, PersistedSlice::default());
        assert_eq!(report.slice.theme, ThemeId::Sakura);
        assert!(report.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn save_then_load_round_trips() -> Result<()> {
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        let slice = sample_slice();
        adapter.save(&slice)?;

        assert_eq!(adapter.store().get(THEME_KEY)?.as_deref(), Some("desertRose"));
        let report = adapter.load()?;
        assert_eq!(report.slice, slice);
        assert!(report.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_values_fall_back_per_key() -> Result<()> {
        let mut store = MemoryStore::new();
        store.set(NOTES_KEY, "{not json")?;
        store.set(FOLDERS_KEY, "[\"Work\",\"Home\"]")?;
        store.set(THEME_KEY, "vaporwave")?;

        let report = PersistenceAdapter::new(store).load()?;
        assert!(report.slice.notes.is_empty());
        assert_eq!(report.slice.folders, vec!["Work", "Home"]);
        assert_eq!(report.slice.theme, ThemeId::Sakura);
        assert_eq!(report.warnings.len(), 2);
        assert_matches!(
            &report.warnings[0],
            PersistError::CorruptPersistedState { key: "notes", .. }
        );
        assert_matches!(
            &report.warnings[1],
            PersistError::CorruptPersistedState { key: "theme", .. }
        );
        Ok(())
    }

    #[test]
    fn padded_theme_counts_as_corrupt() -> Result<()> {
        let mut store = MemoryStore::new();
        store.set(THEME_KEY, " cherryCola\n")?;

        let report = PersistenceAdapter::new(store).load()?;
        assert_eq!(report.slice.theme, ThemeId::Sakura);
        assert_matches!(
            report.warnings.as_slice(),
            [PersistError::CorruptPersistedState { key: "theme", .. }]
        );
        Ok(())
    }

    #[test]
    fn legacy_notes_without_ids_get_fresh_ones() -> Result<()> {
        let mut store = MemoryStore::new();
        store.set(
            NOTES_KEY,
            r#"[{"title":"","content":"a","folder":null,"timestamp":"2024-01-01T10:00:00.000Z"},
                {"content":"b","timestamp":"2024-01-02T10:00:00.000Z"}]"#,
        )?;

        let report = PersistenceAdapter::new(store).load()?;
        let notes = &report.slice.notes;
        assert_eq!(notes.len(), 2);
        assert_ne!(notes[0].id, notes[1].id);
        assert_eq!(notes[1].title, "");
        assert_eq!(notes[1].folder, None);
        assert_eq!(notes[0].timestamp, datetime!(2024-01-01 10:00 UTC));
        Ok(())
    }
}
