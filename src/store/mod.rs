use time::OffsetDateTime;

use crate::config::{OrphanPolicy, ThemeId};
use crate::error::{StoreError, ValidationError};

mod note;

pub use note::{Draft, EditingTarget, FolderFilter, Note, NoteId, NoteRef, ALL_NOTES_LABEL};

/// Everything that is written to the key-value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSlice {
    pub notes: Vec<Note>,
    pub folders: Vec<String>,
    pub theme: ThemeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetDraftTitle(String),
    SetDraftContent(String),
    CommitDraft,
    DiscardDraft,
    BeginEdit(NoteRef),
    DeleteNote(NoteRef),
    AddFolder(String),
    DeleteFolder(String),
    SelectFolder(FolderFilter),
    SetTheme(String),
}

/// Whether an applied command touched the persisted slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Persisted,
    ViewOnly,
}

#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: Vec<Note>,
    folders: Vec<String>,
    theme: ThemeId,
    active_folder: FolderFilter,
    draft: Draft,
    editing: EditingTarget,
    orphan_policy: OrphanPolicy,
}

impl NoteStore {
    pub fn from_slice(slice: PersistedSlice, orphan_policy: OrphanPolicy) -> Self {
        Self {
            notes: slice.notes,
            folders: slice.folders,
            theme: slice.theme,
            orphan_policy,
            ..Self::default()
        }
    }

    pub fn slice(&self) -> PersistedSlice {
        PersistedSlice {
            notes: self.notes.clone(),
            folders: self.folders.clone(),
            theme: self.theme,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    pub fn theme(&self) -> ThemeId {
        self.theme
    }

    pub fn active_folder(&self) -> &FolderFilter {
        &self.active_folder
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn editing_target(&self) -> EditingTarget {
        self.editing
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.editing, EditingTarget::Existing(_))
    }

    /// Notes admitted by the active folder, paired with their position in the full list.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Note)> + '_ {
        self.notes
            .iter()
            .enumerate()
            .filter(|(_, note)| self.active_folder.admits(note))
    }

    pub fn apply(&mut self, command: Command, now: OffsetDateTime) -> Result<Change, StoreError> {
        match command {
            Command::SetDraftTitle(title) => {
                self.draft.title = title;
                Ok(Change::ViewOnly)
            }
            Command::SetDraftContent(content) => {
                self.draft.content = content;
                Ok(Change::ViewOnly)
            }
            Command::CommitDraft => self.commit_draft(now).map(|_| Change::Persisted),
            Command::DiscardDraft => {
                self.discard_draft();
                Ok(Change::ViewOnly)
            }
            Command::BeginEdit(target) => self.begin_edit(target).map(|_| Change::ViewOnly),
            Command::DeleteNote(target) => self.delete_note(target).map(|_| Change::Persisted),
            Command::AddFolder(name) => self.add_folder(name).map(|_| Change::Persisted),
            Command::DeleteFolder(name) => self.delete_folder(&name).map(|_| Change::Persisted),
            Command::SelectFolder(filter) => self.select_folder(filter).map(|_| Change::ViewOnly),
            Command::SetTheme(name) => self.set_theme(&name).map(|_| Change::Persisted),
        }
    }

    /// Turns the draft into a note. Returns the id of the created or replaced note.
    pub fn commit_draft(&mut self, now: OffsetDateTime) -> Result<NoteId, StoreError> {
        if self.draft.is_blank() {
            return Err(ValidationError::BlankContent.into());
        }
        let Draft { title, content } = std::mem::take(&mut self.draft);
        let folder = self.active_folder.note_folder();
        let target = std::mem::take(&mut self.editing);

        let existing = match target {
            EditingTarget::Existing(id) => self.notes.iter().position(|note| note.id == id),
            EditingTarget::New => None,
        };
        let id = match existing {
            Some(pos) => {
                let id = self.notes[pos].id;
                self.notes[pos] = Note {
                    id,
                    title,
                    content,
                    folder,
                    timestamp: now,
                };
                id
            }
            None => {
                if let EditingTarget::Existing(id) = target {
                    tracing::warn!(%id, "edited note vanished before save, adding it as new");
                }
                let id = NoteId::new();
                self.notes.push(Note {
                    id,
                    title,
                    content,
                    folder,
                    timestamp: now,
                });
                id
            }
        };
        Ok(id)
    }

    pub fn discard_draft(&mut self) {
        self.draft = Draft::default();
        self.editing = EditingTarget::New;
    }

    pub fn begin_edit(&mut self, target: NoteRef) -> Result<NoteId, StoreError> {
        let pos = self.resolve(target)?;
        let note = &self.notes[pos];
        self.draft = Draft {
            title: note.title.clone(),
            content: note.content.clone(),
        };
        self.editing = EditingTarget::Existing(note.id);
        Ok(note.id)
    }

    pub fn delete_note(&mut self, target: NoteRef) -> Result<Note, StoreError> {
        let pos = self.resolve(target)?;
        let removed = self.notes.remove(pos);
        if self.editing == EditingTarget::Existing(removed.id) {
            self.editing = EditingTarget::New;
        }
        Ok(removed)
    }

    pub fn add_folder(&mut self, name: String) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(ValidationError::BlankFolderName.into());
        }
        if self.folders.contains(&name) {
            return Err(ValidationError::DuplicateFolder(name).into());
        }
        self.folders.push(name);
        Ok(())
    }

    pub fn delete_folder(&mut self, name: &str) -> Result<(), StoreError> {
        let Some(pos) = self.folders.iter().position(|folder| folder == name) else {
            return Err(ValidationError::UnknownFolder(name.to_string()).into());
        };
        self.folders.remove(pos);
        if self.active_folder == FolderFilter::Folder(name.to_string()) {
            self.active_folder = FolderFilter::AllNotes;
        }
        if self.orphan_policy == OrphanPolicy::Unfile {
            for note in self
                .notes
                .iter_mut()
                .filter(|note| note.folder.as_deref() == Some(name))
            {
                note.folder = None;
            }
        }
        Ok(())
    }

    pub fn select_folder(&mut self, filter: FolderFilter) -> Result<(), StoreError> {
        if let FolderFilter::Folder(name) = &filter {
            if !self.folders.contains(name) {
                return Err(ValidationError::UnknownFolder(name.clone()).into());
            }
        }
        self.active_folder = filter;
        Ok(())
    }

    pub fn set_theme(&mut self, name: &str) -> Result<ThemeId, StoreError> {
        self.theme = ThemeId::parse(name)?;
        Ok(self.theme)
    }

    fn resolve(&self, target: NoteRef) -> Result<usize, StoreError> {
        match target {
            NoteRef::Index(index) if index < self.notes.len() => Ok(index),
            NoteRef::Index(index) => Err(StoreError::IndexOutOfRange {
                index,
                len: self.notes.len(),
            }),
            NoteRef::Id(id) => self
                .notes
                .iter()
                .position(|note| note.id == id)
                .ok_or(StoreError::UnknownNote(id)),
        }
    }
}

/// Notes shown under `filter`, in their original order.
pub fn visible_notes<'a>(notes: &'a [Note], filter: &FolderFilter) -> Vec<&'a Note> {
    notes.iter().filter(|note| filter.admits(note)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2024-03-01 09:00 UTC);
    const T1: OffsetDateTime = datetime!(2024-03-02 18:30 UTC);

    fn draft(store: &mut NoteStore, title: &str, content: &str) {
        store.draft = Draft {
            title: title.into(),
            content: content.into(),
        };
    }

    fn store_with_notes(entries: &[(&str, Option<&str>)]) -> NoteStore {
        let notes = entries
            .iter()
            .map(|(content, folder)| Note {
                id: NoteId::new(),
                title: String::new(),
                content: content.to_string(),
                folder: folder.map(str::to_string),
                timestamp: T0,
            })
            .collect();
        let slice = PersistedSlice {
            notes,
            folders: vec!["Work".into(), "Home".into()],
            theme: ThemeId::Sakura,
        };
        NoteStore::from_slice(slice, OrphanPolicy::Keep)
    }

    #[test]
    fn blank_commit_is_rejected_and_keeps_draft() {
        let mut store = NoteStore::default();
        for content in ["", "   ", "\n\t "] {
            draft(&mut store, "kept title", content);
            assert_matches!(
                store.apply(Command::CommitDraft, T0),
                Err(StoreError::Validation(ValidationError::BlankContent))
            );
            assert!(store.notes().is_empty());
            assert_eq!(store.draft().title, "kept title");
        }
    }

    #[test]
    fn commit_appends_and_files_under_active_folder() {
        let mut store = store_with_notes(&[]);
        draft(&mut store, "", "unfiled");
        assert_eq!(store.apply(Command::CommitDraft, T0), Ok(Change::Persisted));
        assert_eq!(store.notes()[0].folder, None);

        let work = Command::SelectFolder(FolderFilter::Folder("Work".into()));
        store.apply(work, T0).unwrap();
        draft(&mut store, "t", "filed");
        store.apply(Command::CommitDraft, T1).unwrap();

        assert_eq!(store.notes().len(), 2);
        let filed = &store.notes()[1];
        assert_eq!(filed.folder.as_deref(), Some("Work"));
        assert_eq!(filed.timestamp, T1);
        assert_eq!(store.draft(), &Draft::default());
        assert_eq!(store.editing_target(), EditingTarget::New);
    }

    #[test]
    fn edit_replaces_note_and_resets_timestamp() {
        let mut store = NoteStore::default();
        draft(&mut store, "A", "B");
        let id = store.commit_draft(T0).unwrap();

        assert_eq!(store.apply(Command::BeginEdit(NoteRef::Index(0)), T1), Ok(Change::ViewOnly));
        assert_eq!(store.draft().title, "A");
        assert_eq!(store.draft().content, "B");
        assert_eq!(store.editing_target(), EditingTarget::Existing(id));

        store.apply(Command::SetDraftContent("B2".into()), T1).unwrap();
        store.apply(Command::CommitDraft, T1).unwrap();

        assert_eq!(store.notes().len(), 1);
        let note = &store.notes()[0];
        assert_eq!(note.id, id);
        assert_eq!(note.content, "B2");
        assert_eq!(note.timestamp, T1);
        assert!(!store.is_editing());
    }

    #[test]
    fn deleting_edited_note_turns_draft_into_new_note() {
        let mut store = store_with_notes(&[("one", None), ("two", None)]);
        let id = store.begin_edit(NoteRef::Index(1)).unwrap();
        store.delete_note(NoteRef::Id(id)).unwrap();
        assert_eq!(store.editing_target(), EditingTarget::New);
        assert_eq!(store.draft().content, "two");

        store.commit_draft(T1).unwrap();
        assert_eq!(store.notes().len(), 2);
        assert_ne!(store.notes()[1].id, id);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut store = store_with_notes(&[("only", None)]);
        assert_matches!(
            store.apply(Command::DeleteNote(NoteRef::Index(3)), T0),
            Err(StoreError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_matches!(
            store.apply(Command::BeginEdit(NoteRef::Id(NoteId::new())), T0),
            Err(StoreError::UnknownNote(_))
        );
        assert_eq!(store.notes().len(), 1);
        assert_eq!(store.draft(), &Draft::default());
    }

    #[test]
    fn delete_by_id_hits_the_right_note_under_a_filter() {
        let mut store =
            store_with_notes(&[("a", Some("Home")), ("b", Some("Work")), ("c", Some("Work"))]);
        let work = FolderFilter::Folder("Work".into());
        store.select_folder(work).unwrap();
        let (pos, second_visible) = store.visible().nth(1).unwrap();
        assert_eq!(pos, 2);
        let id = second_visible.id;

        let removed = store.delete_note(id.into()).unwrap();
        assert_eq!(removed.content, "c");
        let left: Vec<_> = store.notes().iter().map(|n| n.content.as_str()).collect();
        assert_eq!(left, ["a", "b"]);
    }

    #[test]
    fn folder_names_must_be_unique_and_non_blank() {
        let mut store = store_with_notes(&[]);
        assert_matches!(
            store.apply(Command::AddFolder("Work".into()), T0),
            Err(StoreError::Validation(ValidationError::DuplicateFolder(name))) if name == "Work"
        );
        assert_matches!(
            store.apply(Command::AddFolder("  ".into()), T0),
            Err(StoreError::Validation(ValidationError::BlankFolderName))
        );
        assert_eq!(store.folders(), ["Work", "Home"]);

        // exact match only: case and padding make a different folder
        store.add_folder("work".into()).unwrap();
        store.add_folder(" Work".into()).unwrap();
        assert_eq!(store.folders().len(), 4);
    }

    #[test]
    fn deleting_active_folder_resets_selection() {
        let mut store = store_with_notes(&[]);
        let work = FolderFilter::Folder("Work".into());
        store.select_folder(work).unwrap();
        store.delete_folder("Home").unwrap();
        assert_eq!(store.active_folder(), &FolderFilter::Folder("Work".into()));

        store.delete_folder("Work").unwrap();
        assert_eq!(store.active_folder(), &FolderFilter::AllNotes);
        assert!(store.folders().is_empty());
        assert_matches!(
            store.delete_folder("Work"),
            Err(StoreError::Validation(ValidationError::UnknownFolder(_)))
        );
    }

    #[test]
    fn unfile_policy_clears_references() {
        let mut store = store_with_notes(&[("a", Some("Work")), ("b", Some("Home"))]);
        store.orphan_policy = OrphanPolicy::Unfile;
        store.delete_folder("Work").unwrap();
        assert_eq!(store.notes()[0].folder, None);
        assert_eq!(store.notes()[1].folder.as_deref(), Some("Home"));
    }

    #[test]
    fn selecting_unknown_folder_is_rejected() {
        let mut store = store_with_notes(&[]);
        assert_matches!(
            store.apply(Command::SelectFolder(FolderFilter::Folder("Ideas".into())), T0),
            Err(StoreError::Validation(ValidationError::UnknownFolder(_)))
        );
        assert_eq!(store.active_folder(), &FolderFilter::AllNotes);
    }

    #[test]
    fn unknown_theme_keeps_previous() {
        let mut store = NoteStore::default();
        assert_eq!(
            store.apply(Command::SetTheme("cherryCola".into()), T0),
            Ok(Change::Persisted)
        );
        assert_matches!(
            store.apply(Command::SetTheme("neon".into()), T0),
            Err(StoreError::UnknownTheme(_))
        );
        assert_eq!(store.theme(), ThemeId::CherryCola);
    }

    #[test]
    fn all_notes_view_is_identity() {
        let store = store_with_notes(&[("a", Some("Work")), ("b", None), ("c", Some("Gone"))]);
        let visible = visible_notes(store.notes(), &FolderFilter::AllNotes);
        let expected: Vec<&Note> = store.notes().iter().collect();
        assert_eq!(visible, expected);

        let work = visible_notes(store.notes(), &FolderFilter::Folder("Work".into()));
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].content, "a");
    }

    #[test]
    fn folder_lifecycle_leaves_orphaned_reference() {
        let mut store = NoteStore::default();
        store.apply(Command::AddFolder("Work".into()), T0).unwrap();
        assert_eq!(store.folders(), ["Work"]);

        let work = FolderFilter::Folder("Work".into());
        store.apply(Command::SelectFolder(work), T0).unwrap();
        let content = Command::SetDraftContent("Buy milk".into());
        store.apply(content, T0).unwrap();
        store.apply(Command::CommitDraft, T0).unwrap();

        let all = Command::SelectFolder(FolderFilter::AllNotes);
        store.apply(all, T0).unwrap();
        assert_eq!(store.visible().count(), 1);

        let delete = Command::DeleteFolder("Work".into());
        store.apply(delete, T0).unwrap();
        assert!(store.folders().is_empty());
        assert_eq!(store.active_folder(), &FolderFilter::AllNotes);
        let note = &store.notes()[0];
        assert_eq!(note.title, "");
        assert_eq!(note.content, "Buy milk");
        assert_eq!(note.folder.as_deref(), Some("Work"));
        assert_eq!(note.timestamp, T0);
    }
}
