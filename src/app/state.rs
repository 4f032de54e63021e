use unicode_segmentation::UnicodeSegmentation;

use crate::config::ThemeId;
use crate::store::{FolderFilter, NoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Notes,
    Draft,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Sidebar => FocusPane::Notes,
            FocusPane::Notes => FocusPane::Draft,
            FocusPane::Draft => FocusPane::Sidebar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayState {
    NewFolder { name: String },
    ThemePicker { selected: usize },
}

/// Presentation-only state layered over the Note Store.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub focus: FocusPane,
    pub draft_field: DraftField,
    /// Row 0 is "All Notes", row n is folder n - 1.
    pub sidebar_selected: usize,
    /// Position within the visible notes.
    pub note_selected: usize,
    overlay: Option<OverlayState>,
    status_message: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            focus: FocusPane::Draft,
            draft_field: DraftField::Content,
            sidebar_selected: 0,
            note_selected: 0,
            overlay: None,
            status_message: None,
        }
    }
}

impl ViewState {
    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut OverlayState> {
        self.overlay.as_mut()
    }

    pub fn open_new_folder(&mut self) {
        self.overlay = Some(OverlayState::NewFolder {
            name: String::new(),
        });
    }

    pub fn open_theme_picker(&mut self, current: ThemeId) {
        let selected = ThemeId::all().position(|theme| theme == current).unwrap_or(0);
        self.overlay = Some(OverlayState::ThemePicker { selected });
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn move_sidebar(&mut self, delta: isize, folder_count: usize) {
        self.sidebar_selected = step(self.sidebar_selected, delta, folder_count + 1);
    }

    pub fn move_note(&mut self, delta: isize, visible: usize) {
        self.note_selected = step(self.note_selected, delta, visible);
    }

    /// Keeps both cursors inside the current folder and note lists.
    pub fn clamp(&mut self, store: &NoteStore) {
        self.sidebar_selected = self.sidebar_selected.min(store.folders().len());
        let visible = store.visible().count();
        self.note_selected = self.note_selected.min(visible.saturating_sub(1));
    }

    pub fn sidebar_filter(&self, store: &NoteStore) -> FolderFilter {
        match self.sidebar_selected.checked_sub(1) {
            None => FolderFilter::AllNotes,
            Some(idx) => store
                .folders()
                .get(idx)
                .cloned()
                .map(FolderFilter::Folder)
                .unwrap_or_default(),
        }
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

/// Drops the last grapheme so combined characters are removed whole.
pub fn pop_grapheme(text: &str) -> String {
    match text.grapheme_indices(true).next_back() {
        Some((idx, _)) => text[..idx].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_stop_at_list_edges() {
        let mut view = ViewState::default();
        view.move_sidebar(-1, 2);
        assert_eq!(view.sidebar_selected, 0);
        view.move_sidebar(5, 2);
        assert_eq!(view.sidebar_selected, 2);
        view.move_note(1, 0);
        assert_eq!(view.note_selected, 0);
    }

    #[test]
    fn focus_cycles_through_panes() {
        let focus = FocusPane::Sidebar.next().next().next();
        assert_eq!(focus, FocusPane::Sidebar);
    }

    #[test]
    fn backspace_removes_whole_grapheme() {
        assert_eq!(pop_grapheme("cafe\u{301}"), "caf");
        assert_eq!(pop_grapheme("ab"), "a");
        assert_eq!(pop_grapheme(""), "");
    }

    #[test]
    fn theme_picker_starts_on_current_theme() {
        let mut view = ViewState::default();
        view.open_theme_picker(ThemeId::CherryCola);
        assert_eq!(
            view.overlay(),
            Some(&OverlayState::ThemePicker { selected: 2 })
        );
    }
}
