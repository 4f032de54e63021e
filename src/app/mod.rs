use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::{AppConfig, ThemeId};
use crate::storage::KeyValueStore;
use crate::store::{Change, Command, EditingTarget, FolderFilter, NoteId, NoteRef};
use crate::ui;

pub mod session;
pub mod state;

pub use session::{Outcome, Session};
pub use state::{DraftField, FocusPane, OverlayState, ViewState};

enum Action {
    Quit,
    FocusNext,
    MoveUp,
    MoveDown,
    Activate,
    ComposeNote,
    EditNote,
    Delete,
    NewFolder,
    PickTheme,
}

pub struct App<S> {
    pub config: Arc<AppConfig>,
    session: Session<S>,
    view: ViewState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(config: Arc<AppConfig>, session: Session<S>) -> Self {
        Self {
            config,
            session,
            view: ViewState::default(),
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|frame| {
                    let store = self.session.store();
                    if store.visible().next().is_some() {
                        self.list_state.select(Some(self.view.note_selected));
                    } else {
                        self.list_state.select(None);
                    }
                    ui::draw_app(
                        frame,
                        store,
                        &self.view,
                        &mut self.list_state,
                        self.config.preview_lines as usize,
                    );
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.handle_overlay_key(key) {
            return;
        }
        if self.view.focus == FocusPane::Draft && self.handle_draft_key(key) {
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Tab => Some(Action::FocusNext),
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::MoveUp),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::MoveDown),
            KeyCode::Enter => Some(Action::Activate),
            KeyCode::Char('a') if plain => Some(Action::ComposeNote),
            KeyCode::Char('e') if plain => Some(Action::EditNote),
            KeyCode::Char('d') if plain => Some(Action::Delete),
            KeyCode::Char('n') if plain => Some(Action::NewFolder),
            KeyCode::Char('t') if plain => Some(Action::PickTheme),
            _ => None,
        };
        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn handle_action(&mut self, action: Action) {
        let folder_count = self.session.store().folders().len();
        let visible = self.session.store().visible().count();
        match action {
            Action::Quit => self.should_quit = true,
            Action::FocusNext => self.view.focus = self.view.focus.next(),
            Action::MoveUp | Action::MoveDown => {
                let delta = if matches!(action, Action::MoveUp) { -1 } else { 1 };
                match self.view.focus {
                    FocusPane::Sidebar => self.view.move_sidebar(delta, folder_count),
                    FocusPane::Notes => self.view.move_note(delta, visible),
                    FocusPane::Draft => {}
                }
            }
            Action::Activate => match self.view.focus {
                FocusPane::Sidebar => {
                    let filter = self.view.sidebar_filter(self.session.store());
                    if self.dispatch(Command::SelectFolder(filter)).is_some() {
                        self.view.note_selected = 0;
                    }
                }
                FocusPane::Notes => self.handle_action(Action::EditNote),
                FocusPane::Draft => {}
            },
            Action::ComposeNote => {
                self.view.focus = FocusPane::Draft;
                self.view.draft_field = DraftField::Content;
            }
            Action::EditNote => {
                if self.view.focus != FocusPane::Notes {
                    return;
                }
                let Some(id) = self.selected_note_id() else {
                    return;
                };
                if self.dispatch(Command::BeginEdit(NoteRef::Id(id))).is_some() {
                    self.view.focus = FocusPane::Draft;
                    self.view.draft_field = DraftField::Content;
                    self.view
                        .set_status_message(Some("Editing note; Ctrl-s saves, Esc discards"));
                }
            }
            Action::Delete => self.handle_delete(),
            Action::NewFolder => self.view.open_new_folder(),
            Action::PickTheme => {
                let current = self.session.store().theme();
                self.view.open_theme_picker(current);
            }
        }
    }

    fn handle_delete(&mut self) {
        match self.view.focus {
            FocusPane::Sidebar => {
                let filter = self.view.sidebar_filter(self.session.store());
                let FolderFilter::Folder(name) = filter else {
                    self.view
                        .set_status_message(Some("\"All Notes\" cannot be deleted"));
                    return;
                };
                if self.dispatch(Command::DeleteFolder(name.clone())).is_some() {
                    self.view
                        .set_status_message(Some(format!("Deleted folder {name}")));
                }
            }
            FocusPane::Notes => {
                let Some(id) = self.selected_note_id() else {
                    return;
                };
                if self.dispatch(Command::DeleteNote(NoteRef::Id(id))).is_some() {
                    self.view.set_status_message(Some("Deleted note"));
                }
            }
            FocusPane::Draft => {}
        }
        self.view.clamp(self.session.store());
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        let Some(overlay) = self.view.overlay_mut() else {
            return false;
        };
        match overlay {
            OverlayState::NewFolder { name } => match key.code {
                KeyCode::Esc => self.view.close_overlay(),
                KeyCode::Enter => {
                    let name = name.clone();
                    if self.dispatch(Command::AddFolder(name.clone())).is_some() {
                        self.view.close_overlay();
                        self.view
                            .set_status_message(Some(format!("Created folder {name}")));
                    }
                }
                KeyCode::Backspace => *name = state::pop_grapheme(name),
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    name.push(ch)
                }
                _ => {}
            },
            OverlayState::ThemePicker { selected } => {
                let count = ThemeId::all().count();
                match key.code {
                    KeyCode::Esc => self.view.close_overlay(),
                    KeyCode::Char('k') | KeyCode::Up => *selected = selected.saturating_sub(1),
                    KeyCode::Char('j') | KeyCode::Down => {
                        *selected = (*selected + 1).min(count - 1)
                    }
                    KeyCode::Enter => {
                        let theme = ThemeId::all().nth(*selected).unwrap_or_default();
                        self.view.close_overlay();
                        if self
                            .dispatch(Command::SetTheme(theme.to_string()))
                            .is_some()
                        {
                            self.view.set_status_message(Some(format!(
                                "Theme: {}",
                                theme.display_name()
                            )));
                        }
                    }
                    _ => {}
                }
            }
        }
        true
    }

    fn handle_draft_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let draft = self.session.store().draft().clone();
        let field = self.view.draft_field;
        let current = match field {
            DraftField::Title => draft.title,
            DraftField::Content => draft.content,
        };
        let updated = match key.code {
            KeyCode::Char('s') if ctrl => {
                self.commit_draft();
                return true;
            }
            KeyCode::Esc => {
                let was_editing = self.session.store().is_editing();
                if self.dispatch(Command::DiscardDraft).is_some() {
                    self.view.draft_field = DraftField::Content;
                    self.view.focus = FocusPane::Notes;
                    let message = if was_editing {
                        "Edit canceled"
                    } else {
                        "Draft cleared"
                    };
                    self.view.set_status_message(Some(message));
                }
                return true;
            }
            KeyCode::Up => {
                self.view.draft_field = DraftField::Title;
                return true;
            }
            KeyCode::Down => {
                self.view.draft_field = DraftField::Content;
                return true;
            }
            KeyCode::Enter if field == DraftField::Title => {
                self.view.draft_field = DraftField::Content;
                return true;
            }
            KeyCode::Enter => format!("{current}\n"),
            KeyCode::Backspace => state::pop_grapheme(&current),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                format!("{current}{ch}")
            }
            _ => return false,
        };
        let command = match field {
            DraftField::Title => Command::SetDraftTitle(updated),
            DraftField::Content => Command::SetDraftContent(updated),
        };
        self.dispatch(command);
        true
    }

    fn commit_draft(&mut self) {
        let saving = matches!(
            self.session.store().editing_target(),
            EditingTarget::Existing(_)
        );
        if self.dispatch(Command::CommitDraft).is_some() {
            self.view.draft_field = DraftField::Title;
            self.view
                .set_status_message(Some(if saving { "Saved changes" } else { "Added note" }));
        }
        self.view.clamp(self.session.store());
    }

    fn selected_note_id(&self) -> Option<NoteId> {
        self.session
            .store()
            .visible()
            .nth(self.view.note_selected)
            .map(|(_, note)| note.id)
    }

    /// Runs a command and reports failures on the status line. `None` when not applied.
    fn dispatch(&mut self, command: Command) -> Option<Change> {
        match self.session.dispatch(command) {
            Ok(Outcome::Applied(change)) => Some(change),
            Ok(Outcome::Rejected(err)) => {
                self.view.set_status_message(Some(err.to_string()));
                None
            }
            Err(err) => {
                tracing::error!(?err, "failed to persist notes");
                self.view
                    .set_status_message(Some(format!("Save failed: {err:#}")));
                None
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("creating terminal backend")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrphanPolicy;
    use crate::storage::{MemoryStore, PersistenceAdapter};

    fn app() -> App<MemoryStore> {
        let (session, _) =
            Session::open(PersistenceAdapter::new(MemoryStore::new()), OrphanPolicy::Keep)
                .expect("session");
        App::new(Arc::new(AppConfig::default()), session)
    }

    fn press(app: &mut App<MemoryStore>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<MemoryStore>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn ctrl(app: &mut App<MemoryStore>, ch: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL));
    }

    #[test]
    fn typing_and_saving_adds_a_note() {
        let mut app = app();
        press(&mut app, KeyCode::Up);
        type_text(&mut app, "Groceries");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "eggs");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "tea");
        ctrl(&mut app, 's');

        let notes = app.session().store().notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Groceries");
        assert_eq!(notes[0].content, "eggs\ntea");
        assert_eq!(app.view().status_message(), Some("Added note"));
        assert!(app.session().store().draft().content.is_empty());
    }

    #[test]
    fn blank_save_reports_rejection() {
        let mut app = app();
        type_text(&mut app, "   ");
        ctrl(&mut app, 's');
        assert!(app.session().store().notes().is_empty());
        assert_eq!(
            app.view().status_message(),
            Some("note content cannot be blank")
        );
    }

    #[test]
    fn sidebar_creates_and_selects_folder() {
        let mut app = app();
        press(&mut app, KeyCode::Tab); // draft -> sidebar
        assert_eq!(app.view().focus, FocusPane::Sidebar);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Work");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.session().store().folders(), ["Work"]);
        assert!(app.view().overlay().is_none());

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.session().store().active_folder(),
            &FolderFilter::Folder("Work".into())
        );

        press(&mut app, KeyCode::Char('d'));
        assert!(app.session().store().folders().is_empty());
        assert_eq!(app.session().store().active_folder(), &FolderFilter::AllNotes);
        assert_eq!(app.view().sidebar_selected, 0);
    }

    #[test]
    fn duplicate_folder_keeps_input_open() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        for _ in 0..2 {
            press(&mut app, KeyCode::Char('n'));
            type_text(&mut app, "Work");
            press(&mut app, KeyCode::Enter);
        }
        assert_eq!(app.session().store().folders().len(), 1);
        assert!(matches!(
            app.view().overlay(),
            Some(OverlayState::NewFolder { .. })
        ));
    }

    #[test]
    fn edit_from_note_list_replaces_note() {
        let mut app = app();
        type_text(&mut app, "first");
        ctrl(&mut app, 's');
        let id = app.session().store().notes()[0].id;

        press(&mut app, KeyCode::Esc); // leave draft for the note list
        assert_eq!(app.view().focus, FocusPane::Notes);
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.view().focus, FocusPane::Draft);
        assert_eq!(app.session().store().draft().content, "first");

        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "T");
        ctrl(&mut app, 's');

        let notes = app.session().store().notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, id);
        assert_eq!(notes[0].content, "firsT");
        assert_eq!(app.view().status_message(), Some("Saved changes"));
    }

    #[test]
    fn theme_picker_persists_choice() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('t'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.session().store().theme(), ThemeId::DesertRose);
        let stored = app.session().persistence().store().get("theme").expect("get");
        assert_eq!(stored.as_deref(), Some("desertRose"));
    }

    #[test]
    fn quit_is_ignored_while_typing() {
        let mut app = app();
        type_text(&mut app, "q");
        assert!(!app.should_quit());
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
