use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use time::{macros::format_description, OffsetDateTime};
use unicode_width::UnicodeWidthStr;

use crate::app::state::{DraftField, FocusPane, OverlayState, ViewState};
use crate::config::{ThemeId, ThemePalette};
use crate::store::{FolderFilter, Note, NoteStore, ALL_NOTES_LABEL};

const SIDEBAR_WIDTH: u16 = 28;

pub fn draw_app(
    frame: &mut Frame,
    store: &NoteStore,
    view: &ViewState,
    list_state: &mut ListState,
    preview_lines: usize,
) {
    let palette = store.theme().palette();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(frame.size());

    draw_sidebar(frame, columns[0], store, view, palette);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(columns[1]);
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.main_background)),
        columns[1],
    );

    draw_draft(frame, &main[..3], store, view, palette);
    draw_notes(frame, main[3], store, view, list_state, palette, preview_lines);

    let status = view
        .status_message()
        .map(str::to_string)
        .unwrap_or_else(|| key_hint(view.focus).to_string());
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(palette.folder_text)),
        main[4],
    );
}

fn draw_sidebar(
    frame: &mut Frame,
    area: Rect,
    store: &NoteStore,
    view: &ViewState,
    palette: &ThemePalette,
) {
    let focused = view.focus == FocusPane::Sidebar;
    let block = Block::default()
        .title(Span::styled(
            " Blush Notes ",
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(border_style(focused, palette))
        .style(Style::default().bg(palette.sidebar));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let footer_height = match view.overlay() {
        Some(OverlayState::ThemePicker { .. }) => ThemeId::all().count() as u16 + 2,
        _ => 3,
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(footer_height)])
        .split(inner);

    let active = store.active_folder();
    let mut lines = Vec::with_capacity(store.folders().len() + 1);
    let entries = std::iter::once((FolderFilter::AllNotes, ALL_NOTES_LABEL.to_string())).chain(
        store
            .folders()
            .iter()
            .map(|name| (FolderFilter::Folder(name.clone()), format!("▪ {name}"))),
    );
    for (row, (filter, label)) in entries.enumerate() {
        let mut style = if &filter == active {
            Style::default().bg(palette.accent).fg(palette.text)
        } else {
            Style::default().fg(palette.folder_text)
        };
        let cursor = focused && row == view.sidebar_selected;
        if cursor {
            style = style.bg(palette.accent_hover).add_modifier(Modifier::BOLD);
        }
        let marker = if cursor { "▸ " } else { "  " };
        lines.push(Line::from(Span::styled(format!("{marker}{label}"), style)));
    }
    frame.render_widget(Paragraph::new(lines), rows[0]);

    match view.overlay() {
        Some(OverlayState::NewFolder { name }) => {
            let input = Paragraph::new(name.as_str())
                .style(Style::default().fg(palette.note_text).bg(palette.input_background))
                .block(
                    Block::default()
                        .title("Folder name")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(palette.primary)),
                );
            frame.render_widget(Clear, rows[1]);
            frame.render_widget(input, rows[1]);
            let inner_width = usize::from(rows[1].width.saturating_sub(2)).max(1);
            let x = rows[1].x + clamp_offset(name.width(), inner_width);
            frame.set_cursor(x, rows[1].y + 1);
        }
        Some(OverlayState::ThemePicker { selected }) => {
            let items = ThemeId::all()
                .enumerate()
                .map(|(idx, theme)| {
                    let mut style = Style::default().fg(palette.folder_text);
                    if theme == store.theme() {
                        style = style.bg(palette.accent);
                    }
                    if idx == *selected {
                        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
                    }
                    ListItem::new(Span::styled(theme.display_name(), style))
                })
                .collect::<Vec<_>>();
            let list = List::new(items).block(
                Block::default()
                    .title("Theme")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.primary)),
            );
            frame.render_widget(Clear, rows[1]);
            frame.render_widget(list, rows[1]);
        }
        None => {
            let hint = Paragraph::new(vec![
                Line::from(Span::styled("+ New Folder (n)", Style::default().fg(palette.primary))),
                Line::from(Span::styled("Theme (t)", Style::default().fg(palette.folder_text))),
            ]);
            frame.render_widget(hint, rows[1]);
        }
    }
}

fn draw_draft(
    frame: &mut Frame,
    areas: &[Rect],
    store: &NoteStore,
    view: &ViewState,
    palette: &ThemePalette,
) {
    let draft = store.draft();
    let focused = view.focus == FocusPane::Draft;
    let input_style = Style::default()
        .fg(palette.note_text)
        .bg(palette.input_background);

    let field_block = |title: &'static str, field: DraftField| {
        let active = focused && view.draft_field == field;
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if active {
                Style::default().fg(palette.primary)
            } else {
                Style::default().fg(palette.input_border)
            })
    };

    let title = if draft.title.is_empty() && !focused {
        Text::styled("Note title (optional)", input_style.add_modifier(Modifier::DIM))
    } else {
        Text::styled(draft.title.as_str(), input_style)
    };
    frame.render_widget(
        Paragraph::new(title).block(field_block("Title", DraftField::Title)),
        areas[0],
    );

    let content = if draft.content.is_empty() && !focused {
        Text::styled("Write a note...", input_style.add_modifier(Modifier::DIM))
    } else {
        Text::styled(draft.content.as_str(), input_style)
    };
    frame.render_widget(
        Paragraph::new(content)
            .wrap(Wrap { trim: false })
            .block(field_block("Note", DraftField::Content)),
        areas[1],
    );

    let label = if store.is_editing() {
        " Save changes (Ctrl-s) "
    } else {
        " Add note (Ctrl-s) "
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            label,
            Style::default()
                .fg(Color::White)
                .bg(palette.primary)
                .add_modifier(Modifier::BOLD),
        )),
        areas[2],
    );

    if focused && view.overlay().is_none() {
        let (area, text) = match view.draft_field {
            DraftField::Title => (areas[0], draft.title.as_str()),
            DraftField::Content => (areas[1], draft.content.as_str()),
        };
        if let Some((x, y)) = text_cursor(area, text) {
            frame.set_cursor(x, y);
        }
    }
}

fn draw_notes(
    frame: &mut Frame,
    area: Rect,
    store: &NoteStore,
    view: &ViewState,
    list_state: &mut ListState,
    palette: &ThemePalette,
    preview_lines: usize,
) {
    let focused = view.focus == FocusPane::Notes;
    let mut items = Vec::new();
    for (_, note) in store.visible() {
        items.push(ListItem::new(note_lines(note, palette, preview_lines)));
    }
    let empty = items.is_empty();
    if empty {
        items.push(ListItem::new(Span::styled(
            format!("No notes in {}", store.active_folder().label()),
            Style::default().fg(palette.folder_text),
        )));
    }

    let mut list = List::new(items).block(
        Block::default()
            .title(store.active_folder().label().to_string())
            .borders(Borders::ALL)
            .border_style(border_style(focused, palette))
            .style(Style::default().bg(palette.note_background)),
    );
    if focused && !empty {
        list = list
            .highlight_style(Style::default().bg(palette.accent).add_modifier(Modifier::BOLD))
            .highlight_symbol("▸ ");
    }
    frame.render_stateful_widget(list, area, list_state);
}

fn note_lines<'a>(note: &'a Note, palette: &ThemePalette, preview_lines: usize) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    if let Some(title) = note.display_title() {
        lines.push(Line::from(Span::styled(
            title,
            Style::default()
                .fg(palette.note_text)
                .add_modifier(Modifier::BOLD),
        )));
    }
    let mut content = note.content.lines();
    for line in content.by_ref().take(preview_lines) {
        lines.push(Line::from(Span::styled(
            line,
            Style::default().fg(palette.note_text),
        )));
    }
    if content.next().is_some() {
        lines.push(Line::from(Span::styled(
            "…",
            Style::default().fg(palette.folder_text),
        )));
    }
    let mut meta = vec![Span::styled(
        format_timestamp(note.timestamp),
        Style::default().fg(palette.folder_text),
    )];
    if let Some(folder) = note.folder.as_deref() {
        meta.push(Span::raw("  "));
        meta.push(Span::styled(
            folder,
            Style::default()
                .fg(palette.folder_text)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    lines.push(Line::from(meta));
    lines.push(Line::from(""));
    lines
}

fn border_style(focused: bool, palette: &ThemePalette) -> Style {
    if focused {
        Style::default().fg(palette.primary)
    } else {
        Style::default().fg(palette.note_border)
    }
}

fn key_hint(focus: FocusPane) -> &'static str {
    match focus {
        FocusPane::Sidebar => "j/k move • Enter open • n new folder • d delete • t theme • Tab next • q quit",
        FocusPane::Notes => "j/k move • e edit • d delete • a new note • t theme • Tab next • q quit",
        FocusPane::Draft => "Ctrl-s save • Esc discard • ↑/↓ switch field • Tab next",
    }
}

pub fn format_timestamp(ts: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    ts.format(&format).unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

/// Screen position just after the last character of `text` inside a bordered box.
fn text_cursor(area: Rect, text: &str) -> Option<(u16, u16)> {
    let inner_width = usize::from(area.width.checked_sub(2)?);
    let inner_height = usize::from(area.height.checked_sub(2)?);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }
    let mut row: usize = 0;
    let mut col: usize = 0;
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            row = row.saturating_add(1);
        }
        let width = line.width();
        row = row.saturating_add(width / inner_width);
        col = width % inner_width;
    }
    Some((
        area.x + clamp_offset(col, inner_width),
        area.y + clamp_offset(row, inner_height),
    ))
}

/// One past the border, capped at the last cell of an inner span of `span` cells.
fn clamp_offset(offset: usize, span: usize) -> u16 {
    u16::try_from(offset.min(span - 1) + 1).unwrap_or(u16::MAX)
}
