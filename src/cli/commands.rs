use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::{App, Session};
use crate::config::ThemeId;
use crate::storage::KeyValueStore;
use crate::store::{Command, FolderFilter, Note, NoteRef};
use crate::ui::format_timestamp;

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Note content. If omitted, reads from stdin.
    #[arg()]
    pub content: Vec<String>,
    /// Optional title
    #[arg(long)]
    pub title: Option<String>,
    /// File the note under this folder
    #[arg(long)]
    pub folder: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Position of the note as shown by `list`
    pub index: usize,
    /// New title (kept when omitted)
    #[arg(long)]
    pub title: Option<String>,
    /// New content (kept when omitted)
    #[arg(long)]
    pub content: Option<String>,
    /// Move the note to this folder
    #[arg(long)]
    pub folder: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Position of the note as shown by `list`
    pub index: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show notes filed under this folder
    #[arg(long)]
    pub folder: Option<String>,
    /// Content lines printed per note
    #[arg(long, default_value_t = 2)]
    pub lines: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FolderCommand {
    /// Create a folder
    Add { name: String },
    /// Delete a folder (notes keep or lose the label per config)
    Delete { name: String },
    /// List folders with their note counts
    List,
}

#[derive(Args, Debug, Clone)]
pub struct FolderArgs {
    #[command(subcommand)]
    pub command: FolderCommand,
}

#[derive(Args, Debug, Clone)]
pub struct ThemeArgs {
    /// Theme identifier to switch to
    pub name: Option<String>,
    /// List available themes
    #[arg(long)]
    pub list: bool,
}

pub fn run_tui<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
    app.run()
}

pub fn add_note<S: KeyValueStore>(session: &mut Session<S>, args: AddArgs) -> Result<()> {
    let content = if args.content.is_empty() {
        read_stdin()?.unwrap_or_default()
    } else {
        args.content.join(" ")
    };
    print!("{}", run_add(session, args.title, args.folder, content)?);
    Ok(())
}

fn run_add<S: KeyValueStore>(
    session: &mut Session<S>,
    title: Option<String>,
    folder: Option<String>,
    content: String,
) -> Result<String> {
    if let Some(folder) = folder {
        apply(session, Command::SelectFolder(FolderFilter::Folder(folder)))?;
    }
    apply(session, Command::SetDraftTitle(title.unwrap_or_default()))?;
    apply(session, Command::SetDraftContent(content))?;
    apply(session, Command::CommitDraft)?;

    let notes = session.store().notes();
    let position = notes.len() - 1;
    Ok(format!("Added {}\n", headline(position, &notes[position])))
}

pub fn edit_note<S: KeyValueStore>(session: &mut Session<S>, args: EditArgs) -> Result<()> {
    print!("{}", run_edit(session, args)?);
    Ok(())
}

fn run_edit<S: KeyValueStore>(session: &mut Session<S>, args: EditArgs) -> Result<String> {
    if args.title.is_none() && args.content.is_none() && args.folder.is_none() {
        bail!("nothing to change; pass --title, --content or --folder");
    }
    let index = args.index;
    let current_folder = session
        .store()
        .notes()
        .get(index)
        .and_then(|note| note.folder.clone());

    let mut out = String::new();
    let target = match (args.folder, current_folder) {
        (Some(folder), _) => FolderFilter::Folder(folder),
        (None, Some(folder)) if session.store().folders().contains(&folder) => {
            FolderFilter::Folder(folder)
        }
        (None, Some(orphaned)) => {
            let _ = writeln!(
                &mut out,
                "Folder '{orphaned}' no longer exists; the note is now unfiled."
            );
            FolderFilter::AllNotes
        }
        (None, None) => FolderFilter::AllNotes,
    };

    apply(session, Command::BeginEdit(NoteRef::Index(index)))?;
    apply(session, Command::SelectFolder(target))?;
    if let Some(title) = args.title {
        apply(session, Command::SetDraftTitle(title))?;
    }
    if let Some(content) = args.content {
        apply(session, Command::SetDraftContent(content))?;
    }
    apply(session, Command::CommitDraft)?;

    let note = &session.store().notes()[index];
    let _ = writeln!(&mut out, "Saved {}", headline(index, note));
    Ok(out)
}

pub fn delete_note<S: KeyValueStore>(session: &mut Session<S>, args: DeleteArgs) -> Result<()> {
    let removed = session
        .store()
        .notes()
        .get(args.index)
        .map(|note| headline(args.index, note));
    apply(session, Command::DeleteNote(NoteRef::Index(args.index)))?;
    if let Some(headline) = removed {
        println!("Deleted {headline}");
    }
    Ok(())
}

pub fn list_notes<S: KeyValueStore>(session: &mut Session<S>, args: ListArgs) -> Result<()> {
    print!("{}", run_list(session, &args)?);
    Ok(())
}

fn run_list<S: KeyValueStore>(session: &mut Session<S>, args: &ListArgs) -> Result<String> {
    let filter = args
        .folder
        .clone()
        .map(FolderFilter::Folder)
        .unwrap_or_default();
    apply(session, Command::SelectFolder(filter))?;

    let store = session.store();
    let mut out = String::new();
    let mut shown = 0;
    for (position, note) in store.visible() {
        shown += 1;
        let _ = writeln!(&mut out, "{}", headline(position, note));
        let _ = writeln!(&mut out, "    saved   {}", format_timestamp(note.timestamp));
        for line in note.content.lines().take(args.lines) {
            let _ = writeln!(&mut out, "    {line}");
        }
        out.push('\n');
    }
    if shown == 0 {
        let _ = writeln!(&mut out, "No notes in {}.", store.active_folder().label());
    }
    Ok(out)
}

pub fn handle_folder_command<S: KeyValueStore>(
    session: &mut Session<S>,
    args: FolderArgs,
) -> Result<()> {
    print!("{}", run_folder(session, args.command)?);
    Ok(())
}

fn run_folder<S: KeyValueStore>(session: &mut Session<S>, command: FolderCommand) -> Result<String> {
    match command {
        FolderCommand::Add { name } => {
            apply(session, Command::AddFolder(name.clone()))?;
            Ok(format!("Created folder '{name}'\n"))
        }
        FolderCommand::Delete { name } => {
            let filed = count_in_folder(session.store().notes(), &name);
            apply(session, Command::DeleteFolder(name.clone()))?;
            let still_labelled = count_in_folder(session.store().notes(), &name);
            let mut out = format!("Deleted folder '{name}'\n");
            if still_labelled > 0 {
                let plural = if still_labelled == 1 { "" } else { "s" };
                let _ = writeln!(
                    &mut out,
                    "{still_labelled} note{plural} still labelled '{name}'"
                );
            } else if filed > 0 {
                let plural = if filed == 1 { "" } else { "s" };
                let _ = writeln!(&mut out, "{filed} note{plural} moved to unfiled");
            }
            Ok(out)
        }
        FolderCommand::List => {
            let store = session.store();
            let mut out = String::new();
            let _ = writeln!(&mut out, "All Notes ({})", store.notes().len());
            for folder in store.folders() {
                let count = count_in_folder(store.notes(), folder);
                let _ = writeln!(&mut out, "- {folder} ({count})");
            }
            Ok(out)
        }
    }
}

pub fn handle_theme_command<S: KeyValueStore>(
    session: &mut Session<S>,
    args: ThemeArgs,
) -> Result<()> {
    print!("{}", run_theme(session, args)?);
    Ok(())
}

fn run_theme<S: KeyValueStore>(session: &mut Session<S>, args: ThemeArgs) -> Result<String> {
    if let Some(name) = args.name {
        apply(session, Command::SetTheme(name))?;
    }
    let current = session.store().theme();
    if args.list {
        let mut out = String::new();
        for theme in ThemeId::all() {
            let marker = if theme == current { "*" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:<12} {}", theme.as_ref(), theme.display_name());
        }
        return Ok(out);
    }
    Ok(format!("{} ({})\n", current.as_ref(), current.display_name()))
}

fn apply<S: KeyValueStore>(session: &mut Session<S>, command: Command) -> Result<()> {
    session.dispatch(command)?.into_result()?;
    Ok(())
}

fn headline(position: usize, note: &Note) -> String {
    let mut line = format!(
        "#{position}  {}",
        note.display_title().unwrap_or("<untitled>")
    );
    if let Some(folder) = note.folder.as_deref() {
        let _ = write!(&mut line, "  [{folder}]");
    }
    line
}

fn count_in_folder(notes: &[Note], folder: &str) -> usize {
    notes
        .iter()
        .filter(|note| note.folder.as_deref() == Some(folder))
        .count()
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading note content from stdin")?;
    Ok(Some(buf))
}
