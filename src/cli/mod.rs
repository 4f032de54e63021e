use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::{App, Session};
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage::{self, PersistenceAdapter};

pub mod commands;

use self::commands::{AddArgs, DeleteArgs, EditArgs, FolderArgs, ListArgs, ThemeArgs};

#[derive(Parser, Debug)]
#[command(
    name = "blushnotes",
    version,
    about = "Notes, folders and colour themes in the terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over BLUSHNOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over BLUSHNOTES_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Add a note, optionally filed under a folder
    Add(AddArgs),
    /// Replace a note's title or content
    Edit(EditArgs),
    /// Delete a note by its position
    Delete(DeleteArgs),
    /// Print notes, optionally only those in one folder
    List(ListArgs),
    /// Manage folders
    Folder(FolderArgs),
    /// Show, list or switch the colour theme
    Theme(ThemeArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let kv = storage::init(&paths, &config.storage)?;
    tracing::debug!(path = %kv.path().display(), "key-value store ready");
    let (mut session, warnings) = Session::open(
        PersistenceAdapter::new(kv),
        config.folders.orphaned_notes,
    )?;

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => {
            let mut app = App::new(config, session);
            if let Some(first) = warnings.first() {
                app.view_mut().set_status_message(Some(first.to_string()));
            }
            commands::run_tui(&mut app)
        }
        Commands::Add(args) => commands::add_note(&mut session, args),
        Commands::Edit(args) => commands::edit_note(&mut session, args),
        Commands::Delete(args) => commands::delete_note(&mut session, args),
        Commands::List(args) => commands::list_notes(&mut session, args),
        Commands::Folder(args) => commands::handle_folder_command(&mut session, args),
        Commands::Theme(args) => commands::handle_theme_command(&mut session, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
