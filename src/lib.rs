pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod storage;
pub mod store;
pub mod ui;

pub use app::{Outcome, Session};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{PersistError, StoreError, ValidationError};
pub use store::{Command, NoteStore, PersistedSlice};
