// src/config/mod.rs
//! Runtime settings: built-in defaults, an optional TOML file and
//! environment overrides (secrets may come from `<VAR>_FILE`).

pub mod settings;

pub use settings::{
    read_secret, EmailSettings, FetchSettings, MailCredentials, ScheduleSettings, Settings,
    StorageSettings,
};
