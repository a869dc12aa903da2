use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod client;
pub mod database;
pub mod editor;
pub mod error;
pub mod highlight;
pub mod models;
pub mod notes;
pub mod selection;
pub mod server;
pub mod todos;
pub mod view;

#[cfg(test)]
mod testing;

use database::{Store, StoreResult};
use error::{ApiError, ApiResult};

// App settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub cors_permissive: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_path: PathBuf::from("notes.db"),
            cors_permissive: true,
        }
    }
}

impl Settings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Load settings from disk, falling back to defaults
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        warn!(path = %path.display(), "settings file not found, using defaults");
        return Settings::default();
    }

    match std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|content| Ok(serde_json::from_str::<Settings>(&content)?))
    {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), "failed to read settings, using defaults: {}", e);
            Settings::default()
        }
    }
}

// App state shared by every request handler
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `f` against the store. The lock is held only for the call.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> StoreResult<T>) -> ApiResult<T> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| ApiError::Internal("store mutex poisoned".to_string()))?;
        Ok(f(&mut store)?)
    }
}

#[derive(Debug, Parser)]
#[command(name = "notes-app", version, about = "Notes and todo-list server")]
pub struct Cli {
    /// JSON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH")]
    pub database: Option<PathBuf>,
}

impl Cli {
    /// Settings file first, then flags and environment on top.
    pub fn settings(&self) -> Settings {
        let mut settings = self
            .config
            .as_deref()
            .map(load_settings)
            .unwrap_or_default();

        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(database) = &self.database {
            settings.database_path = database.clone();
        }
        settings
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn run() -> Result<()> {
    init_logging();
    let settings = Cli::parse().settings();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let store = Store::open(&settings.database_path)?;
        info!(path = %settings.database_path.display(), "database ready");

        let app = server::router(AppState::new(store), settings.cors_permissive);
        server::serve(app, &settings.addr()).await
    })
}
