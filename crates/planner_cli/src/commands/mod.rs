pub mod cycle;
pub mod read;
pub mod strip;
pub mod write;

use anyhow::{Context, Result};
use planner_core::{default_log_level, init_logging, open_db, Settings};
use planner_core::db::Connection;

/// Settings plus an open database, shared by every subcommand.
pub struct Runtime {
    pub settings: Settings,
    pub conn: Connection,
}

impl Runtime {
    pub fn open() -> Result<Self> {
        let settings = Settings::from_env().context("reading settings")?;
        let level = settings
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string());
        init_logging(&level, &settings.log_dir)
            .map_err(anyhow::Error::msg)
            .context("starting logging")?;

        let path = settings.notes_db_path();
        let conn = open_db(&path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Self { settings, conn })
    }
}
