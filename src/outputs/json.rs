//! JSON output of a run.
//!
//! Files are organized by date with edition names:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//!
//! A second run in the same edition overwrites the earlier file.

use chrono::Local;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

use crate::models::RunOutput;
use crate::utils::time_of_day;

/// A run result stamped with when and for what it was produced.
#[derive(Debug, Serialize)]
pub struct Edition<'a> {
    pub local_date: String,
    pub local_time: String,
    pub time_of_day: String,
    pub category: &'a str,
    #[serde(flatten)]
    pub output: &'a RunOutput,
}

impl<'a> Edition<'a> {
    /// Stamp `output` with the current local date and edition.
    pub fn now(category: &'a str, output: &'a RunOutput) -> Self {
        let now = Local::now();
        Self {
            local_date: now.date_naive().to_string(),
            local_time: now.time().format("%H:%M:%S").to_string(),
            time_of_day: time_of_day(),
            category,
            output,
        }
    }

    /// `{json_output_dir}/{date}/{time_of_day}.json`
    pub fn path_in(&self, json_output_dir: &str) -> PathBuf {
        Path::new(json_output_dir)
            .join(&self.local_date)
            .join(format!("{}.json", self.time_of_day))
    }
}

/// Write an [`Edition`] under `json_output_dir`, creating the date directory.
///
/// # Returns
///
/// The path written, or an error if directory creation or file writing fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_edition(edition: &Edition<'_>, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(edition)?;
    let path = edition.path_in(json_output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON edition");
    Ok(path)
}
