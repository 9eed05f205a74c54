use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use autofigure_core::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracker_logging::{tracker_info, tracker_warn};

const RESUME_FILENAME: &str = ".autofigure_job.ron";

/// Last submitted job, enough to re-attach to it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub job_id: JobId,
    pub base_url: String,
    pub submitted_at: DateTime<Utc>,
}

impl ResumeRecord {
    pub fn new(job_id: JobId, base_url: impl Into<String>) -> Self {
        Self {
            job_id,
            base_url: base_url.into(),
            submitted_at: Utc::now(),
        }
    }
}

pub fn resume_path(dir: &Path) -> PathBuf {
    dir.join(RESUME_FILENAME)
}

/// Returns `None` when no record exists or it cannot be parsed.
pub fn load_resume_record(dir: &Path) -> Option<ResumeRecord> {
    let path = resume_path(dir);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracker_warn!("Failed to read resume record from {:?}: {}", path, err);
            return None;
        }
    };

    match ron::from_str(&content) {
        Ok(record) => Some(record),
        Err(err) => {
            tracker_warn!("Failed to parse resume record from {:?}: {}", path, err);
            None
        }
    }
}

/// Replaces the record through a temp file in the same directory.
pub fn save_resume_record(dir: &Path, record: &ResumeRecord) -> anyhow::Result<PathBuf> {
    let content = ron::ser::to_string_pretty(record, ron::ser::PrettyConfig::new())
        .context("serializing resume record")?;

    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let target = resume_path(dir);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target)
        .with_context(|| format!("replacing {}", target.display()))?;

    tracker_info!("Saved resume record for job {} to {:?}", record.job_id, target);
    Ok(target)
}
