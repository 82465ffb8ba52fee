use std::fs;
use std::path::{Path, PathBuf};

use haptic_core::HapticPattern;

use crate::error::{ProcessError, Result};

/// Writes one `<track_id>.json` artifact per pattern into an output directory.
#[derive(Debug, Clone)]
pub struct PatternWriter {
    output_dir: PathBuf,
}

impl PatternWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ProcessError::Write {
            path: self.output_dir.clone(),
            source,
        })
    }

    pub fn path_for(&self, track_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", track_id))
    }

    pub fn write(&self, pattern: &HapticPattern) -> Result<PathBuf> {
        let path = self.path_for(pattern.track_id());
        write_pattern(&path, pattern)?;
        Ok(path)
    }
}

/// Pretty JSON with two-space indentation and a trailing newline.
pub fn render_pattern(pattern: &HapticPattern) -> Result<String> {
    let json = serde_json::to_string_pretty(pattern).map_err(|source| ProcessError::Serialize {
        track_id: pattern.track_id().to_string(),
        source,
    })?;
    Ok(format!("{}\n", json))
}

pub fn write_pattern(path: &Path, pattern: &HapticPattern) -> Result<()> {
    let rendered = render_pattern(pattern)?;
    fs::write(path, rendered).map_err(|source| ProcessError::Write {
        path: path.to_path_buf(),
        source,
    })
}
