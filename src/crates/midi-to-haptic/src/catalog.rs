//! Finding input files and turning them into batch jobs.
//!
//! Two layouts are understood. Without a manifest every MIDI file under the
//! input directory is a job named after its file stem. With a manifest each
//! `[[track]]` entry names a catalog key such as `1_3`, which is looked up
//! either as `<key>.mid` or as a `<key>_<title>/` folder holding an
//! orchestrated render.
//!
//! ```toml
//! [[track]]
//! key = "1_3"
//! id = "sleep_03"
//! title = "Deep Night Dream"
//! pattern = "heartbeat"
//! layout = "folder"
//! instruments = ["Cello", "Contrabass"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use haptic_core::ExtractOptions;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{ProcessError, Result};

/// Suffix of the orchestrated render inside a per-track folder.
pub const ORCHESTRATED_SUFFIX: &str = "Orchestrated.mid";

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(rename = "track", default)]
    pub tracks: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackEntry {
    pub key: String,
    pub id: String,
    pub title: Option<String>,
    pub pattern: Option<String>,
    /// Overrides the run-wide instrument allow-list for this track.
    pub instruments: Option<Vec<String>>,
    #[serde(default)]
    pub layout: Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<key>.mid` directly inside the input directory.
    #[default]
    File,
    /// A `<key>_*` folder containing `*Orchestrated.mid`.
    Folder,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ProcessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| ProcessError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    Found(PathBuf),
    /// The manifest expected an input that is not on disk.
    Missing { expected: String },
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub track_id: String,
    pub source: JobSource,
    pub title: Option<String>,
    pub style: Option<String>,
    pub options: ExtractOptions,
}

impl BatchJob {
    pub fn for_file(path: PathBuf, options: ExtractOptions) -> Self {
        let track_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        Self {
            track_id,
            source: JobSource::Found(path),
            title: None,
            style: None,
            options,
        }
    }
}

/// Track ids become `<id>.json` inside the output directory, so they must
/// not name anything outside it.
pub fn is_plain_track_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains(['/', '\\'])
        && !id.contains("..")
        && Path::new(id).is_relative()
}

fn is_midi_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
}

/// All MIDI files below `dir`, sorted by path.
pub fn discover_midi_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_midi_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

pub fn jobs_from_directory(dir: &Path, options: &ExtractOptions) -> Vec<BatchJob> {
    discover_midi_files(dir)
        .into_iter()
        .map(|path| BatchJob::for_file(path, options.clone()))
        .collect()
}

pub fn jobs_from_manifest(
    manifest: &Manifest,
    dir: &Path,
    options: &ExtractOptions,
) -> Result<Vec<BatchJob>> {
    manifest
        .tracks
        .iter()
        .map(|entry| {
            if !is_plain_track_id(&entry.id) {
                return Err(ProcessError::InvalidTrackId {
                    key: entry.key.clone(),
                    id: entry.id.clone(),
                });
            }

            let mut job_options = options.clone();
            if let Some(instruments) = &entry.instruments {
                job_options.filter = options
                    .filter
                    .clone()
                    .with_instruments(instruments)
                    .map_err(|source| ProcessError::ManifestEntry {
                        key: entry.key.clone(),
                        source,
                    })?;
            }

            Ok(BatchJob {
                track_id: entry.id.clone(),
                source: locate(dir, &entry.key, entry.layout),
                title: entry.title.clone(),
                style: entry.pattern.clone(),
                options: job_options,
            })
        })
        .collect()
}

fn locate(dir: &Path, key: &str, layout: Layout) -> JobSource {
    match layout {
        Layout::File => {
            let path = dir.join(format!("{}.mid", key));
            if path.is_file() {
                JobSource::Found(path)
            } else {
                JobSource::Missing {
                    expected: path.display().to_string(),
                }
            }
        }
        Layout::Folder => {
            let prefix = format!("{}_", key);
            let render = first_child(dir, |entry| {
                entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with(&prefix)
            })
            .and_then(|folder| {
                first_child(&folder, |entry| {
                    entry.file_type().is_file()
                        && entry.file_name().to_string_lossy().ends_with(ORCHESTRATED_SUFFIX)
                })
            });

            match render {
                Some(path) => JobSource::Found(path),
                None => JobSource::Missing {
                    expected: format!("{}/{}*/*{}", dir.display(), prefix, ORCHESTRATED_SUFFIX),
                },
            }
        }
    }
}

/// First direct child of `dir` (by name) matching `predicate`.
fn first_child<F>(dir: &Path, predicate: F) -> Option<PathBuf>
where
    F: Fn(&walkdir::DirEntry) -> bool,
{
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| predicate(entry))
        .map(|entry| entry.into_path())
}
