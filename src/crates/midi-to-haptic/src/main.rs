use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use haptic_core::{
    ExtractOptions, HapticExtractor, RegisterFilter, TempoMode, DEFAULT_HIGH_NOTE, DEFAULT_LOW_NOTE,
    DEFAULT_MIN_GAP_MS,
};
use midi_to_haptic::analysis::{self, AnalysisEntry};
use midi_to_haptic::catalog::{self, discover_midi_files, Manifest};
use midi_to_haptic::output::{render_pattern, write_pattern};
use midi_to_haptic::{BatchRunner, MidiData, PatternWriter};

#[derive(Parser, Debug)]
#[command(name = "midi-to-haptic")]
#[command(about = "Extract low-register haptic patterns from MIDI files", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show per-stage details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single MIDI file
    Extract {
        /// Path to the MIDI file (default: first .mid file in current directory)
        #[arg(short, long)]
        midi: Option<PathBuf>,

        /// Output file path (default: `<midi-name>.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print output to stdout instead of file
        #[arg(long)]
        stdout: bool,

        /// Track identifier written to the pattern (default: file stem)
        #[arg(long)]
        track_id: Option<String>,

        /// Display title stored in the pattern
        #[arg(long)]
        title: Option<String>,

        /// Haptic rendering style, e.g. heartbeat or purr
        #[arg(long)]
        style: Option<String>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Convert every MIDI file in a directory, or the tracks listed in a manifest
    Batch {
        /// Directory containing MIDI files or per-track folders
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory receiving one `<track_id>.json` per pattern
        #[arg(short, long)]
        output_dir: PathBuf,

        /// TOML track manifest mapping catalog keys to track ids
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Worker threads (default: available parallelism)
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Report tempo changes and instruments of MIDI files
    Analyze {
        /// A MIDI file or a directory of MIDI files
        path: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct ExtractArgs {
    /// Lowest note kept (inclusive)
    #[arg(long, default_value_t = DEFAULT_LOW_NOTE)]
    low: u8,

    /// Highest note kept (inclusive)
    #[arg(long, default_value_t = DEFAULT_HIGH_NOTE)]
    high: u8,

    /// Minimum gap between consecutive haptic events, in milliseconds
    #[arg(long, default_value_t = DEFAULT_MIN_GAP_MS)]
    min_gap: u64,

    /// Only keep notes played by this General MIDI instrument (repeatable)
    #[arg(long = "instrument")]
    instruments: Vec<String>,

    /// Use only the first tempo event for the whole file
    #[arg(long)]
    first_tempo: bool,
}

impl ExtractArgs {
    fn to_options(&self) -> Result<ExtractOptions> {
        let mut filter = RegisterFilter::new(self.low, self.high)?;
        if !self.instruments.is_empty() {
            filter = filter.with_instruments(&self.instruments)?;
        }

        Ok(ExtractOptions {
            filter,
            min_gap_ms: self.min_gap,
            tempo_mode: if self.first_tempo {
                TempoMode::FirstTempo
            } else {
                TempoMode::Segmented
            },
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet, args.verbose);

    match args.command {
        Command::Extract {
            midi,
            output,
            stdout,
            track_id,
            title,
            style,
            extract,
        } => run_extract(midi, output, stdout, track_id, title, style, &extract),
        Command::Batch {
            input_dir,
            output_dir,
            manifest,
            jobs,
            extract,
        } => run_batch(&input_dir, output_dir, manifest.as_deref(), jobs, &extract),
        Command::Analyze { path, json } => run_analyze(&path, json),
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run_extract(
    midi: Option<PathBuf>,
    output: Option<PathBuf>,
    stdout: bool,
    track_id: Option<String>,
    title: Option<String>,
    style: Option<String>,
    extract: &ExtractArgs,
) -> Result<()> {
    // Find MIDI file
    let midi_path = if let Some(path) = midi {
        if !path.exists() {
            anyhow::bail!("MIDI file not found: {}", path.display());
        }
        path
    } else {
        find_first_midi_file()?
    };

    let stem = midi_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string();
    let track_id = track_id.unwrap_or_else(|| stem.clone());

    log::info!("Processing MIDI file: {}", midi_path.display());

    let data = MidiData::from_file(&midi_path)?;
    let extractor = HapticExtractor::new(extract.to_options()?);
    let Some(mut pattern) = extractor
        .pattern(track_id, &data.sequence)
        .with_context(|| format!("Rejected {}", midi_path.display()))?
    else {
        log::warn!("No low-register notes in {}, nothing written", midi_path.display());
        return Ok(());
    };

    if let Some(title) = title {
        pattern = pattern.with_title(title);
    }
    if let Some(style) = style {
        pattern = pattern.with_style(style);
    }

    if stdout {
        // Print directly to stdout (clean, no logs)
        print!("{}", render_pattern(&pattern)?);
    } else {
        let output_path = output.unwrap_or_else(|| PathBuf::from(format!("{}.json", stem)));
        write_pattern(&output_path, &pattern)?;
        log::info!(
            "{} event(s), {} BPM, avg velocity {}; saved to {}",
            pattern.stats().total_events,
            pattern.bpm(),
            pattern.stats().avg_velocity,
            output_path.display()
        );
    }

    Ok(())
}

fn run_batch(
    input_dir: &Path,
    output_dir: PathBuf,
    manifest: Option<&Path>,
    jobs: Option<usize>,
    extract: &ExtractArgs,
) -> Result<()> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", input_dir.display());
    }

    let options = extract.to_options()?;
    let batch_jobs = match manifest {
        Some(path) => {
            let manifest = Manifest::load(path)?;
            catalog::jobs_from_manifest(&manifest, input_dir, &options)?
        }
        None => catalog::jobs_from_directory(input_dir, &options),
    };

    if batch_jobs.is_empty() {
        log::warn!("No MIDI files found in {}", input_dir.display());
        return Ok(());
    }

    let mut runner = BatchRunner::new(PatternWriter::new(output_dir));
    if let Some(workers) = jobs {
        runner = runner.with_workers(workers);
    }
    let report = runner.run(&batch_jobs)?;

    eprintln!("{}", report.summary());
    if report.has_failures() {
        anyhow::bail!("{} job(s) failed", report.failed());
    }
    Ok(())
}

fn run_analyze(path: &Path, json: bool) -> Result<()> {
    let files = if path.is_dir() {
        discover_midi_files(path)
    } else if path.exists() {
        vec![path.to_path_buf()]
    } else {
        anyhow::bail!("Path not found: {}", path.display());
    };

    if files.is_empty() {
        anyhow::bail!("No MIDI files found in {}", path.display());
    }

    let entries: Vec<AnalysisEntry> = files.iter().map(|file| analysis::analyze_file(file)).collect();

    if json {
        let rendered = serde_json::to_string_pretty(&entries).context("Failed to serialize analysis")?;
        println!("{}", rendered);
        return Ok(());
    }

    for entry in &entries {
        println!("{}", analysis::format_entry(entry));
    }
    if entries.len() > 1 {
        println!("{}", analysis::format_usage(&analysis::instrument_usage(&entries)));
    }
    Ok(())
}

fn find_first_midi_file() -> Result<PathBuf> {
    let entries = fs::read_dir(".").context("Failed to read current directory")?;

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("mid") {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No MIDI files found in current directory"))
}
