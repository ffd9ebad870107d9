//! melodyroll - MusicXML melodies to piano-roll arrays and back
//!
//! Subcommands:
//! - `melodyroll encode` - Cut scores into 4-measure windows saved as `.npy`
//! - `melodyroll regen <in> <out>` - Rewrite a score as a clean single-part MusicXML file
//! - `melodyroll info <files>...` - Print metadata summaries as YAML

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use melodyroll::{
    extract, regenerate, regenerate_unchecked, summaries_to_csv, summaries_to_yaml, summarize,
    write_npy, BatchDriver, Config, FailurePolicy,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "melodyroll")]
#[command(about = "Convert single-melody MusicXML scores into piano-roll arrays and back")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode melodies into piano-roll windows
    #[command(group(ArgGroup::new("source").required(true).args(["input", "dir"])))]
    Encode {
        /// A single MusicXML file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// A directory of MusicXML files (names containing "xml")
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Directory for the .npy windows and the summary
        #[arg(short, long)]
        out_dir: PathBuf,

        /// YAML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Grid rows per quarter note (overrides the config)
        #[arg(long)]
        divisions: Option<u32>,

        /// Write a summary table of every piece to OUT_DIR/<NAME>.csv
        #[arg(long, value_name = "NAME")]
        summary: Option<String>,

        /// Only read the scores and collect summaries
        #[arg(long)]
        look: bool,

        /// Log failing scores and continue with the rest
        #[arg(long)]
        keep_going: bool,
    },

    /// Rewrite a score as a single-part MusicXML file
    Regen {
        input: PathBuf,
        output: PathBuf,

        /// YAML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the measure-grid check
        #[arg(long)]
        no_validate: bool,
    },

    /// Print metadata summaries as YAML
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encode {
            input,
            dir,
            out_dir,
            config,
            divisions,
            summary,
            look,
            keep_going,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(divisions) = divisions {
                config.encoder.grid_resolution = divisions;
                config.encoder.validate()?;
            }
            let files = match (input, dir) {
                (Some(file), _) => vec![file],
                (None, Some(dir)) => score_files(&dir)?,
                (None, None) => bail!("either --input or --dir is required"),
            };
            let policy = if keep_going { FailurePolicy::Skip } else { FailurePolicy::Abort };
            run_encode(&files, &out_dir, config, policy, look, summary.as_deref())
        }
        Commands::Regen {
            input,
            output,
            config,
            no_validate,
        } => {
            let config = load_config(config.as_deref())?;
            let xml = read_score(&input)?;
            let score = if no_validate {
                regenerate_unchecked(&xml, &config.synth)
            } else {
                regenerate(&xml, &config.synth)
            }
            .with_context(|| format!("converting {}", input.display()))?;
            fs::write(&output, score).with_context(|| format!("writing {}", output.display()))?;
            info!(output = %output.display(), "wrote MusicXML");
            Ok(())
        }
        Commands::Info { files } => {
            let convention = Config::default().encoder.octave_convention;
            let mut summaries = Vec::with_capacity(files.len());
            for file in &files {
                let xml = read_score(file)?;
                let extraction = extract(&xml).with_context(|| format!("reading {}", file.display()))?;
                summaries.push(summarize(&piece_name(file), &extraction, convention));
            }
            print!("{}", summaries_to_yaml(&summaries)?);
            Ok(())
        }
    }
}

fn run_encode(
    files: &[PathBuf],
    out_dir: &Path,
    config: Config,
    policy: FailurePolicy,
    look: bool,
    summary: Option<&str>,
) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut driver = BatchDriver::new(config.encoder, policy).look_only(look);
    for file in files {
        let name = piece_name(file);
        info!(file = %file.display(), "loading");
        let xml = read_score(file)?;
        let output = driver
            .process(&name, &xml)
            .with_context(|| format!("converting {}", file.display()))?;

        if let Some(output) = output {
            for window in &output.windows {
                let path = out_dir.join(format!("{}.npy", window.id.file_stem(&output.name)));
                write_npy(&path, &window.roll).with_context(|| format!("writing {}", path.display()))?;
            }
        }
    }

    let report = driver.finish();
    if let Some(name) = summary {
        let path = out_dir.join(format!("{}.csv", name));
        fs::write(&path, summaries_to_csv(&report.summaries)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), pieces = report.summaries.len(), "saved summary");
    }
    for (name, error) in &report.failed {
        eprintln!("failed: {}: {}", name, error);
    }
    info!(
        converted = report.converted,
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        windows = report.windows,
        "done"
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

/// Files directly inside `dir` whose names contain "xml", in name order.
fn score_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().contains("xml") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn read_score(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn piece_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "piece".to_string())
}
