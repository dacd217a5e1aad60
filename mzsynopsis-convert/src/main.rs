//! Convert search engine result files into canonical synopsis and first hits files

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::atomic::AtomicBool,
};

use clap::{Parser, ValueEnum};
use context_error::{BoxedError, CreateError, FullErrorContent};
use mzsynopsis::prelude::*;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

/// The command line interface arguments
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// The search engine result files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// The directory to write the output files to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    /// The modification definitions file (tab separated: Symbol, Mass, Residues, Type, Name)
    #[arg(short, long)]
    modifications: Option<PathBuf>,
    /// A JSON file with the processing options, command line flags take precedence
    #[arg(long)]
    options: Option<PathBuf>,
    /// The search tool that generated the files, detected from the file name and header if not given
    #[arg(short, long)]
    tool: Option<SearchTool>,
    /// Which files to write
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,
    /// Sort the output on the primary score instead of on scan
    #[arg(long)]
    sort_by_score: bool,
    /// The tolerance in Dalton used to match modifications by mass
    #[arg(long)]
    mass_tolerance: Option<f64>,
    /// A FASTA file, if given the residue start and end of each peptide are added
    #[arg(long)]
    fasta: Option<PathBuf>,
}

/// The output files to write
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum Mode {
    /// Only the synopsis file
    Synopsis,
    /// Only the first hits file
    FirstHits,
    /// Both the synopsis and first hits files
    Both,
}

impl Mode {
    fn output_modes(self) -> &'static [OutputMode] {
        match self {
            Self::Synopsis => &[OutputMode::Synopsis],
            Self::FirstHits => &[OutputMode::FirstHits],
            Self::Both => &[OutputMode::Synopsis, OutputMode::FirstHits],
        }
    }
}

fn report(error: &BoxedError<'_, SynopsisError>) {
    if error.get_kind().is_recoverable() {
        warn!("{error}");
    } else {
        error!("{error}");
    }
}

fn load_registry(
    path: Option<&Path>,
) -> Result<ModificationRegistry, BoxedError<'static, SynopsisError>> {
    let Some(path) = path else {
        return Ok(ModificationRegistry::default());
    };
    let (definitions, errors) = load_modification_definitions(path)?;
    for error in &errors {
        report(error);
    }
    info!(
        "Loaded {} modification definitions from {}",
        definitions.len(),
        path.display()
    );
    Ok(ModificationRegistry::new(definitions))
}

fn add_protein_positions(
    mapper: &ProteinMapper,
    output: &Path,
) -> Result<usize, BoxedError<'static, SynopsisError>> {
    let text = std::fs::read_to_string(output).map_err(|e| {
        BoxedError::new(
            SynopsisError::OutputWriteFailure,
            "Could not reopen output file",
            e.to_string(),
            context_error::Context::none()
                .source(output.to_string_lossy())
                .to_owned(),
        )
    })?;
    let file = File::create(output).map_err(|e| {
        BoxedError::new(
            SynopsisError::OutputWriteFailure,
            "Could not rewrite output file",
            e.to_string(),
            context_error::Context::none()
                .source(output.to_string_lossy())
                .to_owned(),
        )
    })?;
    let mut writer = BufWriter::new(file);
    let located = mapper.annotate(text.as_bytes(), &mut writer)?;
    writer.flush().map_err(|e| {
        BoxedError::new(
            SynopsisError::OutputWriteFailure,
            "Could not rewrite output file",
            e.to_string(),
            context_error::Context::none(),
        )
    })?;
    Ok(located)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
    let args = Cli::parse();

    let mut options = match args.options.as_deref().map(ProcessingOptions::from_json_file) {
        None => ProcessingOptions::default(),
        Some(Ok(options)) => options,
        Some(Err(error)) => {
            report(&error);
            return ExitCode::FAILURE;
        }
    };
    options.sort_by_score |= args.sort_by_score;
    if let Some(tolerance) = args.mass_tolerance {
        options.mass_tolerance = tolerance;
    }

    let registry = match load_registry(args.modifications.as_deref()) {
        Ok(registry) => registry.with_tolerance(options.mass_tolerance),
        Err(error) => {
            report(&error);
            return ExitCode::FAILURE;
        }
    };
    let mapper = match args.fasta.as_deref().map(ProteinMapper::parse_file) {
        None => None,
        Some(Ok(mapper)) => Some(mapper),
        Some(Err(error)) => {
            report(&error);
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = std::fs::create_dir_all(&args.out_dir) {
        error!(
            "Could not create output directory {}: {error}",
            args.out_dir.display()
        );
        return ExitCode::FAILURE;
    }

    let abort = AtomicBool::new(false);
    let mut failed = false;
    for mode in args.mode.output_modes() {
        let options = ProcessingOptions {
            mode: *mode,
            ..options.clone()
        };
        for (output, result) in process_files(
            &args.inputs,
            &args.out_dir,
            args.tool,
            &registry,
            &options,
            &abort,
        ) {
            match result {
                Ok(summary) => {
                    if summary.error_log.dropped() > 0 {
                        warn!(
                            "{} of {} problems in {} are not kept in the error log",
                            summary.error_log.dropped(),
                            summary.error_log.entries(),
                            output.display()
                        );
                    }
                    if let Some(mapper) = &mapper {
                        match add_protein_positions(mapper, &output) {
                            Ok(located) => info!(
                                "Located {located} of {} peptides in their protein",
                                summary.written
                            ),
                            Err(error) => {
                                report(&error);
                                failed = true;
                            }
                        }
                    }
                }
                Err(error) => {
                    report(&error);
                    failed = true;
                    if error.get_kind() == SynopsisError::OutputWriteFailure && output.exists() {
                        warn!("Removing incomplete output {}", output.display());
                        if let Err(error) = std::fs::remove_file(&output) {
                            warn!("Could not remove {}: {error}", output.display());
                        }
                    }
                }
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
