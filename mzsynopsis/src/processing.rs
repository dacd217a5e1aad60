//! Processing a complete result file: parse, group, rank, select, and write

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use context_error::*;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    csv::{open_file, parse_csv_raw},
    error::{DEFAULT_ERROR_LOG_CAPACITY, ErrorLog, SynopsisError, SynopsisResult},
    modification::{DEFAULT_MASS_TOLERANCE, ModificationRegistry},
    ranking::Ranked,
    search_hit::SearchHit,
    search_tool::SearchTool,
    selection::{MatchSelector, OutputMode, ScanGrouper, SynopsisThresholds},
    writer::{HeaderWritten, SynopsisWriter},
};

/// The marker appended to the error log when processing was aborted
pub const ABORT_MARKER: &str = "processing aborted";

/// All settings for processing a file
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Which matches are written
    pub mode: OutputMode,
    /// Sort all written matches on their primary score instead of writing them in scan order
    pub sort_by_score: bool,
    /// The tolerance in Dalton for resolving modifications by mass
    pub mass_tolerance: f64,
    /// The maximal number of characters kept in the error log
    pub error_log_capacity: usize,
    /// The number of lines between two progress updates
    pub progress_interval: usize,
    /// The synopsis thresholds, if not set the defaults of the search tool are used
    pub thresholds: Option<SynopsisThresholds>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            sort_by_score: false,
            mass_tolerance: DEFAULT_MASS_TOLERANCE,
            error_log_capacity: DEFAULT_ERROR_LOG_CAPACITY,
            progress_interval: 1000,
            thresholds: None,
        }
    }
}

impl ProcessingOptions {
    /// Read the options from a JSON file, missing fields get their default value
    /// # Errors
    /// `ParameterFileNotFound` if the file cannot be read or is not valid.
    pub fn from_json_file(path: impl AsRef<Path>) -> SynopsisResult<Self> {
        let path = path.as_ref();
        let file_error = |short: &'static str, long: String| {
            BoxedError::new(
                SynopsisError::ParameterFileNotFound,
                short,
                long,
                Context::none().source(path.to_string_lossy()).to_owned(),
            )
        };
        let file = File::open(path)
            .map_err(|e| file_error("Could not open options file", e.to_string()))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| file_error("Invalid options file", e.to_string()))
    }

    /// The thresholds in use for the given tool
    pub fn thresholds(&self, tool: SearchTool) -> SynopsisThresholds {
        self.thresholds
            .clone()
            .unwrap_or_else(|| tool.default_thresholds())
    }
}

/// How the processing of a file ended
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ProcessingStatus {
    /// All lines were processed
    #[default]
    Completed,
    /// The abort flag was raised, only the groups completed before that are written
    Aborted,
}

/// The outcome of processing a file
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ProcessingSummary {
    /// The tool that generated the file
    pub tool: Option<SearchTool>,
    /// The output mode
    pub mode: OutputMode,
    /// How processing ended
    pub status: ProcessingStatus,
    /// The number of data lines read
    pub lines: usize,
    /// The number of lines skipped because they could not be parsed
    pub skipped_lines: usize,
    /// The number of unresolved modifications seen
    pub unresolved_modifications: usize,
    /// The number of unnamed modifications added to the registry
    pub registered_modifications: usize,
    /// The number of records written
    pub written: usize,
    /// All recoverable errors
    pub error_log: ErrorLog,
}

/// Report the progress as a percentage, at most once every `interval` lines and only if the
/// percentage changed.
pub struct ProgressReporter<F> {
    callback: F,
    total_lines: Option<usize>,
    interval: usize,
    last: Option<u8>,
}

impl<F> std::fmt::Debug for ProgressReporter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("total_lines", &self.total_lines)
            .field("interval", &self.interval)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl<F: FnMut(u8)> ProgressReporter<F> {
    /// Create a new reporter, without a total only the start and finish are reported
    pub fn new(callback: F, total_lines: Option<usize>, interval: usize) -> Self {
        Self {
            callback,
            total_lines,
            interval: interval.max(1),
            last: None,
        }
    }

    fn report(&mut self, percentage: u8) {
        if self.last != Some(percentage) {
            self.last = Some(percentage);
            (self.callback)(percentage);
        }
    }

    /// Signal that the line with this zero based count is being processed
    pub fn line(&mut self, count: usize) {
        if count == 0 {
            self.report(0);
        } else if count % self.interval == 0 {
            if let Some(total) = self.total_lines.filter(|t| *t > 0) {
                let percentage = (count.min(total) * 100 / total).min(99) as u8;
                self.report(percentage);
            }
        }
    }

    /// Signal that all lines are processed
    pub fn finish(&mut self) {
        self.report(100);
    }
}

/// The writer of selected matches, optionally keeping all of them for sorting at the end
struct Output<W: Write> {
    writer: SynopsisWriter<W, HeaderWritten>,
    sort_buffer: Option<Vec<Ranked<SearchHit>>>,
}

impl<W: Write> Output<W> {
    fn emit(&mut self, selected: Vec<Ranked<SearchHit>>) -> SynopsisResult<()> {
        if let Some(buffer) = &mut self.sort_buffer {
            buffer.extend(selected);
        } else {
            for record in &selected {
                self.writer.write(record)?;
            }
        }
        Ok(())
    }

    fn finish(mut self, selector: &MatchSelector) -> SynopsisResult<(W, usize)> {
        if let Some(mut buffer) = self.sort_buffer.take() {
            selector.sort_globally(&mut buffer);
            for record in &buffer {
                self.writer.write(record)?;
            }
        }
        let written = self.writer.written();
        Ok((self.writer.finish()?, written))
    }
}

fn log_recoverable(log: &mut ErrorLog, error: &BoxedError<'static, SynopsisError>) {
    warn!("{error}");
    log.push_error(error);
}

/// Process the lines of a result file from the given tool and write the selected matches to
/// `writer`. The mass tolerance of the registry is set to the one in the options. Recoverable
/// errors are collected in the error log of the summary. The abort flag is checked before every
/// line, if it is raised the groups selected so far are written and the summary has the status
/// [`ProcessingStatus::Aborted`].
/// # Errors
/// `OutputWriteFailure` if the output could not be written, the output is incomplete in that case.
pub fn process_reader<R: Read, W: Write>(
    reader: R,
    writer: W,
    tool: SearchTool,
    registry: &mut ModificationRegistry,
    options: &ProcessingOptions,
    progress: &mut ProgressReporter<impl FnMut(u8)>,
    abort: &AtomicBool,
) -> SynopsisResult<(W, ProcessingSummary)> {
    registry.set_tolerance(options.mass_tolerance);
    let registered_before = registry.registered();
    let mut summary = ProcessingSummary {
        tool: Some(tool),
        mode: options.mode,
        error_log: ErrorLog::new(options.error_log_capacity),
        ..ProcessingSummary::default()
    };
    let selector = MatchSelector::new(options.mode, options.thresholds(tool), tool.ranking());
    let mut grouper = ScanGrouper::new(tool.scan_ordered());
    let mut output = Output {
        writer: SynopsisWriter::new(writer, tool).write_header()?,
        sort_buffer: options.sort_by_score.then(Vec::new),
    };

    let lines = match parse_csv_raw(reader, tool.separator(), tool.provided_header()) {
        Ok(lines) => Some(lines),
        Err(error) if error.get_kind().is_recoverable() => {
            log_recoverable(&mut summary.error_log, &error);
            None
        }
        Err(error) => return Err(error),
    };

    for (count, line) in lines.into_iter().flatten().enumerate() {
        if abort.load(Ordering::Relaxed) {
            summary.status = ProcessingStatus::Aborted;
            break;
        }
        progress.line(count);
        summary.lines += 1;
        let parsed = line
            .and_then(|line| tool.parse_line(&line))
            .and_then(|data| SearchHit::new(data, registry));
        let (hit, unresolved) = match parsed {
            Ok(parsed) => parsed,
            Err(error) => {
                summary.skipped_lines += 1;
                log_recoverable(&mut summary.error_log, &error);
                continue;
            }
        };
        summary.unresolved_modifications += unresolved.len();
        for error in &unresolved {
            log_recoverable(&mut summary.error_log, error);
        }
        if let Some(group) = grouper.push(hit) {
            output.emit(selector.select(group))?;
        }
    }

    if summary.status == ProcessingStatus::Completed {
        for group in grouper.finish() {
            output.emit(selector.select(group))?;
        }
    } else {
        debug!("Discarding {} matches of incomplete scan groups", grouper.len());
    }
    let (writer, written) = output.finish(&selector)?;
    summary.written = written;
    summary.registered_modifications = registry.registered() - registered_before;

    match summary.status {
        ProcessingStatus::Completed => progress.finish(),
        ProcessingStatus::Aborted => {
            warn!("Processing aborted after {} lines", summary.lines);
            summary.error_log.finish_with(ABORT_MARKER);
        }
    }
    Ok((writer, summary))
}

/// The output file name for an input file, `<stem>_syn.txt` or `<stem>_fht.txt` in the given
/// directory. A trailing `.gz` and the extension are removed from the input name.
pub fn output_path(
    input: impl AsRef<Path>,
    directory: impl AsRef<Path>,
    mode: OutputMode,
) -> PathBuf {
    let name = input
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = if name.to_ascii_lowercase().ends_with(".gz") {
        &name[..name.len() - 3]
    } else {
        name.as_str()
    };
    let stem = Path::new(name)
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().to_string());
    directory
        .as_ref()
        .join(format!("{stem}{}", mode.file_suffix()))
}

/// Process a result file. If no tool is given it is detected from the file name and header.
/// # Errors
/// * `InputFileNotFound` if the input cannot be opened.
/// * `UnknownFormat` if the tool could not be detected.
/// * `OutputWriteFailure` if the output cannot be created or written, any partial output is left on disk.
pub fn process_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    tool: Option<SearchTool>,
    registry: &mut ModificationRegistry,
    options: &ProcessingOptions,
    progress: impl FnMut(u8),
    abort: &AtomicBool,
) -> SynopsisResult<ProcessingSummary> {
    let input = input.as_ref();
    let output = output.as_ref();
    let tool = match tool {
        Some(tool) => tool,
        None => SearchTool::detect(input)?,
    };
    info!("Processing {} as {tool} results", input.display());
    let total_lines = BufReader::new(open_file(input)?).lines().count();
    let reader = open_file(input)?;
    let file = File::create(output).map_err(|e| {
        BoxedError::new(
            SynopsisError::OutputWriteFailure,
            "Could not create output file",
            e.to_string(),
            Context::none().source(output.to_string_lossy()).to_owned(),
        )
    })?;
    let mut progress =
        ProgressReporter::new(progress, Some(total_lines), options.progress_interval);
    let (_, summary) = process_reader(
        reader,
        BufWriter::new(file),
        tool,
        registry,
        options,
        &mut progress,
        abort,
    )?;
    info!(
        "Wrote {} records to {} ({} lines, {} skipped, {} unresolved modifications)",
        summary.written,
        output.display(),
        summary.lines,
        summary.skipped_lines,
        summary.unresolved_modifications
    );
    if summary.registered_modifications > 0 {
        debug!(
            "Added {} unnamed modifications while processing {}",
            summary.registered_modifications,
            input.display()
        );
    }
    Ok(summary)
}

/// Process multiple result files into the given directory, each file gets its own copy of the
/// registry. Files are processed in parallel if the `rayon` feature is enabled.
pub fn process_files(
    inputs: &[PathBuf],
    directory: impl AsRef<Path> + Sync,
    tool: Option<SearchTool>,
    registry: &ModificationRegistry,
    options: &ProcessingOptions,
    abort: &AtomicBool,
) -> Vec<(PathBuf, SynopsisResult<ProcessingSummary>)> {
    let process = |input: &PathBuf| {
        let output = output_path(input, directory.as_ref(), options.mode);
        let mut registry = registry.clone();
        let progress = |percentage: u8| debug!("{}: {percentage}%", input.display());
        let result = process_file(input, &output, tool, &mut registry, options, progress, abort);
        (output, result)
    };
    #[cfg(feature = "rayon")]
    let inputs = inputs.par_iter();
    #[cfg(not(feature = "rayon"))]
    let inputs = inputs.iter();
    inputs.map(process).collect()
}
