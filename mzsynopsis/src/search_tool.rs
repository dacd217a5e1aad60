//! The supported search tools and their ranking schemes

use std::{
    cmp::Ordering,
    fmt::Display,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use context_error::*;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    common_parser::FormatHit,
    csv::{CsvLine, csv_separate, is_header_like, open_file},
    error::{SynopsisError, SynopsisResult},
    formats::{InspectHit, MODaHit, MSFraggerHit, MSGFPlusHit, SageHit},
    helper_functions::plain_file_name,
    search_hit::SearchHitData,
    selection::{SynopsisThresholds, ThresholdPredicate},
};

/// The direction in which a score is better
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SortDirection {
    /// A higher score is better (descending sort)
    HigherIsBetter,
    /// A lower score is better (ascending sort, e.g. e-values)
    LowerIsBetter,
}

impl SortDirection {
    /// Replace a missing (NaN) score by the worst possible value for this direction
    pub const fn or_worst(self, value: f64) -> f64 {
        if value.is_nan() {
            match self {
                Self::HigherIsBetter => f64::NEG_INFINITY,
                Self::LowerIsBetter => f64::INFINITY,
            }
        } else {
            value
        }
    }

    /// Order two scores with the best score first
    pub fn best_first(self, a: f64, b: f64) -> Ordering {
        match self {
            Self::HigherIsBetter => OrderedFloat(b).cmp(&OrderedFloat(a)),
            Self::LowerIsBetter => OrderedFloat(a).cmp(&OrderedFloat(b)),
        }
    }
}

/// The scores used to rank the matches of one scan
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RankingScheme {
    /// The primary sort column
    pub primary: &'static str,
    /// The direction of the primary sort
    pub primary_direction: SortDirection,
    /// The tie breaking sort column
    pub secondary: &'static str,
    /// The direction of the tie breaking sort
    pub secondary_direction: SortDirection,
    /// The column used to calculate the normalised delta score
    pub delta: &'static str,
}

/// A search tool with a supported result format
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SearchTool {
    /// Inspect `_inspect.txt`
    Inspect,
    /// MODa `_moda.txt`
    MODa,
    /// MS-GF+ `_msgfplus.tsv`
    MSGFPlus,
    /// Sage `results.sage.tsv`
    Sage,
    /// MSFragger and FragPipe `psm.tsv`
    MSFragger,
}

impl SearchTool {
    /// All supported tools
    pub const ALL: [Self; 5] = [
        Self::Inspect,
        Self::MODa,
        Self::MSGFPlus,
        Self::Sage,
        Self::MSFragger,
    ];

    /// The human readable name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inspect => "Inspect",
            Self::MODa => "MODa",
            Self::MSGFPlus => "MS-GF+",
            Self::Sage => "Sage",
            Self::MSFragger => "MSFragger",
        }
    }

    /// The output column names of the tool specific scores, in the order they are written
    pub const fn score_columns(self) -> &'static [&'static str] {
        match self {
            Self::Inspect => &[
                "MQScore",
                "TotalPRMScore",
                "MedianPRMScore",
                "FractionY",
                "FractionB",
                "Intensity",
                "FScore",
                "DeltaScore",
                "DeltaScoreOther",
            ],
            Self::MODa => &["Score"],
            Self::MSGFPlus => &["DeNovoScore", "MSGFScore", "SpecEValue", "QValue", "PepQValue"],
            Self::Sage => &[
                "Hyperscore",
                "DeltaNext",
                "Poisson",
                "DiscriminantScore",
                "PosteriorError",
                "PeptideQ",
                "ProteinQ",
            ],
            Self::MSFragger => &["Hyperscore", "NextScore", "PeptideProphetProbability"],
        }
    }

    /// The output column name of the significance score
    pub const fn significance_column(self) -> &'static str {
        match self {
            Self::Inspect => "PValue",
            Self::MODa => "Probability",
            Self::MSGFPlus => "EValue",
            Self::Sage => "SpectrumQ",
            Self::MSFragger => "Expectation",
        }
    }

    /// The scores used to rank matches
    pub const fn ranking(self) -> RankingScheme {
        use SortDirection::{HigherIsBetter, LowerIsBetter};
        match self {
            Self::Inspect => RankingScheme {
                primary: "TotalPRMScore",
                primary_direction: HigherIsBetter,
                secondary: "FScore",
                secondary_direction: HigherIsBetter,
                delta: "TotalPRMScore",
            },
            Self::MODa => RankingScheme {
                primary: "Probability",
                primary_direction: HigherIsBetter,
                secondary: "Score",
                secondary_direction: HigherIsBetter,
                delta: "Score",
            },
            Self::MSGFPlus => RankingScheme {
                primary: "SpecEValue",
                primary_direction: LowerIsBetter,
                secondary: "MSGFScore",
                secondary_direction: HigherIsBetter,
                delta: "MSGFScore",
            },
            Self::Sage => RankingScheme {
                primary: "Hyperscore",
                primary_direction: HigherIsBetter,
                secondary: "SpectrumQ",
                secondary_direction: LowerIsBetter,
                delta: "Hyperscore",
            },
            Self::MSFragger => RankingScheme {
                primary: "Expectation",
                primary_direction: LowerIsBetter,
                secondary: "Hyperscore",
                secondary_direction: HigherIsBetter,
                delta: "Hyperscore",
            },
        }
    }

    /// The thresholds a match has to pass (any of them) to be written to the synopsis file
    pub fn default_thresholds(self) -> SynopsisThresholds {
        SynopsisThresholds::new(match self {
            Self::Inspect => vec![
                ThresholdPredicate::at_most("PValue", 0.2),
                ThresholdPredicate::at_least("TotalPRMScore", 50.0),
            ],
            Self::MODa => vec![ThresholdPredicate::at_least("Probability", 0.05)],
            Self::MSGFPlus => vec![
                ThresholdPredicate::at_most("SpecEValue", 5e-7),
                ThresholdPredicate::at_most("EValue", 0.75),
            ],
            Self::Sage => vec![ThresholdPredicate::at_most("SpectrumQ", 0.05)],
            Self::MSFragger => vec![ThresholdPredicate::at_most("Expectation", 0.1)],
        })
    }

    /// Check if the tool writes all matches of one scan consecutively, otherwise the matches have
    /// to be collected for the whole file before they can be ranked. MS-GF+ sorts its output on
    /// score when run with multiple threads, so its scans can be interleaved.
    pub const fn scan_ordered(self) -> bool {
        matches!(self, Self::Inspect | Self::MODa)
    }

    /// The column separator
    pub const fn separator(self) -> u8 {
        match self {
            Self::Inspect => InspectHit::SEPARATOR,
            Self::MODa => MODaHit::SEPARATOR,
            Self::MSGFPlus => MSGFPlusHit::SEPARATOR,
            Self::Sage => SageHit::SEPARATOR,
            Self::MSFragger => MSFraggerHit::SEPARATOR,
        }
    }

    /// The column names for formats that are read by position
    pub fn provided_header(self) -> Option<Vec<String>> {
        match self {
            Self::Inspect => InspectHit::provided_header(),
            Self::MODa => MODaHit::provided_header(),
            Self::MSGFPlus => MSGFPlusHit::provided_header(),
            Self::Sage => SageHit::provided_header(),
            Self::MSFragger => MSFraggerHit::provided_header(),
        }
    }

    /// Parse a single line of a result file of this tool
    /// # Errors
    /// If the line does not fit any version of the format of this tool.
    pub fn parse_line(self, line: &CsvLine) -> SynopsisResult<SearchHitData> {
        match self {
            Self::Inspect => InspectHit::parse(line).map(|(hit, _)| hit.into()),
            Self::MODa => MODaHit::parse(line).map(|(hit, _)| hit.into()),
            Self::MSGFPlus => MSGFPlusHit::parse(line).map(|(hit, _)| hit.into()),
            Self::Sage => SageHit::parse(line).map(|(hit, _)| hit.into()),
            Self::MSFragger => MSFraggerHit::parse(line).map(|(hit, _)| hit.into()),
        }
    }

    /// Determine the tool from the file name only
    pub fn from_file_name(path: impl AsRef<Path>) -> Option<Self> {
        let name = plain_file_name(path);
        if name.ends_with("_inspect.txt") {
            Some(Self::Inspect)
        } else if name.ends_with("_moda.txt") {
            Some(Self::MODa)
        } else if name.ends_with("_msgfplus.tsv") || name.ends_with("_msgfdb.tsv") {
            Some(Self::MSGFPlus)
        } else if name.ends_with("results.sage.tsv") {
            Some(Self::Sage)
        } else if name.ends_with("psm.tsv") {
            Some(Self::MSFragger)
        } else {
            None
        }
    }

    /// Determine the tool from the first line of a file. Files without a header row are
    /// recognised by their number of columns.
    pub fn detect_from_header(first_line: &str) -> Option<Self> {
        let separator = b'\t';
        if !is_header_like(first_line, separator) {
            return match csv_separate(first_line, separator).ok()?.len() {
                22 => Some(Self::Inspect),
                11 => Some(Self::MODa),
                _ => None,
            };
        }
        let header = first_line.to_ascii_lowercase();
        let has = |column: &str| header.split('\t').any(|c| c.trim() == column);
        if has("totalprmscore") && has("mqscore") {
            Some(Self::Inspect)
        } else if has("specevalue") && has("msgfscore") {
            Some(Self::MSGFPlus)
        } else if has("sage_discriminant_score") || (has("hyperscore") && has("spectrum_q")) {
            Some(Self::Sage)
        } else if has("hyperscore") && (has("expectation") || has("expectscore")) {
            Some(Self::MSFragger)
        } else if has("probability") && has("peptideposition") {
            Some(Self::MODa)
        } else {
            None
        }
    }

    /// Determine the tool that generated a file, first on the file name then on the header row.
    /// # Errors
    /// If the file cannot be opened or the tool could not be determined.
    pub fn detect(path: impl AsRef<Path>) -> SynopsisResult<Self> {
        let path = path.as_ref();
        if let Some(tool) = Self::from_file_name(path) {
            debug!("Detected {tool} from the file name of {}", path.display());
            return Ok(tool);
        }
        let first_line = BufReader::new(open_file(path)?)
            .lines()
            .map_while(Result::ok)
            .find(|line| !line.trim().is_empty() && !line.starts_with("sep="))
            .unwrap_or_default();
        let tool = Self::detect_from_header(&first_line).ok_or_else(|| {
            BoxedError::new(
                SynopsisError::UnknownFormat,
                "Unknown result file format",
                "The search tool could not be determined from the file name or the header, specify the tool explicitly",
                Context::none().source(path.to_string_lossy()).to_owned(),
            )
        })?;
        debug!("Detected {tool} from the header of {}", path.display());
        Ok(tool)
    }
}

impl Display for SearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SearchTool {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inspect" => Ok(Self::Inspect),
            "moda" => Ok(Self::MODa),
            "msgfplus" | "ms-gf+" | "msgf+" | "msgf" => Ok(Self::MSGFPlus),
            "sage" => Ok(Self::Sage),
            "msfragger" | "fragpipe" => Ok(Self::MSFragger),
            other => Err(format!(
                "Unknown search tool '{other}', use one of: inspect, moda, msgfplus, sage, msfragger"
            )),
        }
    }
}
