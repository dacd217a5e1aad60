use serde::{Deserialize, Serialize};

use crate::{
    common_parser::{FormatVersion, Location},
    csv::CsvLine,
    error::{SynopsisError, SynopsisResult},
    modification::ModificationRegistry,
    peptide::NormalizedPeptide,
    search_hit::{HitMetadata, ScoreValue},
};

static NUMBER_ERROR: (&str, &str) = (
    "Invalid Inspect line",
    "This column is not a number but it is required to be a number in this Inspect format",
);

/// The columns of an Inspect result file, the files do not always contain a header
const INSPECT_COLUMNS: &[&str] = &[
    "#SpectrumFile",
    "Scan#",
    "Annotation",
    "Protein",
    "Charge",
    "MQScore",
    "Length",
    "TotalPRMScore",
    "MedianPRMScore",
    "FractionY",
    "FractionB",
    "Intensity",
    "NTT",
    "p-value",
    "F-Score",
    "DeltaScore",
    "DeltaScoreOther",
    "RecordNumber",
    "DBFilePos",
    "SpecFilePos",
    "PrecursorMZ",
    "PrecursorError",
];

format_family!(
    Inspect, [&VERSION_20120109], b'\t', Some(INSPECT_COLUMNS.iter().map(ToString::to_string).collect());
    required {
        spectrum_file: String, |location: Location| Ok(location.get_string());
        scan: u32, |location: Location| location.parse::<u32>(NUMBER_ERROR);
        /// The peptide with flanking residues, `*` is used for the protein terminus
        annotation: String, |location: Location| Ok(location.get_string());
        protein: String, |location: Location| Ok(location.get_string());
        z: u8, |location: Location| location.parse::<u8>(NUMBER_ERROR);
        mq_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        length: usize, |location: Location| location.parse::<usize>(NUMBER_ERROR);
        total_prm_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        median_prm_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        fraction_y: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        fraction_b: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        intensity: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        ntt: u8, |location: Location| location.parse::<u8>(NUMBER_ERROR);
        p_value: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        f_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        delta_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        delta_score_other: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        record_number: usize, |location: Location| location.parse::<usize>(NUMBER_ERROR);
        db_file_position: u64, |location: Location| location.parse::<u64>(NUMBER_ERROR);
        spectrum_file_position: u64, |location: Location| location.parse::<u64>(NUMBER_ERROR);
        precursor_mz: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        precursor_error: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
    }
    optional { }
);

/// The Inspect format as written since version 20120109
pub const VERSION_20120109: InspectFormat = InspectFormat {
    version: InspectVersion::V20120109,
    spectrum_file: "#spectrumfile",
    scan: "scan#",
    annotation: "annotation",
    protein: "protein",
    z: "charge",
    mq_score: "mqscore",
    length: "length",
    total_prm_score: "totalprmscore",
    median_prm_score: "medianprmscore",
    fraction_y: "fractiony",
    fraction_b: "fractionb",
    intensity: "intensity",
    ntt: "ntt",
    p_value: "p-value",
    f_score: "f-score",
    delta_score: "deltascore",
    delta_score_other: "deltascoreother",
    record_number: "recordnumber",
    db_file_position: "dbfilepos",
    spectrum_file_position: "specfilepos",
    precursor_mz: "precursormz",
    precursor_error: "precursorerror",
};

/// All possible Inspect versions
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum InspectVersion {
    /// Version 20120109 and later
    #[default]
    V20120109,
}

impl std::fmt::Display for InspectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl FormatVersion<InspectFormat> for InspectVersion {
    fn format(self) -> InspectFormat {
        match self {
            Self::V20120109 => VERSION_20120109,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Self::V20120109 => "v20120109",
        }
    }
}

impl HitMetadata for InspectHit {
    fn scan(&self) -> u32 {
        self.scan
    }

    fn charge(&self) -> u8 {
        self.z
    }

    fn peptide(
        &self,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(NormalizedPeptide, Vec<BoxedError<'static, SynopsisError>>)> {
        NormalizedPeptide::parse_inline(&self.annotation, &['*'], registry)
    }

    fn protein(&self) -> &str {
        &self.protein
    }

    fn precursor_mz(&self) -> Option<f64> {
        Some(self.precursor_mz)
    }

    fn reported_ntt(&self) -> Option<u8> {
        Some(self.ntt)
    }

    fn scores(&self) -> Vec<ScoreValue> {
        vec![
            self.mq_score.clone(),
            self.total_prm_score.clone(),
            self.median_prm_score.clone(),
            self.fraction_y.clone(),
            self.fraction_b.clone(),
            self.intensity.clone(),
            self.f_score.clone(),
            self.delta_score.clone(),
            self.delta_score_other.clone(),
        ]
    }

    fn significance(&self) -> ScoreValue {
        self.p_value.clone()
    }
}
