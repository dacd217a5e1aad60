use serde::{Deserialize, Serialize};

use crate::{
    common_parser::{FormatVersion, Location},
    csv::CsvLine,
    error::{SynopsisError, SynopsisResult},
    mass::neutral_to_mz,
    modification::ModificationRegistry,
    peptide::NormalizedPeptide,
    search_hit::{HitMetadata, ScoreValue},
};

static NUMBER_ERROR: (&str, &str) = (
    "Invalid MODa line",
    "This column is not a number but it is required to be a number in this MODa format",
);

const MODA_COLUMNS: &[&str] = &[
    "SpectrumFile",
    "Index",
    "ObservedMonoMass",
    "Charge",
    "CalculatedMonoMass",
    "DeltaMass",
    "Score",
    "Probability",
    "Peptide",
    "Protein",
    "PeptidePosition",
];

format_family!(
    MODa, [&VERSION_1_2], b'\t', Some(MODA_COLUMNS.iter().map(ToString::to_string).collect());
    required {
        spectrum_file: String, |location: Location| Ok(location.get_string());
        /// The spectrum index, used as scan number
        scan: u32, |location: Location| location.parse::<u32>(NUMBER_ERROR);
        observed_mass: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        z: u8, |location: Location| location.parse::<u8>(NUMBER_ERROR);
        calculated_mass: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        delta_mass: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        probability: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        peptide: String, |location: Location| Ok(location.get_string());
        protein: String, |location: Location| Ok(location.get_string());
        peptide_position: String, |location: Location| Ok(location.get_string());
    }
    optional { }
);

/// Version 1.2 of MODa, the column layout is identical for all known versions
pub const VERSION_1_2: MODaFormat = MODaFormat {
    version: MODaVersion::V1_2,
    spectrum_file: "spectrumfile",
    scan: "index",
    observed_mass: "observedmonomass",
    z: "charge",
    calculated_mass: "calculatedmonomass",
    delta_mass: "deltamass",
    score: "score",
    probability: "probability",
    peptide: "peptide",
    protein: "protein",
    peptide_position: "peptideposition",
};

/// All possible MODa versions
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum MODaVersion {
    /// Version 1.2 and later
    #[default]
    V1_2,
}

impl std::fmt::Display for MODaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl FormatVersion<MODaFormat> for MODaVersion {
    fn format(self) -> MODaFormat {
        match self {
            Self::V1_2 => VERSION_1_2,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Self::V1_2 => "v1.2",
        }
    }
}

impl HitMetadata for MODaHit {
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
        NormalizedPeptide::parse_inline(&self.peptide, &[], registry)
    }

    fn protein(&self) -> &str {
        &self.protein
    }

    /// MODa reports the neutral mass, this is converted back to m/z
    fn precursor_mz(&self) -> Option<f64> {
        (self.z > 0).then(|| neutral_to_mz(self.observed_mass, self.z))
    }

    fn reported_ntt(&self) -> Option<u8> {
        None
    }

    fn scores(&self) -> Vec<ScoreValue> {
        vec![self.score.clone()]
    }

    fn significance(&self) -> ScoreValue {
        self.probability.clone()
    }
}
