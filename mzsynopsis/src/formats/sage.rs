use serde::{Deserialize, Serialize};

use crate::{
    common_parser::{FormatVersion, Location, OptionalColumn},
    csv::CsvLine,
    error::{SynopsisError, SynopsisResult},
    helper_functions::scan_from_native_id,
    mass::neutral_to_mz,
    modification::ModificationRegistry,
    peptide::NormalizedPeptide,
    search_hit::{HitMetadata, ScoreValue},
};

static NUMBER_ERROR: (&str, &str) = (
    "Invalid Sage line",
    "This column is not a number but it is required to be a number in this Sage format",
);

format_family!(
    Sage, [&VERSION_0_14], b'\t', None;
    required {
        /// The peptide in ProForma like notation (`[+42.0106]-PEPM[+15.9949]K`)
        peptide: String, |location: Location| Ok(location.get_string());
        /// The first of the proteins
        proteins: String, |location: Location| Ok(location.as_str().split(';').next().unwrap_or_default().trim().to_string());
        scan: u32, |location: Location| scan_from_native_id(location.as_str()).ok_or_else(|| location.error(
            "Invalid Sage line",
            "The scan number could not be read from the native id",
        ));
        /// Target (1) or decoy (-1)
        label: i8, |location: Location| location.parse::<i8>(NUMBER_ERROR);
        experimental_mass: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        calculated_mass: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        z: u8, |location: Location| location.parse::<u8>(NUMBER_ERROR);
        hyperscore: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        delta_next: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        poisson: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        discriminant_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        posterior_error: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        spectrum_q: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
    }
    optional {
        filename: String, |location: Location| Ok(location.get_string());
        rank: usize, |location: Location| location.parse::<usize>(NUMBER_ERROR);
        semi_enzymatic: bool, |location: Location| match location.as_str().trim() {
            "1" | "true" | "True" => Ok(true),
            "0" | "false" | "False" => Ok(false),
            _ => Err(location.error("Invalid Sage line", "The semi enzymatic column should be 0 or 1")),
        };
        peptide_q: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        protein_q: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
    }
);

/// The Sage `results.sage.tsv` format as written since version 0.14
pub const VERSION_0_14: SageFormat = SageFormat {
    version: SageVersion::V0_14,
    peptide: "peptide",
    proteins: "proteins",
    scan: "scannr",
    label: "label",
    experimental_mass: "expmass",
    calculated_mass: "calcmass",
    z: "charge",
    hyperscore: "hyperscore",
    delta_next: "delta_next",
    poisson: "poisson",
    discriminant_score: "sage_discriminant_score",
    posterior_error: "posterior_error",
    spectrum_q: "spectrum_q",
    filename: OptionalColumn::Optional("filename"),
    rank: OptionalColumn::Optional("rank"),
    semi_enzymatic: OptionalColumn::Optional("semi_enzymatic"),
    peptide_q: OptionalColumn::Optional("peptide_q"),
    protein_q: OptionalColumn::Optional("protein_q"),
};

/// All possible Sage versions
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum SageVersion {
    /// Version 0.14 and later
    #[default]
    V0_14,
}

impl std::fmt::Display for SageVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl FormatVersion<SageFormat> for SageVersion {
    fn format(self) -> SageFormat {
        match self {
            Self::V0_14 => VERSION_0_14,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Self::V0_14 => "v0.14",
        }
    }
}

impl HitMetadata for SageHit {
    fn scan(&self) -> u32 {
        self.scan
    }

    fn charge(&self) -> u8 {
        self.z
    }

    /// Sage does not report flanking residues, so these are always the protein terminus
    fn peptide(
        &self,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(NormalizedPeptide, Vec<BoxedError<'static, SynopsisError>>)> {
        NormalizedPeptide::parse_bracketed(&self.peptide, registry)
    }

    fn protein(&self) -> &str {
        &self.proteins
    }

    fn precursor_mz(&self) -> Option<f64> {
        (self.z > 0).then(|| neutral_to_mz(self.experimental_mass, self.z))
    }

    fn reported_ntt(&self) -> Option<u8> {
        self.semi_enzymatic.map(|semi| if semi { 1 } else { 2 })
    }

    fn scores(&self) -> Vec<ScoreValue> {
        vec![
            self.hyperscore.clone(),
            self.delta_next.clone(),
            self.poisson.clone(),
            self.discriminant_score.clone(),
            self.posterior_error.clone(),
            self.peptide_q.clone().into(),
            self.protein_q.clone().into(),
        ]
    }

    fn significance(&self) -> ScoreValue {
        self.spectrum_q.clone()
    }
}
