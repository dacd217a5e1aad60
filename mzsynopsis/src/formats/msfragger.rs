use serde::{Deserialize, Serialize};

use crate::{
    common_parser::{FormatVersion, Location, OptionalColumn},
    csv::CsvLine,
    error::{SynopsisError, SynopsisResult},
    mass::neutral_to_mz,
    modification::ModificationRegistry,
    peptide::{NormalizedPeptide, PROTEIN_TERMINUS},
    search_hit::{HitMetadata, ScoreValue},
};

static NUMBER_ERROR: (&str, &str) = (
    "Invalid MSFragger line",
    "This column is not a number but it is required to be a number in this MSFragger format",
);

format_family!(
    MSFragger, [&VERSION_PSM, &VERSION_NATIVE], b'\t', None;
    required {
        peptide: String, |location: Location| Ok(location.get_string());
        /// The residue before the peptide, `-` for the protein N terminus
        prev_aa: char, |location: Location| Ok(location.as_str().trim().chars().next().unwrap_or(PROTEIN_TERMINUS));
        /// The residue after the peptide, `-` for the protein C terminus
        next_aa: char, |location: Location| Ok(location.as_str().trim().chars().next().unwrap_or(PROTEIN_TERMINUS));
        z: u8, |location: Location| location.parse::<u8>(NUMBER_ERROR);
        expectation: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        hyperscore: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        next_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        /// All modifications (`5M(15.9949), N-term(42.0106)`)
        modifications: String, |location: Location| Ok(location.get_string());
        protein: String, |location: Location| Ok(location.get_string());
    }
    optional {
        /// The scan number from the spectrum title (`file.00010.00010.2`)
        spectrum: u32, |location: Location| spectrum_title_scan(location.as_str()).ok_or_else(|| location.error(
            "Invalid MSFragger line",
            "The scan number could not be read from the spectrum title, expected the format 'file.10.10.2'",
        ));
        scan_number: u32, |location: Location| location.parse::<u32>(NUMBER_ERROR);
        observed_mz: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        precursor_neutral_mass: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        probability: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        ntt: u8, |location: Location| location.parse::<u8>(NUMBER_ERROR);
    }

    fn post_process(source: &CsvLine, parsed: Self) -> Result<Self, BoxedError<'static, SynopsisError>> {
        if parsed.spectrum.is_none() && parsed.scan_number.is_none() {
            return Err(BoxedError::new(
                SynopsisError::MalformedInputLine,
                "Invalid MSFragger line",
                "No scan number is given",
                source.full_context().to_owned(),
            ));
        }
        Ok(parsed)
    }
);

/// Get the start scan from a spectrum title (`file.00010.00010.2`), a plain number is also accepted.
fn spectrum_title_scan(title: &str) -> Option<u32> {
    let title = title.trim();
    title.parse().ok().or_else(|| {
        // Charge and end scan come last
        title.rsplitn(4, '.').nth(2)?.parse().ok()
    })
}

/// The FragPipe `psm.tsv` format
pub const VERSION_PSM: MSFraggerFormat = MSFraggerFormat {
    version: MSFraggerVersion::Psm,
    peptide: "peptide",
    prev_aa: "prev aa",
    next_aa: "next aa",
    z: "charge",
    expectation: "expectation",
    hyperscore: "hyperscore",
    next_score: "nextscore",
    modifications: "assigned modifications",
    protein: "protein",
    spectrum: OptionalColumn::Required("spectrum"),
    scan_number: OptionalColumn::NotAvailable,
    observed_mz: OptionalColumn::Optional("observed m/z"),
    precursor_neutral_mass: OptionalColumn::NotAvailable,
    probability: OptionalColumn::Optional("peptideprophet probability"),
    ntt: OptionalColumn::Optional("number of enzymatic termini"),
};

/// The native MSFragger tsv format
pub const VERSION_NATIVE: MSFraggerFormat = MSFraggerFormat {
    version: MSFraggerVersion::Native,
    peptide: "peptide",
    prev_aa: "peptide_prev_aa",
    next_aa: "peptide_next_aa",
    z: "charge",
    expectation: "expectscore",
    hyperscore: "hyperscore",
    next_score: "nextscore",
    modifications: "modification_info",
    protein: "proteins",
    spectrum: OptionalColumn::NotAvailable,
    scan_number: OptionalColumn::Required("scannum"),
    observed_mz: OptionalColumn::NotAvailable,
    precursor_neutral_mass: OptionalColumn::Optional("precursor_neutral_mass"),
    probability: OptionalColumn::NotAvailable,
    ntt: OptionalColumn::Optional("num_tol_term"),
};

/// All possible MSFragger versions
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum MSFraggerVersion {
    /// FragPipe psm.tsv
    #[default]
    Psm,
    /// MSFragger native tsv output
    Native,
}

impl std::fmt::Display for MSFraggerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl FormatVersion<MSFraggerFormat> for MSFraggerVersion {
    fn format(self) -> MSFraggerFormat {
        match self {
            Self::Psm => VERSION_PSM,
            Self::Native => VERSION_NATIVE,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Self::Psm => "psm.tsv",
            Self::Native => "native",
        }
    }
}

impl HitMetadata for MSFraggerHit {
    fn scan(&self) -> u32 {
        self.spectrum.or(self.scan_number).unwrap_or_default()
    }

    fn charge(&self) -> u8 {
        self.z
    }

    fn peptide(
        &self,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(NormalizedPeptide, Vec<BoxedError<'static, SynopsisError>>)> {
        NormalizedPeptide::parse_with_modification_list(
            &self.peptide,
            self.prev_aa,
            self.next_aa,
            &self.modifications,
            registry,
        )
    }

    fn protein(&self) -> &str {
        &self.protein
    }

    fn precursor_mz(&self) -> Option<f64> {
        self.observed_mz.or_else(|| {
            self.precursor_neutral_mass
                .filter(|_| self.z > 0)
                .map(|mass| neutral_to_mz(mass, self.z))
        })
    }

    fn reported_ntt(&self) -> Option<u8> {
        self.ntt
    }

    fn scores(&self) -> Vec<ScoreValue> {
        vec![
            self.hyperscore.clone(),
            self.next_score.clone(),
            self.probability.clone().into(),
        ]
    }

    fn significance(&self) -> ScoreValue {
        self.expectation.clone()
    }
}

#[test]
#[allow(clippy::missing_panics_doc)]
fn spectrum_titles() {
    assert_eq!(spectrum_title_scan("run_01.00010.00012.2"), Some(10));
    assert_eq!(spectrum_title_scan("run.with.dots.04021.04021.3"), Some(4021));
    assert_eq!(spectrum_title_scan("42"), Some(42));
    assert_eq!(spectrum_title_scan("run"), None);
}
