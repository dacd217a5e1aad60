use serde::{Deserialize, Serialize};

use crate::{
    common_parser::{FormatVersion, Location, OptionalColumn},
    csv::CsvLine,
    error::{SynopsisError, SynopsisResult},
    helper_functions::scan_from_native_id,
    modification::ModificationRegistry,
    peptide::{NormalizedPeptide, PROTEIN_TERMINUS, has_flanks},
    search_hit::{HitMetadata, ScoreValue},
};

static NUMBER_ERROR: (&str, &str) = (
    "Invalid MS-GF+ line",
    "This column is not a number but it is required to be a number in this MS-GF+ format",
);

format_family!(
    MSGFPlus, [&VERSION_PPM, &VERSION_DA], b'\t', None;
    required {
        spectrum_file: String, |location: Location| Ok(location.get_string());
        spectrum_id: String, |location: Location| Ok(location.get_string());
        /// The scan number, negative if MS-GF+ could not determine it
        scan_number: i64, |location: Location| location.parse::<i64>(NUMBER_ERROR);
        precursor_mz: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        isotope_error: i32, |location: Location| location.parse::<i32>(NUMBER_ERROR);
        z: u8, |location: Location| location.parse::<u8>(NUMBER_ERROR);
        peptide: String, |location: Location| Ok(location.get_string());
        protein: MSGFPlusProtein, |location: Location| Ok(MSGFPlusProtein::new(location.as_str()));
        de_novo_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        msgf_score: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        spec_e_value: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        e_value: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
    }
    optional {
        fragmentation_method: String, |location: Location| Ok(location.get_string());
        precursor_error_ppm: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        precursor_error_da: f64, |location: Location| location.parse::<f64>(NUMBER_ERROR);
        q_value: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
        peptide_q_value: ScoreValue, |location: Location| location.parse_score(NUMBER_ERROR);
    }

    fn post_process(source: &CsvLine, parsed: Self) -> Result<Self, BoxedError<'static, SynopsisError>> {
        if parsed.scan_number < 0 && scan_from_native_id(&parsed.spectrum_id).is_none() {
            return Err(BoxedError::new(
                SynopsisError::MalformedInputLine,
                "Invalid MS-GF+ line",
                "The scan number is not known and could not be read from the spectrum id",
                source.full_context().to_owned(),
            ));
        }
        Ok(parsed)
    }
);

/// The version with the precursor error in ppm, the default output
pub const VERSION_PPM: MSGFPlusFormat = MSGFPlusFormat {
    version: MSGFPlusVersion::PrecursorErrorPpm,
    spectrum_file: "#specfile",
    spectrum_id: "specid",
    scan_number: "scannum",
    precursor_mz: "precursor",
    isotope_error: "isotopeerror",
    z: "charge",
    peptide: "peptide",
    protein: "protein",
    de_novo_score: "denovoscore",
    msgf_score: "msgfscore",
    spec_e_value: "specevalue",
    e_value: "evalue",
    fragmentation_method: OptionalColumn::Optional("fragmethod"),
    precursor_error_ppm: OptionalColumn::Required("precursorerror(ppm)"),
    precursor_error_da: OptionalColumn::NotAvailable,
    q_value: OptionalColumn::Optional("qvalue"),
    peptide_q_value: OptionalColumn::Optional("pepqvalue"),
};

/// The version with the precursor error in Dalton
pub const VERSION_DA: MSGFPlusFormat = MSGFPlusFormat {
    version: MSGFPlusVersion::PrecursorErrorDa,
    spectrum_file: "#specfile",
    spectrum_id: "specid",
    scan_number: "scannum",
    precursor_mz: "precursor",
    isotope_error: "isotopeerror",
    z: "charge",
    peptide: "peptide",
    protein: "protein",
    de_novo_score: "denovoscore",
    msgf_score: "msgfscore",
    spec_e_value: "specevalue",
    e_value: "evalue",
    fragmentation_method: OptionalColumn::Optional("fragmethod"),
    precursor_error_ppm: OptionalColumn::NotAvailable,
    precursor_error_da: OptionalColumn::Required("precursorerror(da)"),
    q_value: OptionalColumn::Optional("qvalue"),
    peptide_q_value: OptionalColumn::Optional("pepqvalue"),
};

/// All possible MS-GF+ versions
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub enum MSGFPlusVersion {
    /// Precursor error reported in ppm
    #[default]
    PrecursorErrorPpm,
    /// Precursor error reported in Dalton
    PrecursorErrorDa,
}

impl std::fmt::Display for MSGFPlusVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl FormatVersion<MSGFPlusFormat> for MSGFPlusVersion {
    fn format(self) -> MSGFPlusFormat {
        match self {
            Self::PrecursorErrorPpm => VERSION_PPM,
            Self::PrecursorErrorDa => VERSION_DA,
        }
    }
    fn name(self) -> &'static str {
        match self {
            Self::PrecursorErrorPpm => "ppm",
            Self::PrecursorErrorDa => "Da",
        }
    }
}

/// The protein column of MS-GF+, the first protein is kept with its flanking residues
/// (`sp|P02769|ALBU_BOVIN(pre=K,post=A)`).
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Hash, Serialize)]
pub struct MSGFPlusProtein {
    /// The protein name
    pub name: String,
    /// The residue before the peptide
    pub pre: Option<char>,
    /// The residue after the peptide
    pub post: Option<char>,
}

impl MSGFPlusProtein {
    fn new(text: &str) -> Self {
        let first = text.split(';').next().unwrap_or_default().trim();
        let Some((name, flanks)) = first
            .strip_suffix(')')
            .and_then(|t| t.rsplit_once("(pre="))
        else {
            return Self {
                name: first.to_string(),
                pre: None,
                post: None,
            };
        };
        let (pre, post) = flanks.split_once(",post=").unwrap_or((flanks, ""));
        Self {
            name: name.to_string(),
            pre: pre.chars().next(),
            post: post.chars().next(),
        }
    }
}

impl HitMetadata for MSGFPlusHit {
    fn scan(&self) -> u32 {
        u32::try_from(self.scan_number)
            .ok()
            .or_else(|| scan_from_native_id(&self.spectrum_id))
            .unwrap_or_default()
    }

    fn charge(&self) -> u8 {
        self.z
    }

    fn peptide(
        &self,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(NormalizedPeptide, Vec<BoxedError<'static, SynopsisError>>)> {
        if has_flanks(&self.peptide) {
            NormalizedPeptide::parse_inline(&self.peptide, &['_'], registry)
        } else {
            let annotation = format!(
                "{}.{}.{}",
                self.protein.pre.unwrap_or(PROTEIN_TERMINUS),
                self.peptide,
                self.protein.post.unwrap_or(PROTEIN_TERMINUS)
            );
            NormalizedPeptide::parse_inline(&annotation, &['_'], registry)
        }
    }

    fn protein(&self) -> &str {
        &self.protein.name
    }

    fn precursor_mz(&self) -> Option<f64> {
        Some(self.precursor_mz)
    }

    fn reported_ntt(&self) -> Option<u8> {
        None
    }

    fn scores(&self) -> Vec<ScoreValue> {
        vec![
            self.de_novo_score.clone(),
            self.msgf_score.clone(),
            self.spec_e_value.clone(),
            self.q_value.clone().into(),
            self.peptide_q_value.clone().into(),
        ]
    }

    fn significance(&self) -> ScoreValue {
        self.e_value.clone()
    }
}
