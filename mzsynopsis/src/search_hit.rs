use context_error::BoxedError;
use serde::{Deserialize, Serialize};

use crate::{
    error::{SynopsisError, SynopsisResult},
    formats::{InspectHit, MODaHit, MSFraggerHit, MSGFPlusHit, SageHit},
    modification::ModificationRegistry,
    peptide::NormalizedPeptide,
    search_tool::SearchTool,
};

/// A score as found in the result file, the original text is kept so it can be written unchanged.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoreValue {
    /// The numeric value, NaN if the score is not available
    pub value: f64,
    /// The original text
    pub raw: String,
}

impl Default for ScoreValue {
    fn default() -> Self {
        Self::missing()
    }
}

impl ScoreValue {
    /// Create a score from a value that was calculated instead of read
    pub fn new(value: f64) -> Self {
        Self {
            value,
            raw: value.to_string(),
        }
    }

    /// A score that is not available
    pub const fn missing() -> Self {
        Self {
            value: f64::NAN,
            raw: String::new(),
        }
    }

    /// Check if this score is not available
    pub const fn is_missing(&self) -> bool {
        self.value.is_nan()
    }
}

impl From<Option<ScoreValue>> for ScoreValue {
    fn from(value: Option<ScoreValue>) -> Self {
        value.unwrap_or_default()
    }
}

/// The information every search tool record has to provide to be normalised
pub trait HitMetadata {
    /// The scan number
    fn scan(&self) -> u32;

    /// The precursor charge
    fn charge(&self) -> u8;

    /// Normalise the peptide annotation, resolving all modifications
    /// # Errors
    /// If the annotation is invalid. Unresolved modifications are returned next to the peptide.
    fn peptide(
        &self,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(NormalizedPeptide, Vec<BoxedError<'static, SynopsisError>>)>;

    /// The protein name
    fn protein(&self) -> &str;

    /// The observed precursor m/z
    fn precursor_mz(&self) -> Option<f64>;

    /// The number of tryptic termini if reported by the tool
    fn reported_ntt(&self) -> Option<u8>;

    /// The scores in the order of [`SearchTool::score_columns`]
    fn scores(&self) -> Vec<ScoreValue>;

    /// The significance score, see [`SearchTool::significance_column`]
    fn significance(&self) -> ScoreValue;
}

/// The original record from any of the supported search tools
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[allow(clippy::large_enum_variant)]
pub enum SearchHitData {
    /// Inspect
    Inspect(InspectHit),
    /// MODa
    MODa(MODaHit),
    /// MS-GF+
    MSGFPlus(MSGFPlusHit),
    /// Sage
    Sage(SageHit),
    /// MSFragger
    MSFragger(MSFraggerHit),
}

impl SearchHitData {
    /// The tool that generated this record
    pub const fn tool(&self) -> SearchTool {
        match self {
            Self::Inspect(_) => SearchTool::Inspect,
            Self::MODa(_) => SearchTool::MODa,
            Self::MSGFPlus(_) => SearchTool::MSGFPlus,
            Self::Sage(_) => SearchTool::Sage,
            Self::MSFragger(_) => SearchTool::MSFragger,
        }
    }

    /// The 0 based line index in the source file
    pub const fn line_index(&self) -> usize {
        match self {
            Self::Inspect(d) => d.line_index,
            Self::MODa(d) => d.line_index,
            Self::MSGFPlus(d) => d.line_index,
            Self::Sage(d) => d.line_index,
            Self::MSFragger(d) => d.line_index,
        }
    }

    fn inner(&self) -> &dyn HitMetadata {
        match self {
            Self::Inspect(d) => d,
            Self::MODa(d) => d,
            Self::MSGFPlus(d) => d,
            Self::Sage(d) => d,
            Self::MSFragger(d) => d,
        }
    }
}

impl HitMetadata for SearchHitData {
    fn scan(&self) -> u32 {
        self.inner().scan()
    }
    fn charge(&self) -> u8 {
        self.inner().charge()
    }
    fn peptide(
        &self,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(NormalizedPeptide, Vec<BoxedError<'static, SynopsisError>>)> {
        self.inner().peptide(registry)
    }
    fn protein(&self) -> &str {
        self.inner().protein()
    }
    fn precursor_mz(&self) -> Option<f64> {
        self.inner().precursor_mz()
    }
    fn reported_ntt(&self) -> Option<u8> {
        self.inner().reported_ntt()
    }
    fn scores(&self) -> Vec<ScoreValue> {
        self.inner().scores()
    }
    fn significance(&self) -> ScoreValue {
        self.inner().significance()
    }
}

macro_rules! impl_from_data {
    ($($variant:ident: $hit:ty),*) => {$(
        impl From<$hit> for SearchHitData {
            fn from(value: $hit) -> Self {
                Self::$variant(value)
            }
        }
    )*};
}

impl_from_data!(Inspect: InspectHit, MODa: MODaHit, MSGFPlus: MSGFPlusHit, Sage: SageHit, MSFragger: MSFraggerHit);

/// A read record with the peptide normalised and the sort scores determined, ready to be ranked
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SearchHit {
    /// The scan number
    pub scan: u32,
    /// The precursor charge
    pub charge: u8,
    /// The normalised peptide
    pub peptide: NormalizedPeptide,
    /// The canonical representation of [`Self::peptide`]
    pub canonical_peptide: String,
    /// The protein name
    pub protein: String,
    /// The observed precursor m/z
    pub precursor_mz: Option<f64>,
    /// The theoretical neutral mass
    pub theoretical_mass: f64,
    /// The number of tryptic termini
    pub ntt: u8,
    /// The tool specific score columns
    pub scores: Vec<ScoreValue>,
    /// The significance score
    pub significance: ScoreValue,
    /// The primary sort score, missing scores are set to the worst possible value
    pub primary: f64,
    /// The secondary sort score, missing scores are set to the worst possible value
    pub secondary: f64,
    /// The score used for the normalised delta score
    pub delta_score: f64,
    /// The original record
    pub data: SearchHitData,
}

impl SearchHit {
    /// Normalise a record
    /// # Errors
    /// If the peptide is invalid. Unresolved modifications are returned next to the hit.
    pub fn new(
        data: SearchHitData,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(Self, Vec<BoxedError<'static, SynopsisError>>)> {
        let tool = data.tool();
        let (peptide, errors) = data.peptide(registry)?;
        let scheme = tool.ranking();
        let scores = data.scores();
        let significance = data.significance();
        let lookup = |column: &str| {
            if column == tool.significance_column() {
                significance.value
            } else {
                tool.score_columns()
                    .iter()
                    .position(|c| *c == column)
                    .and_then(|i| scores.get(i))
                    .map_or(f64::NAN, |s| s.value)
            }
        };
        let primary = scheme.primary_direction.or_worst(lookup(scheme.primary));
        let secondary = scheme
            .secondary_direction
            .or_worst(lookup(scheme.secondary));
        let delta_score = lookup(scheme.delta);
        let theoretical_mass = peptide.theoretical_mass(registry);
        Ok((
            Self {
                scan: data.scan(),
                charge: data.charge(),
                canonical_peptide: peptide.to_string(),
                ntt: data
                    .reported_ntt()
                    .unwrap_or_else(|| peptide.tryptic_termini()),
                peptide,
                protein: data.protein().to_string(),
                precursor_mz: data.precursor_mz(),
                theoretical_mass,
                scores,
                significance,
                primary,
                secondary,
                delta_score: if delta_score.is_finite() {
                    delta_score
                } else {
                    0.0
                },
                data,
            },
            errors,
        ))
    }

    /// The tool that generated this hit
    pub const fn tool(&self) -> SearchTool {
        self.data.tool()
    }

    /// Get a score by its column name, NaN if missing
    pub fn score(&self, column: &str) -> f64 {
        let tool = self.tool();
        if column.eq_ignore_ascii_case(tool.significance_column()) {
            self.significance.value
        } else {
            tool.score_columns()
                .iter()
                .position(|c| c.eq_ignore_ascii_case(column))
                .and_then(|i| self.scores.get(i))
                .map_or(f64::NAN, |s| s.value)
        }
    }
}
