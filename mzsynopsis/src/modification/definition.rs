use std::fmt::Display;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thin_vec::ThinVec;

/// The symbol used for modifications that could not be resolved
pub const UNKNOWN_MODIFICATION_SYMBOL: char = '?';

/// The symbol used in definition files for static modifications, these are never shown in a peptide
pub const STATIC_MODIFICATION_SYMBOL: char = '-';

/// The terminus a modification is restricted to (or at least can be placed at)
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum TerminusConstraint {
    /// Not a terminal modification
    #[default]
    None,
    /// The N terminus of the peptide, written `<` in a definitions file
    PeptideNTerm,
    /// The C terminus of the peptide, written `>` in a definitions file
    PeptideCTerm,
    /// The N terminus of the protein, written `[` in a definitions file
    ProteinNTerm,
    /// The C terminus of the protein, written `]` in a definitions file
    ProteinCTerm,
}

impl TerminusConstraint {
    /// Check if this constraint is fulfilled at the given position
    pub const fn allows(self, state: TerminusState) -> bool {
        match self {
            Self::None => true,
            Self::PeptideNTerm => matches!(
                state,
                TerminusState::PeptideNTerm | TerminusState::ProteinNTerm
            ),
            Self::PeptideCTerm => matches!(
                state,
                TerminusState::PeptideCTerm | TerminusState::ProteinCTerm
            ),
            Self::ProteinNTerm => matches!(state, TerminusState::ProteinNTerm),
            Self::ProteinCTerm => matches!(state, TerminusState::ProteinCTerm),
        }
    }

    /// If this is an N terminal constraint
    pub const fn is_n_term(self) -> bool {
        matches!(self, Self::PeptideNTerm | Self::ProteinNTerm)
    }

    /// If this is a C terminal constraint
    pub const fn is_c_term(self) -> bool {
        matches!(self, Self::PeptideCTerm | Self::ProteinCTerm)
    }
}

/// The position of a modification token within the peptide
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum TerminusState {
    /// Somewhere in the middle of the peptide
    #[default]
    None,
    /// At the N terminus of the peptide (first residue or before it)
    PeptideNTerm,
    /// At the C terminus of the peptide (last residue or after it)
    PeptideCTerm,
    /// At the N terminus of a peptide that is also the N terminus of the protein
    ProteinNTerm,
    /// At the C terminus of a peptide that is also the C terminus of the protein
    ProteinCTerm,
}

/// How a modification is applied
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum ModificationKind {
    /// A variable modification, shown with its symbol in the peptide, `D`
    #[default]
    Dynamic,
    /// A fixed modification on every occurrence of the residues, `S`
    StaticResidue,
    /// A fixed modification on every peptide terminus, `T`
    StaticPeptideTerminus,
    /// A fixed modification on every protein terminus, `P`
    StaticProteinTerminus,
}

impl ModificationKind {
    /// Fixed modifications are applied regardless of what the search tool annotated
    pub const fn is_static(self) -> bool {
        !matches!(self, Self::Dynamic)
    }

    /// Get the one letter code as used in definition files
    pub const fn code(self) -> char {
        match self {
            Self::Dynamic => 'D',
            Self::StaticResidue => 'S',
            Self::StaticPeptideTerminus => 'T',
            Self::StaticProteinTerminus => 'P',
        }
    }

    /// Parse the one letter code as used in definition files
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "D" | "DYN" | "DYNAMIC" => Some(Self::Dynamic),
            "S" | "STATIC" => Some(Self::StaticResidue),
            "T" => Some(Self::StaticPeptideTerminus),
            "P" => Some(Self::StaticProteinTerminus),
            _ => None,
        }
    }
}

/// The residues a modification can be placed on
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TargetResidues {
    /// Any residue, or only the terminus if a terminus constraint is set
    #[default]
    Any,
    /// Only these residues
    Residues(ThinVec<char>),
}

impl TargetResidues {
    /// Check if this residue could carry the modification
    pub fn contains(&self, residue: char) -> bool {
        match self {
            Self::Any => true,
            Self::Residues(list) => list.contains(&residue.to_ascii_uppercase()),
        }
    }

    /// Check if the residue is listed explicitly
    pub fn lists(&self, residue: char) -> bool {
        match self {
            Self::Any => false,
            Self::Residues(list) => list.contains(&residue.to_ascii_uppercase()),
        }
    }
}

impl Display for TargetResidues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Residues(list) => {
                for r in list {
                    write!(f, "{r}")?;
                }
                Ok(())
            }
        }
    }
}

/// A modification that can be recognised in search results
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ModificationDefinition {
    /// The symbol shown in the canonical peptide
    pub symbol: char,
    /// The monoisotopic mass difference in Dalton
    pub mass: OrderedFloat<f64>,
    /// The residues this modification applies to
    pub residues: TargetResidues,
    /// Dynamic or one of the static kinds
    pub kind: ModificationKind,
    /// The terminus this modification is placed at
    pub terminus: TerminusConstraint,
    /// A human readable name, `Unnamed<+mass>` for masses only seen in the results
    pub name: String,
}

impl ModificationDefinition {
    /// Create a new dynamic definition
    pub fn dynamic(
        symbol: char,
        mass: f64,
        residues: TargetResidues,
        terminus: TerminusConstraint,
        name: impl Into<String>,
    ) -> Self {
        Self {
            symbol,
            mass: OrderedFloat(mass),
            residues,
            kind: ModificationKind::Dynamic,
            terminus,
            name: name.into(),
        }
    }

    /// The sentinel used when a modification cannot be resolved
    pub fn unknown() -> Self {
        Self::dynamic(
            UNKNOWN_MODIFICATION_SYMBOL,
            0.0,
            TargetResidues::Any,
            TerminusConstraint::None,
            "Unknown",
        )
    }

    /// The name given to modifications that were only seen as a mass in the results
    pub fn unnamed_name(mass: f64) -> String {
        format!("Unnamed{mass:+.4}")
    }

    /// The mass in Dalton
    pub const fn mass(&self) -> f64 {
        self.mass.0
    }

    /// Check if this is the sentinel for an unresolved modification
    pub fn is_unknown(&self) -> bool {
        self.symbol == UNKNOWN_MODIFICATION_SYMBOL
    }
}

impl Display for ModificationDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let terminus = match self.terminus {
            TerminusConstraint::None => "",
            TerminusConstraint::PeptideNTerm => "<",
            TerminusConstraint::PeptideCTerm => ">",
            TerminusConstraint::ProteinNTerm => "[",
            TerminusConstraint::ProteinCTerm => "]",
        };
        let residues = if terminus.is_empty() || self.residues != TargetResidues::Any {
            self.residues.to_string()
        } else {
            String::new()
        };
        write!(
            f,
            "{}\t{:.5}\t{terminus}{residues}\t{}\t{}",
            self.symbol,
            self.mass.0,
            self.kind.code(),
            self.name
        )
    }
}
