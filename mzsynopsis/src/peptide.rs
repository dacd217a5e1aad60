//! The canonical peptide representation and the annotation grammars of the search tools

use std::{fmt::Display, sync::LazyLock};

use context_error::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{SynopsisError, SynopsisResult},
    helper_functions::{leading_signed_number, split_with_brackets},
    mass::{WATER, residue_mass},
    modification::{
        ModificationDefinition, ModificationRegistry, ModificationToken, TargetResidues,
        TerminusConstraint, TerminusState,
    },
};

/// The flanking residue used for protein termini
pub const PROTEIN_TERMINUS: char = '-';

/// A position on a sequence
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub enum SequencePosition {
    /// N-terminal
    NTerm,
    /// An amino acid at the given index
    Index(usize),
    /// C-terminal
    CTerm,
}

impl Default for SequencePosition {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl Display for SequencePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NTerm => write!(f, "N-terminal"),
            Self::Index(index) => write!(f, "{index}"),
            Self::CTerm => write!(f, "C-terminal"),
        }
    }
}

/// A peptide with its flanking residues and all dynamic modifications resolved to definitions.
/// Static modifications are never stored, they are implied by the registry.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedPeptide {
    /// The residue before the peptide, [`PROTEIN_TERMINUS`] at the protein N terminus
    pub prefix: char,
    /// The residues in uppercase one letter codes
    pub sequence: String,
    /// The residue after the peptide, [`PROTEIN_TERMINUS`] at the protein C terminus
    pub suffix: char,
    /// The dynamic modifications ordered by position
    pub modifications: Vec<(SequencePosition, ModificationDefinition)>,
}

impl NormalizedPeptide {
    /// The number of residues
    pub fn len(&self) -> usize {
        self.sequence.chars().count()
    }

    /// Check if there are no residues
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// If the peptide starts at the protein N terminus
    pub fn is_protein_n_term(&self) -> bool {
        self.prefix == PROTEIN_TERMINUS
    }

    /// If the peptide ends at the protein C terminus
    pub fn is_protein_c_term(&self) -> bool {
        self.suffix == PROTEIN_TERMINUS
    }

    /// The monoisotopic neutral mass including all static and dynamic modifications
    pub fn theoretical_mass(&self, registry: &ModificationRegistry) -> f64 {
        self.sequence
            .chars()
            .map(|r| residue_mass(r).unwrap_or_default() + registry.static_residue_mass(r))
            .sum::<f64>()
            + WATER
            + registry.static_terminal_mass(self.is_protein_n_term(), self.is_protein_c_term())
            + self
                .modifications
                .iter()
                .map(|(_, m)| m.mass())
                .sum::<f64>()
    }

    /// The number of tryptic termini (0, 1, or 2). The protein termini count as tryptic.
    pub fn tryptic_termini(&self) -> u8 {
        let first = self.sequence.chars().next();
        let last = self.sequence.chars().last();
        let n_term = self.is_protein_n_term()
            || (matches!(self.prefix, 'K' | 'R') && first != Some('P'));
        let c_term = self.is_protein_c_term()
            || (last.is_some_and(|l| matches!(l, 'K' | 'R')) && self.suffix != 'P');
        u8::from(n_term) + u8::from(c_term)
    }

    fn place(
        &mut self,
        tokens: Vec<(RawToken, SequencePosition)>,
        registry: &mut ModificationRegistry,
        annotation: &str,
    ) -> Vec<BoxedError<'static, SynopsisError>> {
        let residues: Vec<char> = self.sequence.chars().collect();
        let mut errors = Vec::new();
        for (token, anchor) in tokens {
            let residue = match anchor {
                SequencePosition::Index(i) => residues.get(i).copied(),
                _ => None,
            };
            let state = self.terminus_state(anchor, residues.len());
            let (definition, error) =
                registry.resolve_or_register(token.as_token(), residue, state);
            if error.is_some() {
                errors.push(BoxedError::new(
                    SynopsisError::UnresolvedModification,
                    "Unresolved modification",
                    format!(
                        "No modification definition matches {} in peptide '{annotation}', it is written as '{}'",
                        token.as_token(),
                        definition.symbol
                    ),
                    Context::show(annotation.to_string()),
                ));
            }
            if definition.kind.is_static() {
                continue;
            }
            let position = placement(&definition, anchor, residue);
            self.modifications.push((position, definition));
        }
        self.modifications.sort_by_key(|(p, _)| *p);
        errors
    }

    fn terminus_state(&self, anchor: SequencePosition, length: usize) -> TerminusState {
        let n_term = if self.is_protein_n_term() {
            TerminusState::ProteinNTerm
        } else {
            TerminusState::PeptideNTerm
        };
        let c_term = if self.is_protein_c_term() {
            TerminusState::ProteinCTerm
        } else {
            TerminusState::PeptideCTerm
        };
        match anchor {
            SequencePosition::NTerm | SequencePosition::Index(0) => n_term,
            SequencePosition::CTerm => c_term,
            SequencePosition::Index(i) if i + 1 == length => c_term,
            SequencePosition::Index(_) => TerminusState::None,
        }
    }

    /// Parse an annotation with inline modifications (`K.M+15.995PEPTIDE.R`). Modifications are
    /// signed masses, lowercase names, or symbols following the residue they modify, a
    /// modification before the first residue is N terminal. The given terminus markers are used by
    /// the tool as flanking residue at the protein termini.
    /// # Errors
    /// If the annotation has no residues. Unresolved modifications are returned next to the peptide.
    pub fn parse_inline(
        annotation: &str,
        terminus_markers: &[char],
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(Self, Vec<BoxedError<'static, SynopsisError>>)> {
        let (prefix, core, suffix) = split_flanks(annotation.trim(), terminus_markers);
        let mut peptide = Self {
            prefix,
            suffix,
            ..Self::default()
        };
        let mut tokens = Vec::new();
        let mut index = 0;
        while index < core.len() {
            let rest = &core[index..];
            let Some(c) = rest.chars().next() else {
                break;
            };
            let anchor = peptide.last_anchor();
            if c.is_ascii_uppercase() {
                peptide.sequence.push(c);
                index += 1;
            } else if let Some((mass, length)) = (c == '+' || c == '-')
                .then(|| leading_signed_number(rest))
                .flatten()
            {
                tokens.push((RawToken::Mass(mass), anchor));
                index += length;
            } else if c.is_ascii_lowercase() {
                let length = rest
                    .find(|c: char| !c.is_ascii_lowercase())
                    .unwrap_or(rest.len());
                tokens.push((RawToken::Name(rest[..length].to_string()), anchor));
                index += length;
            } else if c.is_whitespace() {
                index += c.len_utf8();
            } else {
                tokens.push((RawToken::Symbol(c), anchor));
                index += c.len_utf8();
            }
        }
        peptide.finish(tokens, registry, annotation)
    }

    /// Parse an annotation with modifications in square brackets (`[+42.0106]-PEPM[+15.9949]K`),
    /// without flanking residues. A bracket before the first residue is N terminal, a bracket after
    /// a trailing `-` is C terminal. The content is a signed mass or a modification name.
    /// # Errors
    /// If a bracket is not closed or the annotation has no residues.
    pub fn parse_bracketed(
        annotation: &str,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(Self, Vec<BoxedError<'static, SynopsisError>>)> {
        let core = annotation.trim();
        let mut peptide = Self {
            prefix: PROTEIN_TERMINUS,
            suffix: PROTEIN_TERMINUS,
            ..Self::default()
        };
        let mut tokens = Vec::new();
        let mut c_term_next = false;
        let mut index = 0;
        while index < core.len() {
            let rest = &core[index..];
            let Some(c) = rest.chars().next() else {
                break;
            };
            match c {
                '[' => {
                    let Some(end) = rest.find(']') else {
                        return Err(BoxedError::new(
                            SynopsisError::MalformedInputLine,
                            "Invalid peptide",
                            "A modification bracket is not closed",
                            Context::line(None, core, index, rest.len()).to_owned(),
                        ));
                    };
                    let content = rest[1..end].trim();
                    let anchor = if c_term_next {
                        SequencePosition::CTerm
                    } else {
                        peptide.last_anchor()
                    };
                    let token = content.parse::<f64>().map_or_else(
                        |_| RawToken::Name(content.to_string()),
                        RawToken::Mass,
                    );
                    tokens.push((token, anchor));
                    index += end + 1;
                }
                '-' => {
                    c_term_next = !peptide.sequence.is_empty();
                    index += 1;
                }
                c if c.is_ascii_alphabetic() => {
                    peptide.sequence.push(c.to_ascii_uppercase());
                    index += 1;
                }
                c => index += c.len_utf8(),
            }
        }
        peptide.finish(tokens, registry, annotation)
    }

    /// Parse a plain sequence with the modifications given as a separate list in the form
    /// `5M(15.9949), N-term(42.0106), C-term(-0.9840)`. Positions are 1 based, the residue may
    /// also be written before the position (`M5(15.9949)`), and `n`/`c` are accepted for the termini.
    /// # Errors
    /// If a modification entry cannot be read or its position is outside of the peptide.
    pub fn parse_with_modification_list(
        sequence: &str,
        prefix: char,
        suffix: char,
        modifications: &str,
        registry: &mut ModificationRegistry,
    ) -> SynopsisResult<(Self, Vec<BoxedError<'static, SynopsisError>>)> {
        static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(?:(N-term|n)|(C-term|c)|(\d+)([A-Za-z])|([A-Za-z])(\d+))\(([-+]?\d*\.?\d+(?:[eE][-+]?\d+)?)\)$").unwrap()
        });
        let mut peptide = Self {
            prefix,
            suffix,
            sequence: sequence
                .trim()
                .chars()
                .filter(char::is_ascii_alphabetic)
                .map(|c| c.to_ascii_uppercase())
                .collect(),
            modifications: Vec::new(),
        };
        let length = peptide.len();
        let mut tokens = Vec::new();
        for range in split_with_brackets(modifications, 0..modifications.len(), b',', b'(', b')')
            .into_iter()
            .flat_map(|r| {
                split_with_brackets(modifications, r, b';', b'(', b')')
            })
        {
            let entry = modifications[range.clone()].trim();
            if entry.is_empty() {
                continue;
            }
            let error = || {
                BoxedError::new(
                    SynopsisError::MalformedInputLine,
                    "Invalid modification",
                    "A modification should be written as position and residue followed by the mass in brackets, like '5M(15.9949)' or 'N-term(42.0106)'",
                    Context::line(None, modifications, range.start, range.len()).to_owned(),
                )
            };
            let captures = ENTRY.captures(entry).ok_or_else(error)?;
            let mass = captures[7].parse::<f64>().map_err(|_| error())?;
            let anchor = if captures.get(1).is_some() {
                SequencePosition::NTerm
            } else if captures.get(2).is_some() {
                SequencePosition::CTerm
            } else {
                let position = captures
                    .get(3)
                    .or_else(|| captures.get(6))
                    .and_then(|p| p.as_str().parse::<usize>().ok())
                    .filter(|p| (1..=length).contains(p))
                    .ok_or_else(error)?;
                SequencePosition::Index(position - 1)
            };
            tokens.push((RawToken::Mass(mass), anchor));
        }
        peptide.finish(tokens, registry, sequence)
    }

    fn last_anchor(&self) -> SequencePosition {
        if self.sequence.is_empty() {
            SequencePosition::NTerm
        } else {
            SequencePosition::Index(self.sequence.len() - 1)
        }
    }

    fn finish(
        mut self,
        tokens: Vec<(RawToken, SequencePosition)>,
        registry: &mut ModificationRegistry,
        annotation: &str,
    ) -> SynopsisResult<(Self, Vec<BoxedError<'static, SynopsisError>>)> {
        if self.sequence.is_empty() {
            return Err(BoxedError::new(
                SynopsisError::MalformedInputLine,
                "Invalid peptide",
                "The peptide does not contain any residues",
                Context::show(annotation.to_string()),
            ));
        }
        let errors = self.place(tokens, registry, annotation);
        Ok((self, errors))
    }
}

impl Display for NormalizedPeptide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbols = |position: SequencePosition| {
            self.modifications
                .iter()
                .filter(move |(p, _)| *p == position)
                .map(|(_, m)| m.symbol)
        };
        write!(f, "{}.", self.prefix)?;
        for symbol in symbols(SequencePosition::NTerm) {
            write!(f, "{symbol}")?;
        }
        for (index, residue) in self.sequence.chars().enumerate() {
            write!(f, "{residue}")?;
            for symbol in symbols(SequencePosition::Index(index)) {
                write!(f, "{symbol}")?;
            }
        }
        for symbol in symbols(SequencePosition::CTerm) {
            write!(f, "{symbol}")?;
        }
        write!(f, ".{}", self.suffix)
    }
}

/// A modification as read from an annotation, before it is resolved
#[derive(Clone, Debug, PartialEq)]
enum RawToken {
    Symbol(char),
    Name(String),
    Mass(f64),
}

impl RawToken {
    fn as_token(&self) -> ModificationToken<'_> {
        match self {
            Self::Symbol(c) => ModificationToken::Symbol(*c),
            Self::Name(n) => ModificationToken::Name(n),
            Self::Mass(m) => ModificationToken::Mass(*m),
        }
    }
}

/// Where a resolved modification ends up, terminal definitions that do not target the residue
/// they were reported on move to their terminus.
fn placement(
    definition: &ModificationDefinition,
    anchor: SequencePosition,
    residue: Option<char>,
) -> SequencePosition {
    match anchor {
        SequencePosition::NTerm if definition.terminus.is_c_term() => SequencePosition::CTerm,
        SequencePosition::CTerm if definition.terminus.is_n_term() => SequencePosition::NTerm,
        SequencePosition::NTerm | SequencePosition::CTerm => anchor,
        SequencePosition::Index(_) => {
            let on_residue = definition.is_unknown()
                || residue.is_some_and(|r| definition.residues.lists(r))
                || (definition.residues == TargetResidues::Any
                    && definition.terminus == TerminusConstraint::None);
            if on_residue {
                anchor
            } else if definition.terminus.is_n_term() {
                SequencePosition::NTerm
            } else if definition.terminus.is_c_term() {
                SequencePosition::CTerm
            } else {
                anchor
            }
        }
    }
}

/// Split `K.PEPTIDE.R` in prefix, peptide, and suffix. Without flanking residues both are
/// [`PROTEIN_TERMINUS`]. Flanks that are one of the terminus markers become [`PROTEIN_TERMINUS`].
pub(crate) fn split_flanks<'a>(
    annotation: &'a str,
    terminus_markers: &[char],
) -> (char, &'a str, char) {
    let chars: Vec<(usize, char)> = annotation.char_indices().collect();
    let flank = |c: char| {
        if c == PROTEIN_TERMINUS || terminus_markers.contains(&c) {
            PROTEIN_TERMINUS
        } else {
            c.to_ascii_uppercase()
        }
    };
    if has_flanks(annotation) {
        let start = chars[2].0;
        let end = chars[chars.len() - 2].0;
        (
            flank(chars[0].1),
            &annotation[start..end],
            flank(chars[chars.len() - 1].1),
        )
    } else {
        (PROTEIN_TERMINUS, annotation, PROTEIN_TERMINUS)
    }
}

/// Check if the annotation is written with flanking residues (`K.PEPTIDE.R`)
pub(crate) fn has_flanks(annotation: &str) -> bool {
    let chars: Vec<char> = annotation.chars().collect();
    chars.len() >= 5 && chars[1] == '.' && chars[chars.len() - 2] == '.'
}

/// Remove all modification symbols and flanking residues from a canonical peptide string
pub fn clean_sequence(canonical: &str) -> String {
    let (_, core, _) = split_flanks(canonical, &[]);
    core.chars().filter(char::is_ascii_uppercase).collect()
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use thin_vec::thin_vec;

    use super::*;
    use crate::modification::ModificationKind;

    fn registry() -> ModificationRegistry {
        ModificationRegistry::new(vec![
            ModificationDefinition::dynamic(
                '*',
                15.994915,
                TargetResidues::Residues(thin_vec!['M']),
                TerminusConstraint::None,
                "Oxidation",
            ),
            ModificationDefinition::dynamic(
                '#',
                144.102063,
                TargetResidues::Residues(thin_vec!['K']),
                TerminusConstraint::PeptideNTerm,
                "iTRAQ4plex",
            ),
            ModificationDefinition {
                symbol: '-',
                mass: ordered_float::OrderedFloat(57.021464),
                residues: TargetResidues::Residues(thin_vec!['C']),
                kind: ModificationKind::StaticResidue,
                terminus: TerminusConstraint::None,
                name: "Carbamidomethyl".to_string(),
            },
        ])
    }

    #[test]
    fn itraq_after_last_residue() {
        let mut registry = registry();
        let (peptide, errors) =
            NormalizedPeptide::parse_inline("K.PEPTIDE+144.0.K", &[], &mut registry).unwrap();
        assert!(errors.is_empty());
        assert_eq!(peptide.prefix, 'K');
        assert_eq!(peptide.suffix, 'K');
        assert_eq!(peptide.to_string(), "K.#PEPTIDE.K");
    }

    #[test]
    fn itraq_after_first_residue() {
        let mut registry = registry();
        let (peptide, errors) =
            NormalizedPeptide::parse_inline("K.P+144.1EPTIDE.K", &[], &mut registry).unwrap();
        assert!(errors.is_empty());
        assert_eq!(peptide.to_string(), "K.#PEPTIDE.K");
    }

    #[test]
    fn inline_with_markers() {
        let mut registry = registry();
        let (peptide, errors) = NormalizedPeptide::parse_inline(
            "*.+144.102M+15.995PEPC+57.021K.*",
            &['*'],
            &mut registry,
        )
        .unwrap();
        assert!(errors.is_empty());
        assert_eq!(peptide.to_string(), "-.#M*PEPCK.-");
        assert_eq!(peptide.tryptic_termini(), 2);
        let expected = "MPEPCK"
            .chars()
            .map(|r| residue_mass(r).unwrap())
            .sum::<f64>()
            + WATER
            + 57.021464
            + 15.994915
            + 144.102063;
        assert!((peptide.theoretical_mass(&registry) - expected).abs() < 1e-6);
    }

    #[test]
    fn unknown_mass_is_registered() {
        let mut registry = registry();
        let (first, errors) =
            NormalizedPeptide::parse_inline("R.S+79.966PEK.A", &[], &mut registry).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(&errors[0].get_kind(), &SynopsisError::UnresolvedModification);
        let (second, errors) =
            NormalizedPeptide::parse_inline("R.ST+79.966EK.A", &[], &mut registry).unwrap();
        assert!(errors.is_empty());
        assert_eq!(first.to_string(), "R.S@PEK.A");
        assert_eq!(second.to_string(), "R.ST@EK.A");
    }

    #[test]
    fn unknown_name_gets_sentinel() {
        let mut registry = registry();
        let (peptide, errors) =
            NormalizedPeptide::parse_inline("K.Sphos.R", &[], &mut registry).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(peptide.to_string(), "K.S?.R");
    }

    #[test]
    fn bracketed() {
        let mut registry = registry();
        let (peptide, errors) = NormalizedPeptide::parse_bracketed(
            "[+144.1021]-PEM[+15.9949]C[+57.0215]K",
            &mut registry,
        )
        .unwrap();
        assert!(errors.is_empty());
        assert_eq!(peptide.to_string(), "-.#PEM*CK.-");
        assert!(NormalizedPeptide::parse_bracketed("PEM[+15.99", &mut registry).is_err());
    }

    #[test]
    fn modification_list() {
        let mut registry = registry();
        let (peptide, errors) = NormalizedPeptide::parse_with_modification_list(
            "PEMCK",
            'R',
            'A',
            "3M(15.9949), 4C(57.0215), N-term(144.1021)",
            &mut registry,
        )
        .unwrap();
        assert!(errors.is_empty());
        assert_eq!(peptide.to_string(), "R.#PEM*CK.A");
        assert_eq!(peptide.tryptic_termini(), 1);
        assert!(
            NormalizedPeptide::parse_with_modification_list(
                "PEMCK",
                'R',
                'A',
                "9M(15.9949)",
                &mut registry
            )
            .is_err()
        );
    }

    #[test]
    fn tryptic_termini() {
        let peptide = |prefix, sequence: &str, suffix| NormalizedPeptide {
            prefix,
            sequence: sequence.to_string(),
            suffix,
            modifications: Vec::new(),
        };
        assert_eq!(peptide('K', "PEPTIDER", 'A').tryptic_termini(), 1);
        assert_eq!(peptide('A', "EPTIDEK", 'P').tryptic_termini(), 0);
        assert_eq!(peptide('-', "MEPTIDE", '-').tryptic_termini(), 2);
    }

    #[test]
    fn clean() {
        assert_eq!(clean_sequence("K.#PEM*CK.A"), "PEMCK");
        assert_eq!(clean_sequence("PEPTIDE"), "PEPTIDE");
    }
}
