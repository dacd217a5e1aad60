use std::fmt::Display;

use context_error::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::SynopsisError,
    modification::{
        ModificationDefinition, ModificationKind, TargetResidues, TerminusConstraint,
        TerminusState,
    },
};

/// The default tolerance in Dalton for matching a reported mass to a known modification
pub const DEFAULT_MASS_TOLERANCE: f64 = 0.5;

/// Names are compared case insensitive on this many characters
pub const NAME_MATCH_LENGTH: usize = 8;

/// The symbols handed out to modifications that are only seen as masses in the results
const SYMBOL_POOL: &str = "*#@$&!%~^=`|";

/// A modification as reported by a search tool
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModificationToken<'a> {
    /// A symbol, used if the tool already writes canonical symbols
    Symbol(char),
    /// A modification name
    Name(&'a str),
    /// A mass difference in Dalton
    Mass(f64),
}

impl Display for ModificationToken<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symbol(s) => write!(f, "symbol '{s}'"),
            Self::Name(n) => write!(f, "name '{n}'"),
            Self::Mass(m) => write!(f, "mass {m:+.4}"),
        }
    }
}

/// The table of known modifications for one run.
///
/// The table only grows: masses that cannot be resolved are added as new unnamed modifications
/// so that later occurrences get the same symbol.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ModificationRegistry {
    definitions: Vec<ModificationDefinition>,
    tolerance: f64,
    registered: usize,
}

impl Default for ModificationRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ModificationRegistry {
    /// Create a registry with the default mass tolerance
    pub const fn new(definitions: Vec<ModificationDefinition>) -> Self {
        Self {
            definitions,
            tolerance: DEFAULT_MASS_TOLERANCE,
            registered: 0,
        }
    }

    /// Set the mass tolerance in Dalton
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Change the mass tolerance in Dalton
    pub const fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// The mass tolerance in Dalton
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// All definitions in order of precedence
    pub fn definitions(&self) -> &[ModificationDefinition] {
        &self.definitions
    }

    /// The number of unnamed modifications added while resolving
    pub const fn registered(&self) -> usize {
        self.registered
    }

    /// Add a definition, it gets the lowest precedence
    pub fn add(&mut self, definition: ModificationDefinition) {
        self.definitions.push(definition);
    }

    /// All static modifications
    pub fn statics(&self) -> impl Iterator<Item = &ModificationDefinition> {
        self.definitions.iter().filter(|d| d.kind.is_static())
    }

    /// Find the dynamic definition with this symbol
    pub fn by_symbol(&self, symbol: char) -> Option<&ModificationDefinition> {
        self.definitions
            .iter()
            .find(|d| !d.kind.is_static() && d.symbol == symbol)
    }

    /// Find a definition by name, compared case insensitive on the first [`NAME_MATCH_LENGTH`] characters
    pub fn by_name(&self, name: &str) -> Option<&ModificationDefinition> {
        let key = truncated_name(name);
        if key.is_empty() {
            return None;
        }
        self.definitions
            .iter()
            .find(|d| truncated_name(&d.name) == key)
    }

    /// Find a definition by mass, the best fit in position wins, then the closest mass. If
    /// multiple definitions fit equally well the first one is returned.
    ///
    /// A definition listing the residue explicitly is preferred, then a terminal definition
    /// allowed at this terminus, then a definition that applies to any residue, and lastly any
    /// dynamic definition within the tolerance.
    pub fn by_mass(
        &self,
        mass: f64,
        residue: Option<char>,
        terminus: TerminusState,
    ) -> Option<&ModificationDefinition> {
        self.definitions
            .iter()
            .filter(|d| !d.is_unknown() && (d.mass() - mass).abs() <= self.tolerance)
            .filter_map(|d| placement_tier(d, residue, terminus).map(|t| (t, d)))
            .min_by(|(ta, a), (tb, b)| {
                ta.cmp(tb)
                    .then((a.mass() - mass).abs().total_cmp(&(b.mass() - mass).abs()))
            })
            .map(|(_, d)| d)
    }

    /// Resolve a token, first by symbol, then by name, then by mass.
    /// # Errors
    /// `UnresolvedModification` if no definition fits.
    pub fn resolve(
        &self,
        token: ModificationToken<'_>,
        residue: Option<char>,
        terminus: TerminusState,
    ) -> Result<ModificationDefinition, BoxedError<'static, SynopsisError>> {
        match token {
            ModificationToken::Symbol(symbol) => self.by_symbol(symbol),
            ModificationToken::Name(name) => self.by_name(name).or_else(|| {
                // Some tools write the symbol as name
                let mut chars = name.chars();
                chars
                    .next()
                    .filter(|_| chars.next().is_none())
                    .and_then(|c| self.by_symbol(c))
            }),
            ModificationToken::Mass(mass) => self.by_mass(mass, residue, terminus),
        }
        .cloned()
        .ok_or_else(|| {
            BoxedError::new(
                SynopsisError::UnresolvedModification,
                "Unresolved modification",
                format!(
                    "No modification definition matches {token}{}",
                    residue.map_or(String::new(), |r| format!(" on residue {r}"))
                ),
                Context::none(),
            )
        })
    }

    /// Resolve a token, adding a new unnamed definition if it is an unknown mass. The error is
    /// returned for the first occurrence of an unknown mass and for every token that resolved to
    /// the unknown sentinel.
    pub fn resolve_or_register(
        &mut self,
        token: ModificationToken<'_>,
        residue: Option<char>,
        terminus: TerminusState,
    ) -> (
        ModificationDefinition,
        Option<BoxedError<'static, SynopsisError>>,
    ) {
        match self.resolve(token, residue, terminus) {
            Ok(definition) => (definition, None),
            Err(error) => {
                if let ModificationToken::Mass(mass) = token {
                    if let Some(symbol) = self.free_symbol() {
                        let definition = ModificationDefinition::dynamic(
                            symbol,
                            mass,
                            TargetResidues::Any,
                            TerminusConstraint::None,
                            ModificationDefinition::unnamed_name(mass),
                        );
                        debug!(
                            "Registered new modification {} with symbol '{symbol}'",
                            definition.name
                        );
                        self.definitions.push(definition.clone());
                        self.registered += 1;
                        return (definition, Some(error));
                    }
                }
                (ModificationDefinition::unknown(), Some(error))
            }
        }
    }

    /// The first symbol from the pool that is not in use yet
    fn free_symbol(&self) -> Option<char> {
        SYMBOL_POOL
            .chars()
            .find(|c| !self.definitions.iter().any(|d| d.symbol == *c))
    }

    /// The total static mass on this residue
    pub fn static_residue_mass(&self, residue: char) -> f64 {
        self.statics()
            .filter(|d| d.kind == ModificationKind::StaticResidue && d.residues.contains(residue))
            .map(ModificationDefinition::mass)
            .sum()
    }

    /// The total static terminal mass for a peptide, given whether the peptide is at the protein
    /// N or C terminus.
    pub fn static_terminal_mass(&self, protein_n_term: bool, protein_c_term: bool) -> f64 {
        self.statics()
            .filter(|d| match d.kind {
                ModificationKind::StaticPeptideTerminus => true,
                ModificationKind::StaticProteinTerminus => {
                    (d.terminus.is_n_term() && protein_n_term)
                        || (d.terminus.is_c_term() && protein_c_term)
                }
                _ => false,
            })
            .map(ModificationDefinition::mass)
            .sum()
    }
}

fn truncated_name(name: &str) -> String {
    name.trim()
        .chars()
        .take(NAME_MATCH_LENGTH)
        .collect::<String>()
        .to_lowercase()
}

/// Score how well a definition fits the position, lower is better, `None` if it cannot be placed.
fn placement_tier(
    definition: &ModificationDefinition,
    residue: Option<char>,
    terminus: TerminusState,
) -> Option<u8> {
    let terminal_fit =
        definition.terminus != TerminusConstraint::None && definition.terminus.allows(terminus);
    if residue.is_some_and(|r| definition.residues.lists(r)) {
        Some(0)
    } else if terminal_fit {
        Some(1)
    } else if definition.kind.is_static() {
        None
    } else if definition.residues == TargetResidues::Any
        && definition.terminus == TerminusConstraint::None
    {
        Some(2)
    } else {
        Some(3)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use thin_vec::thin_vec;

    use super::*;

    fn registry() -> ModificationRegistry {
        ModificationRegistry::new(vec![
            ModificationDefinition::dynamic(
                '*',
                15.9949,
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
            ModificationDefinition::dynamic(
                '@',
                42.010565,
                TargetResidues::Any,
                TerminusConstraint::ProteinNTerm,
                "Acetyl",
            ),
            ModificationDefinition::dynamic(
                '$',
                42.010565,
                TargetResidues::Residues(thin_vec!['K']),
                TerminusConstraint::None,
                "AcetylK",
            ),
        ])
    }

    #[test]
    fn resolve_order() {
        let registry = registry();
        assert_eq!(
            registry
                .resolve(ModificationToken::Symbol('*'), None, TerminusState::None)
                .unwrap()
                .name,
            "Oxidation"
        );
        assert_eq!(
            registry
                .resolve(ModificationToken::Name("OXIDATION"), None, TerminusState::None)
                .unwrap()
                .symbol,
            '*'
        );
        assert_eq!(
            registry
                .resolve(
                    ModificationToken::Mass(16.0),
                    Some('M'),
                    TerminusState::None
                )
                .unwrap()
                .symbol,
            '*'
        );
    }

    #[test]
    fn mass_disambiguation() {
        let registry = registry();
        let at_k = registry
            .resolve(ModificationToken::Mass(42.01), Some('K'), TerminusState::None)
            .unwrap();
        assert_eq!(at_k.symbol, '$');
        let at_protein_start = registry
            .resolve(
                ModificationToken::Mass(42.01),
                Some('A'),
                TerminusState::ProteinNTerm,
            )
            .unwrap();
        assert_eq!(at_protein_start.symbol, '@');
    }

    #[test]
    fn closest_mass_in_tier() {
        let mut registry = registry();
        registry.add(ModificationDefinition::dynamic(
            '!',
            16.0313,
            TargetResidues::Residues(thin_vec!['M']),
            TerminusConstraint::None,
            "Methyl+",
        ));
        let close = |mass| {
            registry
                .resolve(ModificationToken::Mass(mass), Some('M'), TerminusState::None)
                .unwrap()
                .symbol
        };
        assert_eq!(close(15.99), '*');
        assert_eq!(close(16.03), '!');
    }

    #[test]
    fn symbol_round_trip() {
        let registry = registry();
        for definition in registry.definitions() {
            let found = registry
                .resolve(
                    ModificationToken::Symbol(definition.symbol),
                    None,
                    TerminusState::None,
                )
                .unwrap();
            assert_eq!(&found, definition);
            assert_eq!(registry.by_symbol(found.symbol), Some(definition));
        }
    }

    #[test]
    fn register_unknown_mass() {
        let mut registry = registry();
        let (first, error) = registry.resolve_or_register(
            ModificationToken::Mass(79.9663),
            Some('S'),
            TerminusState::None,
        );
        assert_eq!(
            error.map(|e| e.get_kind()),
            Some(SynopsisError::UnresolvedModification)
        );
        assert_eq!(first.name, "Unnamed+79.9663");
        assert_eq!(first.symbol, '&');
        let (second, error) = registry.resolve_or_register(
            ModificationToken::Mass(79.97),
            Some('T'),
            TerminusState::None,
        );
        assert!(error.is_none());
        assert_eq!(second, first);
        assert_eq!(registry.registered(), 1);
    }

    #[test]
    fn unknown_name_gives_sentinel() {
        let mut registry = registry();
        let (definition, error) = registry.resolve_or_register(
            ModificationToken::Name("Phospho"),
            Some('S'),
            TerminusState::None,
        );
        assert!(definition.is_unknown());
        assert!(error.is_some());
        assert_eq!(registry.registered(), 0);
    }
}
