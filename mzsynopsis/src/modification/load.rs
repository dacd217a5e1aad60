use std::{
    io::{BufRead, BufReader, Read},
    path::Path,
};

use context_error::*;
use ordered_float::OrderedFloat;
use thin_vec::ThinVec;

use crate::{
    csv::{csv_separate, is_header_like, open_file},
    error::{SynopsisError, SynopsisResult},
    modification::{
        ModificationDefinition, ModificationKind, STATIC_MODIFICATION_SYMBOL, TargetResidues,
        TerminusConstraint,
    },
};

/// Load a modification definitions file.
///
/// The file is tab separated with the columns `Symbol Mass Residues Type Name`, the header line is
/// optional and lines starting with `#` without any tab are ignored. Malformed rows are returned as errors next
/// to all correctly read definitions.
/// # Errors
/// `ParameterFileNotFound` if the file could not be opened.
pub fn load_modification_definitions(
    path: impl AsRef<Path>,
) -> SynopsisResult<(
    Vec<ModificationDefinition>,
    Vec<BoxedError<'static, SynopsisError>>,
)> {
    let reader = open_file(path.as_ref()).map_err(|_| {
        BoxedError::new(
            SynopsisError::ParameterFileNotFound,
            "Could not open modification definitions",
            "The modification definitions file does not exist or cannot be read",
            Context::none()
                .source(path.as_ref().to_string_lossy())
                .to_owned(),
        )
    })?;
    Ok(parse_modification_definitions(reader))
}

/// Parse modification definitions from a reader, see [`load_modification_definitions`].
pub fn parse_modification_definitions(
    reader: impl Read,
) -> (
    Vec<ModificationDefinition>,
    Vec<BoxedError<'static, SynopsisError>>,
) {
    let mut definitions = Vec::new();
    let mut errors = Vec::new();
    let mut first = true;
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                errors.push(BoxedError::new(
                    SynopsisError::MalformedInputLine,
                    "Could not read line",
                    err.to_string(),
                    Context::none().line_index(index as u32),
                ));
                continue;
            }
        };
        // A '#' is also a valid symbol, so only lines without columns are comments
        if line.trim().is_empty() || (line.starts_with('#') && !line.contains('\t')) {
            continue;
        }
        if std::mem::take(&mut first) && is_header_like(&line, b'\t') {
            continue;
        }
        match parse_definition(&line, index) {
            Ok(definition) => definitions.push(definition),
            Err(err) => errors.push(err),
        }
    }
    (definitions, errors)
}

fn parse_definition(line: &str, index: usize) -> SynopsisResult<ModificationDefinition> {
    let fields = csv_separate(line, b'\t').map_err(BoxedError::to_owned)?;
    let error = |short: &'static str, long: String, field: usize| {
        let range = fields.get(field).cloned().unwrap_or(0..line.len());
        BoxedError::new(
            SynopsisError::MalformedInputLine,
            short,
            long,
            Context::line(Some(index as u32), line, range.start, range.len()).to_owned(),
        )
    };
    if fields.len() < 4 {
        return Err(error(
            "Invalid modification definition",
            format!(
                "A modification definition needs at least 4 columns (Symbol, Mass, Residues, Type) but {} were found",
                fields.len()
            ),
            0,
        ));
    }
    let symbol_text = line[fields[0].clone()].trim();
    let mut symbol_chars = symbol_text.chars();
    let symbol = match (symbol_chars.next(), symbol_chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(error(
                "Invalid modification symbol",
                "The symbol should be a single character".to_string(),
                0,
            ));
        }
    };
    let mass = line[fields[1].clone()].trim().parse::<f64>().map_err(|e| {
        error(
            "Invalid modification mass",
            format!("The mass is not a valid number: {e}"),
            1,
        )
    })?;
    let kind = ModificationKind::from_code(&line[fields[3].clone()]).ok_or_else(|| {
        error(
            "Invalid modification type",
            "The type should be one of D (dynamic), S (static), T (static peptide terminal), P (static protein terminal)".to_string(),
            3,
        )
    })?;
    let (residues, terminus) = parse_residues(&line[fields[2].clone()]).ok_or_else(|| {
        error(
            "Invalid modification residues",
            "The residues should be amino acid codes, '*' for any residue, or one of the terminus markers '<', '>', '[', ']'".to_string(),
            2,
        )
    })?;
    if kind.is_static() != (symbol == STATIC_MODIFICATION_SYMBOL) {
        return Err(error(
            "Invalid modification symbol",
            format!(
                "Static modifications have to use '{STATIC_MODIFICATION_SYMBOL}' as symbol, dynamic modifications cannot use it"
            ),
            0,
        ));
    }
    if matches!(
        kind,
        ModificationKind::StaticPeptideTerminus | ModificationKind::StaticProteinTerminus
    ) && terminus == TerminusConstraint::None
    {
        return Err(error(
            "Invalid modification residues",
            "A static terminal modification needs a terminus marker".to_string(),
            2,
        ));
    }
    let name = fields
        .get(4)
        .map(|r| line[r.clone()].trim().to_string())
        .unwrap_or_default();
    Ok(ModificationDefinition {
        symbol,
        mass: OrderedFloat(mass),
        residues,
        kind,
        terminus,
        name,
    })
}

fn parse_residues(text: &str) -> Option<(TargetResidues, TerminusConstraint)> {
    let mut residues = ThinVec::new();
    let mut any = false;
    let mut terminus = TerminusConstraint::None;
    for c in text.trim().chars() {
        match c {
            '<' => terminus = TerminusConstraint::PeptideNTerm,
            '>' => terminus = TerminusConstraint::PeptideCTerm,
            '[' => terminus = TerminusConstraint::ProteinNTerm,
            ']' => terminus = TerminusConstraint::ProteinCTerm,
            '*' => any = true,
            c if c.is_ascii_alphabetic() => residues.push(c.to_ascii_uppercase()),
            _ => return None,
        }
    }
    if any || residues.is_empty() {
        Some((TargetResidues::Any, terminus))
    } else {
        Some((TargetResidues::Residues(residues), terminus))
    }
}
