//! Mapping canonical peptides onto their protein sequences

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use context_error::*;
use tracing::debug;

use crate::{
    error::{SynopsisError, SynopsisResult},
    peptide::clean_sequence,
};

/// The protein sequences of a FASTA file by protein name (the first word of the header)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProteinMapper {
    sequences: HashMap<String, String>,
}

impl ProteinMapper {
    /// Parse a FASTA file
    /// # Errors
    /// `ParameterFileNotFound` if the file cannot be opened or read.
    pub fn parse_file(path: impl AsRef<Path>) -> SynopsisResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            BoxedError::new(
                SynopsisError::ParameterFileNotFound,
                "Could not open FASTA file",
                e.to_string(),
                Context::none().source(path.to_string_lossy()).to_owned(),
            )
        })?;
        let mapper = Self::parse_reader(BufReader::new(file), Some(path))?;
        debug!("Read {} proteins from {}", mapper.len(), path.display());
        Ok(mapper)
    }

    /// Parse FASTA data
    /// # Errors
    /// `ParameterFileNotFound` if a line cannot be read.
    pub fn parse_reader(reader: impl BufRead, path: Option<&Path>) -> SynopsisResult<Self> {
        let mut sequences = HashMap::new();
        let mut current: Option<(String, String)> = None;
        for (line_index, line) in reader.lines().enumerate() {
            let line = line.map_err(|_| {
                BoxedError::new(
                    SynopsisError::ParameterFileNotFound,
                    "Failed reading FASTA file",
                    format!("Error occurred while reading line {}", line_index + 1),
                    path.map_or_else(Context::none, |p| {
                        Context::default().source(p.to_string_lossy()).to_owned()
                    }),
                )
            })?;
            if let Some(header) = line.strip_prefix('>') {
                if let Some((name, sequence)) = current.take() {
                    sequences.insert(name, sequence);
                }
                let name = header.split_whitespace().next().unwrap_or_default();
                current = Some((name.to_string(), String::new()));
            } else if let Some((_, sequence)) = &mut current {
                sequence.extend(
                    line.chars()
                        .filter(|c| !c.is_ascii_whitespace() && *c != '*')
                        .map(|c| c.to_ascii_uppercase()),
                );
            }
        }
        if let Some((name, sequence)) = current {
            sequences.insert(name, sequence);
        }
        Ok(Self { sequences })
    }

    /// The number of proteins
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Check if there are no proteins
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Get the sequence of a protein
    pub fn sequence(&self, protein: &str) -> Option<&str> {
        self.sequences.get(protein).map(String::as_str)
    }

    /// Find the 1-based inclusive residue start and end of a canonical peptide (`K.M*PEPTIDE.R`)
    /// in the protein. The first occurrence is returned.
    pub fn locate(&self, protein: &str, peptide: &str) -> Option<(usize, usize)> {
        let clean = clean_sequence(peptide);
        if clean.is_empty() {
            return None;
        }
        self.sequence(protein)?
            .find(&clean)
            .map(|start| (start + 1, start + clean.len()))
    }

    /// Copy a canonical tab separated file and add `Residue_Start` and `Residue_End` columns.
    /// Both are left empty for peptides not found in their protein. Returns the number of
    /// records that could be located.
    /// # Errors
    /// * `MalformedInputLine` if the header does not contain a `Peptide` and `Protein` column.
    /// * `OutputWriteFailure` if reading the input or writing the output failed.
    pub fn annotate(&self, reader: impl BufRead, mut writer: impl Write) -> SynopsisResult<usize> {
        let io_error = |e: std::io::Error| {
            BoxedError::new(
                SynopsisError::OutputWriteFailure,
                "Could not add protein positions",
                e.to_string(),
                Context::none(),
            )
        };
        let mut lines = reader.lines();
        let Some(header) = lines.next().transpose().map_err(io_error)? else {
            return Ok(0);
        };
        let column = |name: &str| {
            header
                .split('\t')
                .position(|c| c.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    BoxedError::new(
                        SynopsisError::MalformedInputLine,
                        "Missing column",
                        format!("The header does not contain a '{name}' column"),
                        Context::full_line(0, &header).to_owned(),
                    )
                })
        };
        let peptide_column = column("Peptide")?;
        let protein_column = column("Protein")?;
        writeln!(writer, "{header}\tResidue_Start\tResidue_End").map_err(io_error)?;

        let mut located = 0;
        for line in lines {
            let line = line.map_err(io_error)?;
            let fields: Vec<&str> = line.split('\t').collect();
            let position = fields
                .get(peptide_column)
                .zip(fields.get(protein_column))
                .and_then(|(peptide, protein)| self.locate(protein, peptide));
            let written = if let Some((start, end)) = position {
                located += 1;
                writeln!(writer, "{line}\t{start}\t{end}")
            } else {
                writeln!(writer, "{line}\t\t")
            };
            written.map_err(io_error)?;
        }
        writer.flush().map_err(io_error)?;
        Ok(located)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    const FASTA: &str = ">SO_0001 ribosomal protein\nMSKPEPTIDERAAGK\nLLMEPCK*\n\n>SO_0002\nGGGAAAK\n";

    #[test]
    fn read_fasta() {
        let mapper = ProteinMapper::parse_reader(FASTA.as_bytes(), None).unwrap();
        assert_eq!(mapper.len(), 2);
        assert_eq!(mapper.sequence("SO_0001"), Some("MSKPEPTIDERAAGKLLMEPCK"));
        assert_eq!(mapper.sequence("SO_0002"), Some("GGGAAAK"));
        assert_eq!(mapper.sequence("ribosomal"), None);
    }

    #[test]
    fn locate_peptides() {
        let mapper = ProteinMapper::parse_reader(FASTA.as_bytes(), None).unwrap();
        assert_eq!(mapper.locate("SO_0001", "K.PEPTIDER.A"), Some((4, 11)));
        assert_eq!(mapper.locate("SO_0001", "K.LLM*EPCK.-"), Some((16, 22)));
        assert_eq!(mapper.locate("SO_0002", "K.PEPTIDER.A"), None);
        assert_eq!(mapper.locate("SO_0003", "K.PEPTIDER.A"), None);
    }

    #[test]
    fn annotate_output() {
        let mapper = ProteinMapper::parse_reader(FASTA.as_bytes(), None).unwrap();
        let input = "ResultID\tScan\tPeptide\tProtein\n1\t5\tK.PEPTIDER.A\tSO_0001\n2\t6\tK.WWW.-\tSO_0002\n";
        let mut output = Vec::new();
        let located = mapper.annotate(input.as_bytes(), &mut output).unwrap();
        assert_eq!(located, 1);
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "ResultID\tScan\tPeptide\tProtein\tResidue_Start\tResidue_End");
        assert_eq!(lines[1], "1\t5\tK.PEPTIDER.A\tSO_0001\t4\t11");
        assert_eq!(lines[2], "2\t6\tK.WWW.-\tSO_0002\t\t");
    }

    #[test]
    fn annotate_needs_columns() {
        let mapper = ProteinMapper::default();
        let error = mapper
            .annotate("ResultID\tScan\n1\t5\n".as_bytes(), Vec::new())
            .unwrap_err();
        assert_eq!(&error.get_kind(), &SynopsisError::MalformedInputLine);
    }
}
