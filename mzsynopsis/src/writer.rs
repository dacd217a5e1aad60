//! Writing the canonical tab separated synopsis and first hits files

use std::{
    io::{self, prelude::*},
    marker::PhantomData,
};

use context_error::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::{SynopsisError, SynopsisResult},
    mass::PROTON,
    mass_error::{MassError, corrected_error},
    ranking::Ranked,
    search_hit::{ScoreValue, SearchHit},
    search_tool::SearchTool,
};

/// One normalised match as written to the output
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CanonicalPeptideRecord {
    /// The sequential id, starting at 1
    pub result_id: usize,
    /// The scan number
    pub scan: u32,
    /// The canonical peptide (`K.M*PEPTIDE.R`)
    pub peptide: String,
    /// The protein name
    pub protein: String,
    /// The precursor charge
    pub charge: u8,
    /// The tool specific scores, see [`SearchTool::score_columns`]
    pub scores: Vec<ScoreValue>,
    /// The number of tryptic termini
    pub ntt: u8,
    /// The significance score, see [`SearchTool::significance_column`]
    pub significance: ScoreValue,
    /// The normalised delta score
    pub delta_norm: f64,
    /// The rank within the scan and charge
    pub rank: usize,
    /// The theoretical (M+H)+ mass
    pub mh: f64,
    /// The observed precursor m/z
    pub precursor_mz: Option<f64>,
    /// The isotope corrected precursor mass error
    pub mass_error: MassError,
}

impl CanonicalPeptideRecord {
    /// Create the record for a ranked match
    pub fn new(result_id: usize, ranked: &Ranked<SearchHit>) -> Self {
        let hit = &ranked.hit;
        Self {
            result_id,
            scan: hit.scan,
            peptide: hit.canonical_peptide.clone(),
            protein: hit.protein.clone(),
            charge: hit.charge,
            scores: hit.scores.clone(),
            ntt: hit.ntt,
            significance: hit.significance.clone(),
            delta_norm: ranked.delta_norm,
            rank: ranked.rank,
            mh: hit.theoretical_mass + PROTON,
            precursor_mz: hit.precursor_mz,
            mass_error: corrected_error(hit.precursor_mz, hit.charge, hit.theoretical_mass),
        }
    }
}

/// The header row for the given tool
pub fn header(tool: SearchTool) -> Vec<&'static str> {
    let mut columns = vec!["ResultID", "Scan", "Peptide", "Protein", "Charge"];
    columns.extend_from_slice(tool.score_columns());
    columns.push("NTT");
    columns.push(tool.significance_column());
    columns.extend_from_slice(&[
        "DeltaNormScore",
        "RankScore",
        "MH",
        "PrecursorMZ",
        "PrecursorError",
        "DelM_PPM",
        "IsotopeError",
    ]);
    columns
}

/// The state of a writer before the header is written
#[derive(Clone, Copy, Debug)]
pub struct Initial;
/// The state of a writer after the header is written
#[derive(Clone, Copy, Debug)]
pub struct HeaderWritten;

/// A wrapper around a writer to write canonical records. The header has to be written before any
/// records can be written. Result ids are given out in the order the records are written.
///
/// It is often advisable to wrap the writer in [`io::BufWriter`].
#[derive(Debug)]
pub struct SynopsisWriter<Writer: Write, State> {
    writer: Writer,
    tool: SearchTool,
    written: usize,
    state: PhantomData<State>,
}

fn write_error(error: &io::Error) -> BoxedError<'static, SynopsisError> {
    BoxedError::new(
        SynopsisError::OutputWriteFailure,
        "Could not write output",
        error.to_string(),
        Context::none(),
    )
}

impl<Writer: Write, State> SynopsisWriter<Writer, State> {
    /// The tool the records are written for
    pub const fn tool(&self) -> SearchTool {
        self.tool
    }

    /// The number of records written
    pub const fn written(&self) -> usize {
        self.written
    }
}

impl<Writer: Write> SynopsisWriter<Writer, Initial> {
    /// Create a new writer
    pub const fn new(writer: Writer, tool: SearchTool) -> Self {
        Self {
            writer,
            tool,
            written: 0,
            state: PhantomData,
        }
    }

    /// Write the header row, this gives back the writer that can write records.
    /// # Errors
    /// `OutputWriteFailure` if writing to the underlying stream failed.
    pub fn write_header(mut self) -> SynopsisResult<SynopsisWriter<Writer, HeaderWritten>> {
        writeln!(self.writer, "{}", header(self.tool).iter().format("\t"))
            .map_err(|e| write_error(&e))?;
        Ok(SynopsisWriter {
            writer: self.writer,
            tool: self.tool,
            written: self.written,
            state: PhantomData,
        })
    }
}

impl<Writer: Write> SynopsisWriter<Writer, HeaderWritten> {
    /// Write a ranked match with the next result id, returns the written record
    /// # Errors
    /// `OutputWriteFailure` if writing to the underlying stream failed.
    pub fn write(&mut self, ranked: &Ranked<SearchHit>) -> SynopsisResult<CanonicalPeptideRecord> {
        let record = CanonicalPeptideRecord::new(self.written + 1, ranked);
        self.write_record(&record)?;
        Ok(record)
    }

    /// Write a record as is
    /// # Errors
    /// `OutputWriteFailure` if writing to the underlying stream failed.
    pub fn write_record(&mut self, record: &CanonicalPeptideRecord) -> SynopsisResult<()> {
        self.write_row(record).map_err(|e| write_error(&e))?;
        self.written += 1;
        Ok(())
    }

    fn write_row(&mut self, record: &CanonicalPeptideRecord) -> io::Result<()> {
        let fields = [
            record.result_id.to_string(),
            record.scan.to_string(),
            record.peptide.clone(),
            record.protein.clone(),
            record.charge.to_string(),
        ]
        .into_iter()
        .chain(record.scores.iter().map(|score| score.raw.clone()))
        .chain([
            record.ntt.to_string(),
            record.significance.raw.clone(),
            format!("{:.4}", record.delta_norm),
            record.rank.to_string(),
            format!("{:.6}", record.mh),
            record
                .precursor_mz
                .map_or_else(String::new, |mz| format!("{mz:.5}")),
            format!("{:.5}", record.mass_error.da),
            format!("{:.4}", record.mass_error.ppm),
            record.mass_error.isotopes.to_string(),
        ]);
        writeln!(self.writer, "{}", fields.format("\t"))
    }

    /// Flush and get back the underlying writer
    /// # Errors
    /// `OutputWriteFailure` if flushing failed.
    pub fn finish(mut self) -> SynopsisResult<Writer> {
        self.writer.flush().map_err(|e| write_error(&e))?;
        Ok(self.writer)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use crate::{
        formats::MODaHit,
        modification::ModificationRegistry,
        search_hit::SearchHitData,
    };

    fn ranked(scan: u32, peptide: &str, observed_mass: f64) -> Ranked<SearchHit> {
        let data = MODaHit {
            scan,
            z: 2,
            observed_mass,
            peptide: peptide.to_string(),
            protein: "SO_0001".to_string(),
            score: ScoreValue {
                value: 42.0,
                raw: "42".to_string(),
            },
            probability: ScoreValue {
                value: 0.9812,
                raw: "0.9812".to_string(),
            },
            ..MODaHit::default()
        };
        let hit = SearchHit::new(SearchHitData::MODa(data), &mut ModificationRegistry::default())
            .unwrap()
            .0;
        Ranked {
            hit,
            rank: 1,
            delta_norm: 0.25,
        }
    }

    #[test]
    fn header_order() {
        let header = header(SearchTool::MSGFPlus);
        let position = |c: &str| header.iter().position(|h| *h == c).unwrap();
        assert_eq!(&header[..5], ["ResultID", "Scan", "Peptide", "Protein", "Charge"]);
        assert!(position("Charge") < position("RankScore"));
        assert!(position("RankScore") < position("DelM_PPM"));
        assert!(position("NTT") < position("EValue"));
    }

    #[test]
    fn write_records() {
        let mut writer = SynopsisWriter::new(Vec::new(), SearchTool::MODa)
            .write_header()
            .unwrap();
        let first = ranked(12, "K.PEPTIDE.R", 799.35996 + 1.0);
        writer.write(&first).unwrap();
        writer.write(&ranked(15, "R.AAAK.-", 0.0)).unwrap();
        assert_eq!(writer.written(), 2);
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "ResultID\tScan\tPeptide\tProtein\tCharge\tScore\tNTT\tProbability\tDeltaNormScore\tRankScore\tMH\tPrecursorMZ\tPrecursorError\tDelM_PPM\tIsotopeError"
        );
        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields.len(), 15);
        assert_eq!(&fields[..8], ["1", "12", "K.PEPTIDE.R", "SO_0001", "2", "42", "0", "0.9812"]);
        assert_eq!(fields[8], "0.2500");
        assert_eq!(fields[9], "1");
        assert_eq!(fields[14], "1");
        assert!(lines[2].starts_with("2\t15\tR.AAAK.-"));
    }

    #[test]
    fn failing_output() {
        #[derive(Debug)]
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let error = SynopsisWriter::new(Broken, SearchTool::Sage)
            .write_header()
            .unwrap_err();
        assert_eq!(&error.get_kind(), &SynopsisError::OutputWriteFailure);
    }
}
