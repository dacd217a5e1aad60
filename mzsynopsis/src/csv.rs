//! Reading character separated result files while keeping track of all information needed to generate good error messages.

use std::{
    borrow::Cow,
    fs::File,
    io::{BufRead, BufReader, Read},
    ops::Range,
    path::Path,
    sync::Arc,
};

use context_error::*;
use flate2::bufread::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::{error::SynopsisError, helper_functions::check_extension};

/// A single line in a CSV file
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CsvLine {
    line_index: usize,
    line: String,
    fields: Vec<(Arc<String>, Range<usize>)>,
}

impl CsvLine {
    /// Get the line index (0 based)
    pub const fn line_index(&self) -> usize {
        self.line_index
    }

    /// Get the full line
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Get the context for the specified range in the original line
    pub fn range_context<'a>(
        &'a self,
        range: Range<usize>,
        comment: Option<Cow<'a, str>>,
    ) -> Context<'a> {
        Context::line_with_comment(
            Some(self.line_index as u32),
            &self.line,
            range.start,
            range.len(),
            comment,
        )
    }

    /// Get the context for the whole line
    pub fn full_context(&self) -> Context<'_> {
        Context::full_line(self.line_index as u32, &self.line)
    }

    /// Get the specified column, by column name
    /// # Errors
    /// If the given name is not a column header return an error
    pub fn index_column<'a>(
        &'a self,
        name: &str,
    ) -> Result<(&'a str, &'a Range<usize>), BoxedError<'a, SynopsisError>> {
        self.fields
            .iter()
            .find(|f| *f.0 == *name)
            .map(|f| (&self.line[f.1.clone()], &f.1))
            .ok_or_else(|| {
                BoxedError::new(
                    SynopsisError::MalformedInputLine,
                    "Could not find given column",
                    format!("This file does not contain the needed column '{name}'"),
                    self.full_context(),
                )
            })
    }
}

/// Open a file for reading, transparently decompressing `.gz` files.
/// # Errors
/// If the file cannot be opened.
pub fn open_file(
    path: impl AsRef<Path>,
) -> Result<Box<dyn Read>, BoxedError<'static, SynopsisError>> {
    let file = File::open(path.as_ref()).map_err(|e| {
        BoxedError::new(
            SynopsisError::InputFileNotFound,
            "Could not open file",
            e.to_string(),
            Context::none()
                .source(path.as_ref().to_string_lossy())
                .to_owned(),
        )
    })?;
    if check_extension(path, "gz") {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Parse a CSV file from a raw reader.
///
/// If a header is provided the columns are mapped by position. In that case a first line of
/// which none of the first three fields is a number is taken to be a header line and skipped.
/// # Errors
/// If no header is provided and the first line could not be read as a header line.
/// Or if the 'sep=C' uses a character that is more than 1 byte wide in utf8.
pub fn parse_csv_raw<T: Read>(
    reader: T,
    mut separator: u8,
    provided_header: Option<Vec<String>>,
) -> Result<CsvLineIter<T>, BoxedError<'static, SynopsisError>> {
    let reader = BufReader::new(reader);
    let mut lines = reader.lines().enumerate().peekable();
    let mut skip = false;
    if let Some(sep) = lines
        .peek()
        .and_then(|(_, l)| l.as_ref().ok())
        .and_then(|l| l.strip_prefix("sep="))
    {
        skip = true;
        if let Some(c) = sep.chars().next() {
            if c.len_utf8() == 1 {
                separator = c as u8;
            } else {
                return Err(BoxedError::new(
                    SynopsisError::MalformedInputLine,
                    "Unicode value separators not supported",
                    "This is a character that takes more than 1 byte to represent in Unicode, this is not supported in parsing CSV files.",
                    Context::line(Some(0), sep, 0, sep.len()).to_owned(),
                ));
            }
        }
    }
    if skip {
        // Actually consume this line
        let _unused = lines.next();
    }
    let column_headers = if let Some(header) = provided_header {
        if lines
            .peek()
            .and_then(|(_, l)| l.as_ref().ok())
            .is_some_and(|l| is_header_like(l, separator))
        {
            let _header = lines.next();
        }
        header
            .into_iter()
            .map(|h| Arc::new(h.to_lowercase()))
            .collect()
    } else {
        let (_, column_headers) = lines.next().ok_or_else(|| {
            BoxedError::new(
                SynopsisError::MalformedInputLine,
                "Could not parse file",
                "The file is empty",
                Context::none(),
            )
        })?;
        let header_line = column_headers.map_err(|err| {
            BoxedError::new(
                SynopsisError::MalformedInputLine,
                "Could not read header line",
                err.to_string(),
                Context::none(),
            )
        })?;
        csv_separate(&header_line, separator)
            .map_err(BoxedError::to_owned)?
            .into_iter()
            .map(|r| Arc::new(header_line[r].to_lowercase()))
            .collect()
    };

    Ok(CsvLineIter {
        lines,
        header: column_headers,
        separator,
    })
}

/// Check if none of the first three fields of this line are numeric, used to detect a header line
/// in files that are read by column position.
pub(crate) fn is_header_like(line: &str, separator: u8) -> bool {
    csv_separate(line, separator).is_ok_and(|fields| {
        fields
            .into_iter()
            .take(3)
            .all(|range| line[range].trim().parse::<f64>().is_err())
    })
}

/// An iterator returning CSV lines
#[derive(Debug)]
pub struct CsvLineIter<T: Read> {
    lines: std::iter::Peekable<std::iter::Enumerate<std::io::Lines<BufReader<T>>>>,
    header: Vec<Arc<String>>,
    separator: u8,
}

impl<T: Read> CsvLineIter<T> {
    /// The column headers (lowercase)
    pub fn header(&self) -> &[Arc<String>] {
        &self.header
    }
}

impl<T: Read> Iterator for CsvLineIter<T> {
    type Item = Result<CsvLine, BoxedError<'static, SynopsisError>>;
    fn next(&mut self) -> Option<Self::Item> {
        let (line_index, line) = loop {
            let (line_index, line) = self.lines.next()?;
            match line {
                Ok(line) if line.trim().is_empty() => (),
                Ok(line) => break (line_index, line),
                Err(err) => {
                    return Some(Err(BoxedError::new(
                        SynopsisError::MalformedInputLine,
                        "Could not read line",
                        err.to_string(),
                        Context::none().line_index(line_index as u32),
                    )));
                }
            }
        };
        Some(
            csv_separate(&line, self.separator)
                .map_err(BoxedError::to_owned)
                .and_then(|row| {
                    if self.header.len() == row.len() {
                        Ok(CsvLine {
                            line_index,
                            line,
                            fields: self.header.iter().cloned().zip(row).collect(),
                        })
                    } else {
                        Err(BoxedError::new(
                            SynopsisError::MalformedInputLine,
                            "Incorrect number of columns",
                            format!(
                                "It does not have the correct number of columns. {} columns were expected but {} were found.",
                                self.header.len(),
                                row.len()
                            ),
                            Context::full_line(line_index as u32, &line).to_owned(),
                        ))
                    }
                }),
        )
    }
}

/// # Errors
/// If the line is empty.
pub(crate) fn csv_separate(
    line: &str,
    separator: u8,
) -> Result<Vec<Range<usize>>, BoxedError<'_, SynopsisError>> {
    if line.is_empty() {
        return Err(BoxedError::new(
            SynopsisError::MalformedInputLine,
            "Empty line",
            "The line is empty",
            Context::none(),
        ));
    }
    let mut enclosed = None;
    let mut was_enclosed = false;
    let mut row = Vec::new();
    let mut start = None;
    let mut last_non_whitespace = None;
    for (index, ch) in line.bytes().enumerate() {
        match (ch, enclosed, start) {
            (b'\"', None, None) => {
                enclosed = Some(ch);
                start = Some(index + 1);
            }
            (c, Some(e), Some(s)) if c == e => {
                enclosed = None;
                row.push(s..index);
                start = None;
                last_non_whitespace = None;
                was_enclosed = true;
            }
            (sep, None, Some(s)) if sep == separator => {
                row.push(s..last_non_whitespace.unwrap_or(index));
                start = None;
                last_non_whitespace = None;
                was_enclosed = false;
            }
            (sep, None, None) if sep == separator => {
                if !was_enclosed {
                    // ignore any separator directly after an enclosed field
                    row.push(index..index);
                    start = None;
                    last_non_whitespace = None;
                }
                was_enclosed = false;
            }
            (c, None, _) if c.is_ascii_whitespace() => (), // ignore
            (_, _, None) => {
                start = Some(index);
                last_non_whitespace = Some(index + 1);
            }
            _ => last_non_whitespace = Some(index + 1),
        }
    }
    if let Some(s) = start {
        row.push(s..last_non_whitespace.unwrap_or(line.len()));
    } else if !was_enclosed {
        row.push(line.len()..line.len());
    }
    Ok(row)
}
