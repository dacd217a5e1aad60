use std::{borrow::Cow, ops::Range, str::FromStr};

use context_error::*;

use crate::{csv::CsvLine, error::SynopsisError, search_hit::ScoreValue};

/// The way to set up a format family.
///
/// It starts with defining the name, all versions (parsing is tried in this order), which
/// separator is used, and if needed the header for files without a header row (columns are then
/// mapped by position).
///
/// After that the columns are defined, first the required columns (present in all format versions)
/// followed by the optional columns (missing/optional in at least one version). For each column,
/// the name, type, and the lambda function to parse the text are given. Note that optional column
/// types are automatically wrapped in an `Option` so no additional `Option` should be specified.
///
/// Lastly, a post processing function can be specified.
///
/// # Notes
/// * Do not forget to create a `<$format>Version` enum which contains all supported version of the
///   format, which additionally should implement `FormatVersion`.
/// * For each version a public constant should be generated that contains an instantiation of the
///   `<$format>Format` type, these are also the ones that need to be listed in the versions list.
macro_rules! format_family {
     ($(#[doc = $ddoc:expr])*
     $format:ident, $versions:expr, $separator:expr, $header:expr;
     required { $($(#[doc = $rdoc:expr])? $rname:ident: $rtyp:ty, $rf:expr;)* }
     optional { $($(#[doc = $odoc:expr])? $oname:ident: $otyp:ty, $of:expr;)*}
     $($post_process:item)?
    ) => {paste::paste!{
        #[allow(unused_imports)] // Needed sometimes, but not all invocations of the macro
        use context_error::*;

        use crate::common_parser::HasLocation;

        #[doc = "The type to contain the format description for " $format " files."]
        #[non_exhaustive]
        #[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        pub struct [<$format Format>] {
            $($rname: &'static str,)*
            $($oname: crate::common_parser::OptionalColumn,)*
            version: [<$format Version>]
        }

        #[doc = "The data for individual entries in " $format " files."]
        $(#[doc = $ddoc])*
        #[non_exhaustive]
        #[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
        #[allow(missing_docs)]
        pub struct [<$format Hit>] {
            $($(#[doc = $rdoc])? pub $rname: $rtyp,)*
            $($(#[doc = $odoc])? pub $oname: Option<$otyp>,)*
            /// The 0 based line index in the source file
            pub line_index: usize,
            /// The version used to read in the data
            pub version: [<$format Version>],
        }

        impl crate::common_parser::FormatHit for [<$format Hit>] {
            type Format = [<$format Format>];
            type Version = [<$format Version>];
            const SEPARATOR: u8 = $separator;

            fn provided_header() -> Option<Vec<String>> {
                $header
            }

            fn version(&self) -> Self::Version {
                self.version
            }

            fn parse(source: &CsvLine) -> Result<(Self, &'static Self::Format), BoxedError<'static, SynopsisError>> {
                let mut errors = Vec::new();
                for format in $versions {
                    match Self::parse_specific(source, format) {
                        Ok(hit) => return Ok((hit, format)),
                        Err(err) => errors.push(err),
                    }
                }
                Err(BoxedError::new(SynopsisError::MalformedInputLine,
                    format!("Invalid {} line", stringify!($format)),
                    "The correct format could not be determined automatically",
                    source.full_context().to_owned(),
                ).add_underlying_errors(errors))
            }

            #[allow(clippy::redundant_closure_call, unused_variables)] // Macro magic
            fn parse_specific(source: &CsvLine, format: &[<$format Format>]) -> Result<Self, BoxedError<'static, SynopsisError>> {
                #[allow(unused_imports)]
                use crate::helper_functions::InvertResult;

                /// Shadowing `Result::Ok` to inject the correct error type which otherwise leads
                /// to the compiler complaining about its absence when a field cannot fail.
                #[allow(non_snake_case, dead_code, clippy::missing_errors_doc)]
                const fn Ok<T>(value: T) -> Result<T, BoxedError<'static, SynopsisError>> {
                    Result::Ok(value)
                }

                let parsed = Self {
                    $($rname: $rf(source.column(format.$rname)?)?,)*
                    $($oname: format.$oname.open_column(source).and_then(|l: Option<Location>| l.map(|value: Location| $of(value)).invert())?,)*
                    line_index: source.line_index(),
                    version: format.version,
                };
                Self::post_process(source, parsed)
            }
            $($post_process)?
        }
    }};
}

/// A record that can be read from a line in a result file of one format family.
pub trait FormatHit: Sized {
    /// The description of the columns
    type Format: 'static;
    /// The versions of this format
    type Version: Copy + std::fmt::Display;
    /// The separator for the columns
    const SEPARATOR: u8;

    /// The column names to use for formats that do not write a header row.
    fn provided_header() -> Option<Vec<String>>;

    /// The version of the format this record was read with
    fn version(&self) -> Self::Version;

    /// Parse a line, trying all known versions in order.
    /// # Errors
    /// When the line does not fit any of the versions.
    fn parse(source: &CsvLine)
    -> Result<(Self, &'static Self::Format), BoxedError<'static, SynopsisError>>;

    /// Parse a line with a specific version of the format.
    /// # Errors
    /// When any required column is missing or could not be parsed.
    fn parse_specific(
        source: &CsvLine,
        format: &Self::Format,
    ) -> Result<Self, BoxedError<'static, SynopsisError>>;

    /// Fix up the parsed record, for derived fields that need access to multiple columns.
    /// # Errors
    /// When the combined fields are invalid.
    fn post_process(
        _source: &CsvLine,
        parsed: Self,
    ) -> Result<Self, BoxedError<'static, SynopsisError>> {
        Ok(parsed)
    }
}

/// A version of a format family
pub trait FormatVersion<Format>: Copy {
    /// Get the column description for this version
    fn format(self) -> Format;
    /// Get the name of this version
    fn name(self) -> &'static str;
}

/// The possible options for an optional column
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub(crate) enum OptionalColumn {
    /// This column is not avalable in this version
    #[default]
    NotAvailable,
    /// This column is optional in this version
    Optional(&'static str),
    /// This column is required in this version (but as it is an `OptionalColumn` not in some other version)
    Required(&'static str),
}

impl OptionalColumn {
    /// Open the column
    /// # Errors
    /// while creating the correct error messages for missing columns
    pub(crate) fn open_column(
        self,
        source: &CsvLine,
    ) -> Result<Option<Location<'_>>, BoxedError<'static, SynopsisError>> {
        match self {
            Self::NotAvailable => Ok(None),
            Self::Optional(s) => Ok(source.column(s).ok().and_then(Location::or_empty)),
            Self::Required(s) => source.column(s).map(Location::or_empty),
        }
    }
}

pub(crate) trait HasLocation {
    /// Get the specified column.
    /// # Errors
    /// If the column does not exist.
    fn column<'a>(
        &'a self,
        name: &'a str,
    ) -> Result<Location<'a>, BoxedError<'static, SynopsisError>>;
}

impl HasLocation for CsvLine {
    /// Get the specified column
    /// # Errors
    /// If the given column does not exist
    fn column<'a>(
        &'a self,
        name: &'a str,
    ) -> Result<Location<'a>, BoxedError<'static, SynopsisError>> {
        self.index_column(name)
            .map(|(_v, c)| Location {
                line: self,
                location: c.clone(),
                column: Some(name),
            })
            .map_err(BoxedError::to_owned)
    }
}

/// The base location type to keep track of the location of to be parsed pieces in the monadic parser combinators below
#[derive(Clone, Debug)]
pub(crate) struct Location<'a> {
    pub(crate) line: &'a CsvLine,
    pub(crate) location: Range<usize>,
    pub(crate) column: Option<&'a str>,
}

impl Location<'_> {
    pub(crate) fn array(self, sep: char) -> std::vec::IntoIter<Self> {
        let mut offset = 0;
        let mut output = Vec::new();
        for part in self.as_str().split(sep) {
            output.push(Location {
                line: self.line,
                location: self.location.start + offset..self.location.start + offset + part.len(),
                column: self.column,
            });
            offset += part.len() + 1;
        }
        output.into_iter()
    }

    pub(crate) fn or_empty(self) -> Option<Self> {
        let text = self.as_str().trim();
        if text.is_empty() || text == "-" {
            None
        } else {
            Some(self)
        }
    }

    pub(crate) fn get_string(self) -> String {
        self.as_str().trim().to_string()
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.line.line()[self.location.clone()]
    }
}

impl<'a> Location<'a> {
    /// # Errors
    /// If the parse method fails. See [`FromStr::parse`].
    pub(crate) fn parse<T: FromStr>(
        self,
        base_error: (&'static str, &'static str),
    ) -> Result<T, BoxedError<'static, SynopsisError>> {
        self.as_str().trim().parse().map_err(|_| {
            BoxedError::new(
                SynopsisError::MalformedInputLine,
                base_error.0,
                base_error.1,
                self.line
                    .range_context(self.location, self.column.map(Cow::Borrowed))
                    .to_owned(),
            )
        })
    }

    /// Parse a score, keeping the original text
    /// # Errors
    /// If the text is not a number.
    pub(crate) fn parse_score(
        self,
        base_error: (&'static str, &'static str),
    ) -> Result<ScoreValue, BoxedError<'static, SynopsisError>> {
        let raw = self.as_str().trim().to_string();
        self.parse::<f64>(base_error)
            .map(|value| ScoreValue { value, raw })
    }

    /// Create an error pointing at this location
    pub(crate) fn error(
        &self,
        short: impl Into<Cow<'static, str>>,
        long: impl Into<Cow<'static, str>>,
    ) -> BoxedError<'static, SynopsisError> {
        BoxedError::new(
            SynopsisError::MalformedInputLine,
            short,
            long,
            self.context().to_owned(),
        )
    }

    pub(crate) fn context(&self) -> Context<'a> {
        self.line
            .range_context(self.location.clone(), self.column.map(Cow::Borrowed))
    }

    pub(crate) fn trim(&self) -> Self {
        let str = self.as_str();
        let length = str.len();
        let trimmed_start = length - str.trim_start().len();
        let trimmed_end = length - str.trim_end().len();

        Self {
            line: self.line,
            location: if trimmed_start == length {
                self.location.start..self.location.start
            } else {
                self.location.start + trimmed_start..self.location.end - trimmed_end
            },
            column: self.column,
        }
    }

    /// Split twice on the character, split on the first and last occurrence of the given character.
    /// So any additional occurrences of the characters are in the middle segment.
    pub(crate) fn split_twice(self, p: char) -> Option<(Self, Self, Self)> {
        let (start, after) = self.as_str().split_once(p)?;
        let (middle, end) = after.rsplit_once(p)?;
        let start_middle = self.location.start + start.len() + p.len_utf8();
        Some((
            Self {
                line: self.line,
                location: self.location.start..self.location.start + start.len(),
                column: self.column,
            },
            Self {
                line: self.line,
                location: start_middle..start_middle + middle.len(),
                column: self.column,
            },
            Self {
                line: self.line,
                location: self.location.end - end.len()..self.location.end,
                column: self.column,
            },
        ))
    }
}

pub(crate) trait OptionalLocation<'a> {
    /// # Errors
    /// If the parse method fails. See [`FromStr::parse`].
    fn parse<T: FromStr>(
        self,
        base_error: (&'static str, &'static str),
    ) -> Result<Option<T>, BoxedError<'static, SynopsisError>>;
}

impl<'a> OptionalLocation<'a> for Option<Location<'a>> {
    fn parse<T: FromStr>(
        self,
        base_error: (&'static str, &'static str),
    ) -> Result<Option<T>, BoxedError<'static, SynopsisError>> {
        self.map(|l| l.parse::<T>(base_error)).transpose()
    }
}
