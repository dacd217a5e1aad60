//! The [`SynopsisError`] kind and the bounded [`ErrorLog`] that collects recoverable errors while processing a file.

use context_error::{BoxedError, ErrorKind};
use serde::{Deserialize, Serialize};

/// The kinds of errors that can occur while normalising a result file.
///
/// `MalformedInputLine` and `UnresolvedModification` are recoverable, the line or modification is
/// skipped or replaced and processing continues. All other kinds abort the processing of a file.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SynopsisError {
    /// A line with the wrong number of columns or an unparsable required field
    #[default]
    MalformedInputLine,
    /// A modification token that could not be matched to any known definition
    UnresolvedModification,
    /// The input result file could not be found or opened
    InputFileNotFound,
    /// A parameter, options, or modification definitions file could not be found or opened
    ParameterFileNotFound,
    /// Writing the output failed halfway, any partial output should be discarded
    OutputWriteFailure,
    /// The search tool that generated a file could not be determined
    UnknownFormat,
}

impl SynopsisError {
    /// Check if processing can continue after this error.
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::MalformedInputLine | Self::UnresolvedModification)
    }
}

impl ErrorKind for SynopsisError {
    type Settings = ();
    fn descriptor(&self) -> &'static str {
        if self.is_recoverable() {
            "warning"
        } else {
            "error"
        }
    }
    fn ignored(&self, _settings: Self::Settings) -> bool {
        false
    }
    fn is_error(&self, _settings: Self::Settings) -> bool {
        !self.is_recoverable()
    }
}

/// The error type used throughout this crate
pub type SynopsisResult<T> = Result<T, BoxedError<'static, SynopsisError>>;

/// The default maximal number of characters stored in an [`ErrorLog`]
pub const DEFAULT_ERROR_LOG_CAPACITY: usize = 4096;

/// An append only log of recoverable errors with a bounded length.
///
/// Once the capacity is reached further messages are only counted, a single note at the end of
/// the text states how many messages were not stored. The log is reported once at the end of a
/// file instead of interrupting the processing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorLog {
    text: String,
    capacity: usize,
    entries: usize,
    dropped: usize,
    /// The length in bytes of the truncation note at the end of the text
    note_length: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG_CAPACITY)
    }
}

impl ErrorLog {
    /// Create a new empty log that stores at most `capacity` characters.
    pub const fn new(capacity: usize) -> Self {
        Self {
            text: String::new(),
            capacity,
            entries: 0,
            dropped: 0,
            note_length: 0,
        }
    }

    /// Append a message, if the message does not fit anymore it is only counted in the
    /// truncation note.
    pub fn push(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref().trim_end();
        self.entries += 1;
        if self.dropped == 0
            && self.text.chars().count() + message.chars().count() + 1 <= self.capacity
        {
            self.text.push_str(message);
            self.text.push('\n');
        } else {
            self.dropped += 1;
            self.make_room(0);
            self.push_note();
        }
    }

    /// Append an error, its full context is stored.
    pub fn push_error(&mut self, error: &BoxedError<'_, SynopsisError>) {
        self.push(error.to_string());
    }

    /// Append a final marker (like `processing aborted`). The marker is always stored, if needed
    /// earlier messages are removed from the end of the log to make room for it.
    pub fn finish_with(&mut self, marker: &str) {
        self.make_room(marker.chars().count() + 1);
        self.push_note();
        self.text.push_str(marker);
        self.text.push('\n');
        self.note_length = 0;
        self.entries += 1;
    }

    fn truncation_note(&self) -> Option<String> {
        (self.dropped > 0).then(|| format!("{} further messages not stored\n", self.dropped))
    }

    /// Remove the truncation note and then stored messages from the end until `extra`
    /// characters and an updated note fit
    fn make_room(&mut self, extra: usize) {
        self.text.truncate(self.text.len() - self.note_length);
        self.note_length = 0;
        while !self.text.is_empty()
            && self.text.chars().count()
                + extra
                + self.truncation_note().map_or(0, |n| n.chars().count())
                > self.capacity
        {
            let cut = self.text[..self.text.len() - 1]
                .rfind('\n')
                .map_or(0, |i| i + 1);
            self.text.truncate(cut);
            self.dropped += 1;
        }
    }

    /// Append the truncation note if there is one and it fits
    fn push_note(&mut self) {
        let used = self.text.chars().count();
        if let Some(note) = self
            .truncation_note()
            .filter(|note| used + note.chars().count() <= self.capacity)
        {
            self.text.push_str(&note);
            self.note_length = note.len();
        }
    }

    /// The stored text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The total number of messages including the ones that did not fit
    pub const fn entries(&self) -> usize {
        self.entries
    }

    /// The number of messages that were not stored because the capacity was reached
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Check if no message was logged
    pub const fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    #[test]
    fn bounded_length() {
        let mut log = ErrorLog::new(50);
        log.push("first line");
        log.push("second line");
        assert_eq!(log.dropped(), 0);
        log.push("a message that is too long for the rest");
        assert_eq!(log.text(), "first line\n2 further messages not stored\n");
        assert_eq!(log.entries(), 3);
        assert_eq!(log.dropped(), 2);
        log.push("x");
        assert_eq!(log.text(), "first line\n3 further messages not stored\n");
        assert_eq!(log.entries(), 4);
        assert!(log.text().chars().count() <= 50);
    }

    #[test]
    fn note_before_marker() {
        let mut log = ErrorLog::new(60);
        for _ in 0..4 {
            log.push("a recoverable error message");
        }
        log.finish_with("processing aborted");
        assert_eq!(log.text(), "4 further messages not stored\nprocessing aborted\n");
        assert_eq!(log.entries(), 5);
    }

    #[test]
    fn marker_always_fits() {
        let mut log = ErrorLog::new(24);
        log.push("aaaaaaa");
        log.push("bbbbbbb");
        log.finish_with("processing aborted");
        assert!(log.text().ends_with("processing aborted\n"));
        assert!(log.text().chars().count() <= 24);
    }
}
