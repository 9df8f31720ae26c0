//! Whitespace token stream over a line reader.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::BufRead;

use tracing::warn;

use crate::application::{ApplicationError, ApplicationResult};

/// Yields whitespace-separated tokens, reading one line at a time.
pub struct Tokens<R> {
    reader: R,
    pending: VecDeque<String>,
    line: usize,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            line: 0,
        }
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> ApplicationResult<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            let mut buf = Vec::new();
            let read = self
                .reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| ApplicationError::io(format!("read input line {}", self.line + 1), e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;
            // Invalid UTF-8 becomes U+FFFD; such tokens never parse as
            // keywords or ids, so the command loop skips them.
            let line = String::from_utf8_lossy(&buf);
            if matches!(line, Cow::Owned(_)) {
                warn!(line = self.line, "input line is not valid UTF-8");
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }
    }

    /// Puts a token back so the next call returns it again.
    pub fn push_back(&mut self, token: String) {
        self.pending.push_front(token);
    }

    /// Number of input lines consumed so far.
    pub fn line(&self) -> usize {
        self.line
    }
}
