//! AT line normalisation and tokenizing.
//!
//! A URC payload is copied once into a bounded [`AtLine`], normalised in
//! place (whitespace and quote stripping), and then walked with a [`Tokens`]
//! cursor. Tokens are views into the line and never outlive the handler call
//! that produced them.

use heapless::String;

use crate::config::MAX_URC_LINE_LEN;
use crate::error::AtError;

/// Bounded, owned copy of one AT line.
#[derive(Debug, Clone)]
pub struct AtLine<const N: usize = MAX_URC_LINE_LEN> {
    buf: String<N>,
}

impl<const N: usize> AtLine<N> {
    /// Copy `line` into the buffer. Lines that do not fit are rejected, never
    /// truncated.
    pub fn new(line: &str) -> Result<Self, AtError> {
        let mut buf = String::new();
        buf.push_str(line).map_err(|_| AtError::BadParameter)?;
        Ok(Self { buf })
    }

    pub fn as_str(&self) -> &str {
        self.buf.as_str()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Strip every whitespace character, wherever it is.
    pub fn remove_all_whitespace(&mut self) {
        self.retain(|c| !c.is_ascii_whitespace());
    }

    /// Strip whitespace at the start of the line only, leaving the rest
    /// intact for a later specialised parse.
    pub fn remove_leading_whitespace(&mut self) {
        let skip = self.buf.len()
            - self
                .buf
                .trim_start_matches(|c: char| c.is_ascii_whitespace())
                .len();
        if skip > 0 {
            let mut i = 0;
            self.retain(|_| {
                i += 1;
                i > skip
            });
        }
    }

    pub fn remove_all_double_quotes(&mut self) {
        self.retain(|c| c != '"');
    }

    /// Comma separated token cursor over the current content.
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens::new(self.as_str())
    }

    fn retain(&mut self, mut f: impl FnMut(char) -> bool) {
        let mut out = String::<N>::new();
        for c in self.buf.chars() {
            if f(c) {
                // The result is never longer than the source
                let _ = out.push(c);
            }
        }
        self.buf = out;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delimiter {
    /// A single `,` separates tokens; empty tokens are preserved.
    Comma,
    /// Any run of whitespace separates tokens.
    Whitespace,
}

/// Cursor handing out delimiter-bounded tokens of a line.
#[derive(Debug, Clone)]
pub struct Tokens<'l> {
    rest: Option<&'l str>,
    delimiter: Delimiter,
}

fn is_space(c: char) -> bool {
    c.is_ascii_whitespace()
}

impl<'l> Tokens<'l> {
    pub fn new(line: &'l str) -> Self {
        Self::with_delimiter(line, Delimiter::Comma)
    }

    pub fn with_delimiter(line: &'l str, delimiter: Delimiter) -> Self {
        let rest = match delimiter {
            Delimiter::Comma => line,
            Delimiter::Whitespace => line.trim_start_matches(is_space),
        };
        Self {
            rest: Some(rest),
            delimiter,
        }
    }

    /// Return the next token and advance past it. Fails once the line is
    /// exhausted. A zero-length token is returned as `""`; it is up to the
    /// caller to reject it where a value is required.
    pub fn next_token(&mut self) -> Result<&'l str, AtError> {
        let rest = self.rest.ok_or(AtError::Error)?;

        match self.delimiter {
            Delimiter::Comma => match rest.split_once(',') {
                Some((token, tail)) => {
                    self.rest = Some(tail);
                    Ok(token)
                }
                None => {
                    self.rest = None;
                    Ok(rest)
                }
            },
            Delimiter::Whitespace => {
                if rest.is_empty() {
                    self.rest = None;
                    return Err(AtError::Error);
                }
                match rest.find(is_space) {
                    Some(end) => {
                        self.rest = Some(rest[end..].trim_start_matches(is_space));
                        Ok(&rest[..end])
                    }
                    None => {
                        self.rest = None;
                        Ok(rest)
                    }
                }
            }
        }
    }

    /// Next token parsed as a base 10 signed integer.
    pub fn next_int(&mut self) -> Result<i32, AtError> {
        parse_signed_int(self.next_token()?, 10)
    }

    /// Everything not yet handed out, unsplit.
    pub fn remainder(&self) -> &'l str {
        self.rest.unwrap_or("")
    }

    pub fn is_exhausted(&self) -> bool {
        self.rest.is_none()
    }
}

/// Parse a token as a signed 32-bit integer. Non-numeric content, empty
/// tokens and overflow are errors; nothing is clamped.
pub fn parse_signed_int(token: &str, radix: u32) -> Result<i32, AtError> {
    if !(2..=36).contains(&radix) {
        return Err(AtError::BadParameter);
    }
    if token.is_empty() {
        return Err(AtError::Error);
    }
    i32::from_str_radix(token, radix).map_err(|_| AtError::Error)
}
