//! Delimiter-balanced span extraction
//!
//! Locates an embedded structured object (typically JSON) inside free-form
//! log text by counting opening and closing delimiters.
//!
//! Counting is naive: delimiter characters that occur inside quoted string
//! values of the payload are counted like any other. A payload such as
//! `{"msg": "a } b"}` therefore yields a span that ends early and fails to
//! decode downstream. That is a known limitation of the log format handling,
//! surfaced as a malformed payload rather than guessed around.

/// Byte range of an extracted span, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Borrow the spanned text
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Find the shortest balanced span starting at the first `open` at or after
/// `offset`.
///
/// Returns `None` when `offset` is past the end or not on a character
/// boundary, when no `open` follows it, or when the text ends before the
/// nesting depth returns to zero.
pub fn balanced_span(text: &str, offset: usize, open: char, close: char) -> Option<Span> {
    let tail = text.get(offset..)?;
    let start = offset + tail.find(open)?;

    let mut depth: usize = 0;
    for (idx, ch) in text[start..].char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(Span {
                    start,
                    end: start + idx + ch.len_utf8(),
                });
            }
        }
    }

    None
}

/// Balanced `{ ... }` object starting at or after `offset`
pub fn object_after(text: &str, offset: usize) -> Option<&str> {
    balanced_span(text, offset, '{', '}').map(|span| span.slice(text))
}
