//! Occurrence correlation
//!
//! Request and response payloads in the install-set log share the server
//! identifier: the first occurrence introduces the request, the second one
//! precedes the install-set response. Locating the response sits behind
//! [`ResponseLocator`] so a more structured source can replace the
//! positional rule without touching record aggregation.

use crate::errors::AnalyzerError;
use crate::extract::span::object_after;

/// Byte offsets of every non-overlapping occurrence of `literal`, in order
pub fn find_all(text: &str, literal: &str) -> Vec<usize> {
    if literal.is_empty() {
        return Vec::new();
    }
    text.match_indices(literal).map(|(idx, _)| idx).collect()
}

/// Offset of the `n`th occurrence (zero based)
pub fn nth_occurrence(text: &str, literal: &str, n: usize) -> Option<usize> {
    if literal.is_empty() {
        return None;
    }
    text.match_indices(literal).nth(n).map(|(idx, _)| idx)
}

/// Locates the raw install-set response payload for one server
pub trait ResponseLocator: Send + Sync {
    fn locate<'a>(&self, text: &'a str, server: &str) -> Result<&'a str, AnalyzerError>;
}

/// Takes the object following the second occurrence of the server identifier
#[derive(Debug, Clone, Copy, Default)]
pub struct SecondOccurrence;

impl ResponseLocator for SecondOccurrence {
    fn locate<'a>(&self, text: &'a str, server: &str) -> Result<&'a str, AnalyzerError> {
        let positions = find_all(text, server);
        if positions.len() < 2 {
            return Err(AnalyzerError::AmbiguityFailure(format!(
                "expected at least two occurrences of {}, found {}",
                server,
                positions.len()
            )));
        }

        object_after(text, positions[1]).ok_or_else(|| {
            AnalyzerError::MalformedPayload(format!(
                "no balanced object after second occurrence of {}",
                server
            ))
        })
    }
}
