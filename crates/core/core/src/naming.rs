//! Identifier canonicalization.
//!
//! Turns arbitrary repository or collection names into identifiers accepted
//! by the hosting platform. Two grammars are supported:
//!
//! - domain-style names: `[a-z0-9.-]`, at most [`MAX_NAME_LENGTH`] bytes;
//! - label-style names: `[A-Za-z0-9._-]`, at most [`MAX_LABEL_LENGTH`] bytes.
//!
//! Both transforms are total: they never fail and only return an empty string
//! for empty input.

/// Maximum length of a domain-style name.
pub const MAX_NAME_LENGTH: usize = 253;

/// Maximum length of a label-style name.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Returned by [`to_label`] when both halves canonicalize to nothing.
pub const NO_LABEL: &str = "nolabel";

/// A target naming grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// Lowercase DNS-style names.
    Domain,
    /// Mixed-case label values.
    Label,
}

impl Grammar {
    /// Maximum output length for this grammar.
    pub fn max_length(self) -> usize {
        match self {
            Grammar::Domain => MAX_NAME_LENGTH,
            Grammar::Label => MAX_LABEL_LENGTH,
        }
    }

    fn is_alphanumeric(self, ch: u8) -> bool {
        match self {
            Grammar::Domain => ch.is_ascii_lowercase() || ch.is_ascii_digit(),
            Grammar::Label => ch.is_ascii_alphanumeric(),
        }
    }

    fn is_valid(self, ch: u8) -> bool {
        if ch == b'.' || ch == b'-' || self.is_alphanumeric(ch) {
            return true;
        }
        self == Grammar::Label && ch == b'_'
    }

    /// Rewrites `input` so that it satisfies this grammar.
    pub fn canonicalize(self, input: &str) -> String {
        let lowered;
        let source = match self {
            Grammar::Domain => {
                lowered = input.to_lowercase();
                lowered.as_bytes()
            }
            Grammar::Label => input.as_bytes(),
        };

        let mut out = Vec::with_capacity(source.len() + 2);
        for (i, &ch) in source.iter().enumerate() {
            if i == 0 && !self.is_alphanumeric(ch) {
                out.push(b'0');
            }
            out.push(if self.is_valid(ch) { ch } else { b'.' });
        }

        if self == Grammar::Domain {
            collapse_dots(&mut out);
        }

        let max = self.max_length();
        out.truncate(max);
        let Some(&last) = out.last() else {
            return String::new();
        };
        if !self.is_alphanumeric(last) {
            if out.len() < max - 1 {
                out.push(b'0');
            } else {
                let keep = out.len() - 2;
                out.truncate(keep);
                out.push(b'0');
            }
        }

        // Every byte written above is ASCII.
        String::from_utf8(out).unwrap_or_default()
    }
}

fn collapse_dots(bytes: &mut Vec<u8>) {
    bytes.dedup_by(|current, previous| *current == b'.' && *previous == b'.');
}

/// Converts `name` to a domain-style name.
///
/// The result is lower case, starts and ends with `[a-z0-9]`, contains only
/// `[a-z0-9.-]`, never contains `..`, and is at most 253 bytes.
pub fn to_domain_name(name: &str) -> String {
    Grammar::Domain.canonicalize(name)
}

/// Converts `name` to a label-style name.
///
/// The result starts and ends with `[A-Za-z0-9]`, contains only
/// `[A-Za-z0-9._-]`, and is at most 63 bytes.
pub fn to_label_name(name: &str) -> String {
    Grammar::Label.canonicalize(name)
}

/// Converts `prefix/name` to a label key.
///
/// The text before the first `/` becomes a domain-style prefix, the text
/// after it a label-style name. Empty halves are dropped; if both are empty
/// the result is [`NO_LABEL`].
pub fn to_label(input: &str) -> String {
    let (prefix, label) = match input.split_once('/') {
        Some((prefix, label)) => (prefix, label),
        None => ("", input),
    };

    let prefix = to_domain_name(prefix);
    let label = to_label_name(label);
    match (prefix.is_empty(), label.is_empty()) {
        (true, true) => NO_LABEL.to_string(),
        (true, false) => label,
        (false, true) => prefix,
        (false, false) => format!("{}/{}", prefix, label),
    }
}
