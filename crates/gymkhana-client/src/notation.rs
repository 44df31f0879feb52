//! Locale numeral repair for raw telegrams.
//!
//! The simulator serializes floats with the host OS locale, so a telegram
//! can arrive as `{"cte":1,2}` where `{"cte":1.2}` was meant. The repair
//! runs before JSON parsing and rewrites comma decimals to dots wherever a
//! numeral sits directly after a quoted field name.
//!
//! Matching is deliberately raw-substring, with no awareness of JSON
//! nesting: the real protocol keeps numeric fields as top-level scalars, so
//! a tokenizer would buy nothing here.

// ---------------------------------------------------------------------------
// Character classes
// ---------------------------------------------------------------------------

const fn is_field_char(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

/// Digits, comma, uppercase `E`, and minus. Dot is excluded on purpose:
/// an already well-formed numeral never matches, which makes the repair
/// idempotent.
const fn is_numeral_char(byte: u8) -> bool {
    byte.is_ascii_digit() || byte == b',' || byte == b'E' || byte == b'-'
}

// ---------------------------------------------------------------------------
// normalize_float_notation
// ---------------------------------------------------------------------------

/// Rewrite comma decimals in `raw` to dot decimals.
///
/// Two passes over the text, each looking for `"<field>":<numeral>` where
/// `<field>` is one or more ASCII letters or underscores and `<numeral>` is
/// a run of numeral characters:
///
/// 1. numeral bounded by a following comma — the captured numeral extends
///    to the last comma of the run, which serves as the bound;
/// 2. numeral bounded by a following closing brace — the whole run is
///    captured.
///
/// Commas inside a captured numeral become dots; nothing else changes, and
/// edits never move bytes. Zero matches is a no-op.
///
/// # Example
///
/// ```
/// use gymkhana_client::notation::normalize_float_notation;
///
/// let fixed = normalize_float_notation(r#"{"cte":4,57,"speed":1,2}"#);
/// assert_eq!(fixed, r#"{"cte":4.57,"speed":1.2}"#);
/// ```
#[must_use]
pub fn normalize_float_notation(raw: &str) -> String {
    let mut bytes = raw.as_bytes().to_vec();
    repair_pass(&mut bytes, Bound::Comma);
    repair_pass(&mut bytes, Bound::Brace);
    // Only single ASCII bytes were flipped, so the text is still UTF-8.
    String::from_utf8(bytes).expect("comma-to-dot rewrite preserves UTF-8")
}

/// Delimiter that bounds a captured numeral in one repair pass.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Bound {
    Comma,
    Brace,
}

fn repair_pass(bytes: &mut [u8], bound: Bound) {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'"' {
            i += 1;
            continue;
        }

        // Field name: one or more field chars, closing quote, colon.
        let mut j = i + 1;
        while j < bytes.len() && is_field_char(bytes[j]) {
            j += 1;
        }
        if j == i + 1 || j + 1 >= bytes.len() || bytes[j] != b'"' || bytes[j + 1] != b':' {
            i += 1;
            continue;
        }

        // Maximal run of numeral chars after the colon.
        let start = j + 2;
        let mut end = start;
        while end < bytes.len() && is_numeral_char(bytes[end]) {
            end += 1;
        }

        let Some(resume) = repair_run(bytes, start, end, bound) else {
            i += 1;
            continue;
        };
        i = resume;
    }
}

/// Apply the bound rule to the run at `bytes[start..end]`. On a match,
/// flips the captured commas and returns the position right after the
/// consumed match; on no match, returns None.
fn repair_run(bytes: &mut [u8], start: usize, end: usize, bound: Bound) -> Option<usize> {
    match bound {
        Bound::Comma => {
            // Capture up to the last comma of the run; that comma is the
            // bound. The capture must be non-empty.
            let last_comma = bytes[start..end].iter().rposition(|&b| b == b',')?;
            if last_comma == 0 {
                return None;
            }
            dot_commas(&mut bytes[start..start + last_comma]);
            Some(start + last_comma + 1)
        }
        Bound::Brace => {
            // The whole run is captured, only when a brace follows it.
            if end == start || end >= bytes.len() || bytes[end] != b'}' {
                return None;
            }
            dot_commas(&mut bytes[start..end]);
            Some(end + 1)
        }
    }
}

fn dot_commas(run: &mut [u8]) {
    for byte in run {
        if *byte == b',' {
            *byte = b'.';
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
