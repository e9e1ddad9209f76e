//! Small helpers for the interactive driver loop.

use std::time::Duration;

use netlist_ir::Word;

/// Parses an input value typed at the prompt.
///
/// Bare digits are binary; `0b`, `0d` and `0x` select an explicit base.
/// Returns `None` when the text is not a constant at all.
pub fn parse_value(text: &str) -> Option<Word> {
    let (digits, radix) = match text.as_bytes() {
        [b'0', b'b', rest @ ..] if !rest.is_empty() => (&text[2..], 2),
        [b'0', b'd', rest @ ..] if !rest.is_empty() => (&text[2..], 10),
        [b'0', b'x', rest @ ..] if !rest.is_empty() => (&text[2..], 16),
        _ => (text, 2),
    };
    Word::from_str_radix(digits, radix).ok()
}

/// Formats a duration with a unit fitting its magnitude.
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_micros(1) {
        format!("{} ns", duration.as_nanos())
    } else if duration < Duration::from_millis(1) {
        format!("{:.2} µs", duration.as_nanos() as f64 / 1_000.0)
    } else if duration < Duration::from_secs(1) {
        format!("{:.2} ms", duration.as_nanos() as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", duration.as_secs_f64())
    }
}
