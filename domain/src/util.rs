//! Shared utility functions.

/// Shorten `s` to at most `max_chars` characters for log previews.
///
/// An ellipsis is appended when anything was cut. Counting is done in
/// characters, so multi-byte text is never split.
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((end, _)) => format!("{}…", &s[..end]),
    }
}

/// Round `value` to `decimals` places (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_string_unchanged() {
        assert_eq!(preview("deal!", 10), "deal!");
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        assert_eq!(preview("あのね", 2), "あの…");
        assert_eq!(preview("hello world", 5), "hello…");
    }

    #[test]
    fn preview_exact_length() {
        assert_eq!(preview("abc", 3), "abc");
    }

    #[test]
    fn round_to_six_places() {
        assert_eq!(round_to(12.345_678_9, 6), 12.345_679);
        assert_eq!(round_to(1000.0, 6), 1000.0);
    }
}
