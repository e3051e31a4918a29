//! Upload placeholders
//!
//! While an image uploads, a placeholder image link stands in for it:
//!
//! ```text
//! ![uploading...](1k3.a8f2)
//! ```
//!
//! The token is a random number rendered in base 36 and cut to
//! [`TOKEN_LEN`] characters. Nothing checks tokens for uniqueness. Scaling by
//! [`TOKEN_RANGE`] leaves an integer part of up to three base-36 digits and at
//! least four fractional digits, so a single paste session practically never
//! sees two equal tokens.

use std::fmt;

/// Maximum token length
pub const TOKEN_LEN: usize = 8;

/// Range the random fraction is scaled by before rendering
pub const TOKEN_RANGE: f64 = 10086.0;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a fresh placeholder token
pub fn generate_token() -> String {
    let fraction: f64 = rand::random();
    to_base36(fraction * TOKEN_RANGE, TOKEN_LEN)
}

/// Render a non-negative number in base 36, integer digits then fraction,
/// keeping at most `max_len` characters.
fn to_base36(value: f64, max_len: usize) -> String {
    let mut integer = value.trunc() as u64;
    let mut fraction = value.fract();

    let mut int_digits = Vec::new();
    loop {
        int_digits.push(DIGITS[(integer % 36) as usize]);
        integer /= 36;
        if integer == 0 {
            break;
        }
    }
    int_digits.reverse();

    let mut out: String = int_digits.into_iter().map(char::from).collect();
    if fraction > 0.0 && out.len() + 1 < max_len {
        out.push('.');
        while out.len() < max_len && fraction > 0.0 {
            fraction *= 36.0;
            let digit = fraction.trunc().min(35.0);
            out.push(char::from(DIGITS[digit as usize]));
            fraction -= digit;
        }
    }
    out.truncate(max_len);
    out
}

/// A placeholder for one in-flight upload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    token: String,
}

impl Placeholder {
    /// Placeholder with a freshly generated token
    pub fn new() -> Self {
        Self::with_token(generate_token())
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Text inserted at the cursor, including the trailing newline
    pub fn text(&self) -> String {
        format!("![uploading...]({})\n", self.token)
    }

    /// Text searched for when the upload finishes
    pub fn target(&self) -> String {
        self.text().trim().to_string()
    }
}

impl Default for Placeholder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text().trim_end())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_to_base36_integer() {
        assert_eq!(to_base36(0.0, 8), "0");
        assert_eq!(to_base36(35.0, 8), "z");
        assert_eq!(to_base36(36.0, 8), "10");
        assert_eq!(to_base36(10085.0, 8), "7s5");
    }

    #[test]
    fn test_to_base36_fraction() {
        assert_eq!(to_base36(0.5, 8), "0.i");
        assert_eq!(to_base36(36.25, 8), "10.9");
        // 1/7 never terminates in base 36, so the cut applies
        assert_eq!(to_base36(1.0 / 7.0, 8).len(), 8);
        assert_eq!(to_base36(10085.5, 8), "7s5.i");
    }

    #[test]
    fn test_token_shape() {
        for _ in 0..1000 {
            let token = generate_token();
            assert!(!token.is_empty());
            assert!(token.len() <= TOKEN_LEN);
            assert!(
                token
                    .chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '.'),
                "unexpected token {token}"
            );
        }
    }

    #[test]
    fn test_token_collisions_are_rare() {
        let mut seen = HashSet::new();
        let mut collisions = 0;
        for _ in 0..10_000 {
            if !seen.insert(generate_token()) {
                collisions += 1;
            }
        }
        // Expected count is far below one for this token space
        assert!(collisions <= 2, "{collisions} collisions in 10000 tokens");
    }

    #[test]
    fn test_placeholder_text() {
        let placeholder = Placeholder::with_token("1k3.a8f2");
        assert_eq!(placeholder.text(), "![uploading...](1k3.a8f2)\n");
        assert_eq!(placeholder.target(), "![uploading...](1k3.a8f2)");
        assert_eq!(placeholder.to_string(), "![uploading...](1k3.a8f2)");
    }

    #[test]
    fn test_fresh_placeholders_differ() {
        assert_ne!(Placeholder::new(), Placeholder::new());
    }
}
