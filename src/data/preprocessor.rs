// ============================================================
// Layer 4 — Utterance Preprocessor
// ============================================================
// Normalises one raw dialog utterance before tokenisation.
//
// Cleaning steps (applied in order):
//   1. Replace Unicode whitespace variants with plain space
//   2. Replace control characters with space
//   3. Lowercase
//   4. Collapse runs of spaces into one
//   5. Trim both ends
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

pub struct Preprocessor;

impl Preprocessor {
    /// Create a new Preprocessor instance
    pub fn new() -> Self {
        Self
    }

    /// Clean a raw utterance. Takes a &str and returns an owned String.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true; // swallows leading spaces

        for c in text.chars().flat_map(char::to_lowercase) {
            let c = match c {
                '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space can survive the loop
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello   world"), "hello world");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello world  "), "hello world");
    }

    #[test]
    fn test_removes_control_chars_and_nbsp() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\x01world\u{00A0}again\r\n"), "hello world again");
    }

    #[test]
    fn test_unicode_spaces_separate_words() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hi\u{2003}there\u{3000}you\u{200B}too"), "hi there you too");
    }

    #[test]
    fn test_lowercases() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("They do NOT!"), "they do not!");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert_eq!(p.clean(" \t "), "");
    }
}
