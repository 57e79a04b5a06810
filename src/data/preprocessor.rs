// ============================================================
// Layer 4 — Code Preprocessor
// ============================================================
// Normalises raw code text before tokenisation.
//
// Layout (indentation, blank lines, brace placement) is part of
// an author's fingerprint, so unlike prose cleaning this keeps
// tabs, runs of spaces and newlines untouched. Only invisible
// or platform-specific noise is removed:
//
//   1. Windows line endings (\r\n, lone \r) → \n
//   2. Byte order marks and zero-width characters → removed
//   3. Non-breaking spaces → regular space
//   4. Other control characters (except \n and \t) → removed
//   5. Trailing blank lines → removed

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n");

        let mut out = String::with_capacity(unified.len());
        for c in unified.chars() {
            match c {
                '\r' => out.push('\n'),
                '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' => {}
                '\u{00A0}' => out.push(' '),
                '\n' | '\t' => out.push(c),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }

        let trimmed_len = out.trim_end_matches('\n').len();
        out.truncate(trimmed_len);
        out
    }
}
