//! Masked line entry for the API key.
//!
//! [`SecretMask`] is a rustyline helper whose highlighter draws every character of the
//! line as `*` while masking is on.  The editor still holds the real text; only what
//! reaches the terminal changes.

use std::borrow::Cow;

use rustyline::Helper;
use rustyline::completion::Completer;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::validate::Validator;

const MASK_CHAR: char = '*';

/// Line editor helper that can hide the line being typed.
#[derive(Debug, Default)]
pub struct SecretMask {
    masking: bool,
}

impl SecretMask {
    /// Creates a helper with masking off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns masking on or off for subsequent redraws.
    pub fn set_masking(&mut self, masking: bool) {
        self.masking = masking;
    }

    /// True while typed text is hidden.
    pub fn is_masking(&self) -> bool {
        self.masking
    }
}

/// Replaces every character of `line` with the mask character.
pub fn mask(line: &str) -> String {
    line.chars().map(|_| MASK_CHAR).collect()
}

impl Highlighter for SecretMask {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if self.masking {
            Cow::Owned(mask(line))
        } else {
            Cow::Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        self.masking
    }
}

impl Completer for SecretMask {
    type Candidate = String;
}

impl Hinter for SecretMask {
    type Hint = String;
}

impl Validator for SecretMask {}

impl Helper for SecretMask {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_line_hides_every_character() {
        let mut helper = SecretMask::new();
        helper.set_masking(true);
        assert!(helper.is_masking());
        assert_eq!(helper.highlight("sk-abc123", 9), "*********");
        assert_eq!(helper.highlight("", 0), "");
        assert!(helper.highlight_char("sk", 2, CmdKind::Other));
    }

    #[test]
    fn unmasked_line_is_unchanged() {
        let helper = SecretMask::new();
        assert!(!helper.is_masking());
        assert!(matches!(helper.highlight("Hello", 5), Cow::Borrowed("Hello")));
        assert!(!helper.highlight_char("Hello", 5, CmdKind::Other));
    }

    #[test]
    fn mask_counts_characters_not_bytes() {
        assert_eq!(mask("clé"), "***");
    }
}
