//! Supported narration/translation languages.
//!
//! The list is echoed back to the backend as-is; the backend remains the
//! source of truth for which codes it actually accepts.

use serde::Serialize;

/// Language used until the user picks another one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// A selectable language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    /// Display name.
    pub name: &'static str,
    /// Short code sent to the backend.
    pub code: &'static str,
}

/// All supported languages, in display order.
pub const LANGUAGES: &[LanguageOption] = &[
    LanguageOption { name: "English", code: "en" },
    LanguageOption { name: "Hindi", code: "hi" },
    LanguageOption { name: "Tamil", code: "ta" },
    LanguageOption { name: "Telugu", code: "te" },
    LanguageOption { name: "Bengali", code: "bn" },
    LanguageOption { name: "Marathi", code: "mr" },
    LanguageOption { name: "Gujarati", code: "gu" },
    LanguageOption { name: "Kannada", code: "kn" },
    LanguageOption { name: "Malayalam", code: "ml" },
];

/// Look up a language by its code.
pub fn find_by_code(code: &str) -> Option<&'static LanguageOption> {
    LANGUAGES.iter().find(|l| l.code == code)
}

/// Display name for a code, or the code itself when it is not registered.
pub fn display_name(code: &str) -> &str {
    find_by_code(code).map(|l| l.name).unwrap_or(code)
}

/// Whether the code is in the registry.
pub fn is_supported(code: &str) -> bool {
    find_by_code(code).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_keeps_declaration_order() {
        let codes: Vec<&str> = LANGUAGES.iter().map(|l| l.code).collect();
        assert_eq!(
            codes,
            ["en", "hi", "ta", "te", "bn", "mr", "gu", "kn", "ml"]
        );
    }

    #[test]
    fn codes_are_unique() {
        for (i, a) in LANGUAGES.iter().enumerate() {
            for b in &LANGUAGES[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }

    #[test]
    fn lookup() {
        assert_eq!(find_by_code("ta").map(|l| l.name), Some("Tamil"));
        assert!(find_by_code("fr").is_none());
        assert_eq!(display_name("kn"), "Kannada");
        assert_eq!(display_name("fr"), "fr");
        assert!(is_supported(DEFAULT_LANGUAGE));
        assert!(!is_supported(""));
    }
}
