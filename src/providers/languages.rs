pub const LANGUAGES: &[(&str, &str)] = &[
    ("Chinese", "zh"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("English", "en"),
    ("French", "fr"),
    ("German", "de"),
    ("Greek", "el"),
    ("Italian", "it"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Lithuanian", "lt"),
    ("Macedonian", "mk"),
    ("Norwegian", "nb"),
    ("Polish", "pl"),
    ("Portuguese", "pt"),
    ("Romanian", "ro"),
    ("Russian", "ru"),
    ("Spanish", "es"),
    ("Swedish", "sv"),
];

/// Accepts a language code or English name, case-insensitively.
pub fn language_code(language: &str) -> Option<&'static str> {
    let language = language.trim();
    LANGUAGES
        .iter()
        .find(|(name, code)| name.eq_ignore_ascii_case(language) || code.eq_ignore_ascii_case(language))
        .map(|(_, code)| *code)
}

pub fn code_or_english(language: &str) -> &'static str {
    match language_code(language) {
        Some(code) => code,
        None => {
            if !language.trim().is_empty() {
                tracing::warn!("Invalid language: {} - using default en", language);
            }
            "en"
        }
    }
}
