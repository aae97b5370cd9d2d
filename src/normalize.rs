//! Case- and diacritic-insensitive text comparison.
//!
//! Subjects arrive in several languages ("código", "Código", "CODIGO"), so every
//! hint, keyword and address comparison in this crate goes through [`fold`].

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Folds text to a comparison form: NFD-decomposed, combining marks removed, lowercased.
///
/// ```
/// use streamcode_scan::normalize::fold;
///
/// assert_eq!(fold("Código de Verificação"), "codigo de verificacao");
/// ```
#[must_use]
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns `true` if `needle` occurs in `haystack` after folding both.
///
/// An empty needle always matches.
#[must_use]
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(&fold(needle))
}
