//! Locale-aware normalization of scraped number strings.

use thiserror::Error;

/// Error returned when a scraped string cannot be parsed as a number.
///
/// Carries the text as it looked after separator substitution, which is
/// what the float parser actually saw.
#[derive(Debug, Error)]
#[error("error parsing value '{value}' to a float: {source}")]
pub struct NormalizeError {
    /// The value after separator substitution.
    pub value: String,
    #[source]
    pub source: std::num::ParseFloatError,
}

/// Convert a locale-formatted number string into an `f64`.
///
/// Non-breaking spaces are replaced with regular spaces first, then every
/// occurrence of the thousands separator is removed, then every occurrence
/// of the decimal separator is rewritten to `.`. The order matters: with
/// `thousands_separator = "."` and `decimal_separator = ","`, the dots must
/// be gone before the comma becomes one.
pub fn normalize(
    value: &str,
    thousands_separator: &str,
    decimal_separator: &str,
) -> Result<f64, NormalizeError> {
    let mut value = value.replace('\u{a0}', " ");

    // Empty separators would match between every character
    if !thousands_separator.is_empty() {
        value = value.replace(thousands_separator, "");
    }
    if !decimal_separator.is_empty() {
        value = value.replace(decimal_separator, ".");
    }

    value
        .parse::<f64>()
        .map_err(|source| NormalizeError { value, source })
}
