//! Locale-tolerant number parsing
//!
//! Stock exports use a comma as the decimal separator and dots as thousands
//! separators ("1.929,00"), while hand-typed values are often plain ("8",
//! "449.5"). Everything funnels through [`parse_number`].

use thiserror::Error;

/// How malformed numeric text is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberPolicy {
    /// Malformed or empty input yields 0 and never fails
    #[default]
    Tolerant,
    /// Malformed or empty input is reported as an error
    Strict,
}

/// Errors surfaced by [`NumberPolicy::Strict`] parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("no number given")]
    Empty,

    #[error("'{0}' is not a valid number")]
    Invalid(String),
}

/// Parse a locale-formatted number, falling back to 0 on anything unparseable
///
/// ```
/// use tally::core::number::parse_locale_number;
///
/// assert_eq!(parse_locale_number("1.929,00"), 1929.0);
/// assert_eq!(parse_locale_number("449,5"), 449.5);
/// assert_eq!(parse_locale_number("abc"), 0.0);
/// ```
pub fn parse_locale_number(raw: &str) -> f64 {
    parse_number(raw, NumberPolicy::Tolerant).unwrap_or(0.0)
}

/// Parse a locale-formatted number under the given policy
pub fn parse_number(raw: &str, policy: NumberPolicy) -> Result<f64, NumberError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return match policy {
            NumberPolicy::Tolerant => Ok(0.0),
            NumberPolicy::Strict => Err(NumberError::Empty),
        };
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if policy == NumberPolicy::Strict {
        let foreign = trimmed
            .chars()
            .any(|c| !(c.is_ascii_digit() || c.is_whitespace() || matches!(c, ',' | '.' | '-' | '+')));
        if foreign {
            return Err(NumberError::Invalid(trimmed.to_string()));
        }
    }

    let parsed = normalize_separators(&cleaned)
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite());

    match (parsed, policy) {
        (Some(n), _) => Ok(n),
        (None, NumberPolicy::Tolerant) => Ok(0.0),
        (None, NumberPolicy::Strict) => Err(NumberError::Invalid(trimmed.to_string())),
    }
}

/// Rewrite comma-decimal text into dot-decimal text
///
/// When a comma is present, dots are thousands separators and the last comma
/// is the decimal point. Without a comma the text is already dot-decimal.
fn normalize_separators(cleaned: &str) -> String {
    let Some(decimal_at) = cleaned.rfind(',') else {
        return cleaned.to_string();
    };

    let (whole, fraction) = cleaned.split_at(decimal_at);
    let whole: String = whole.chars().filter(|c| !matches!(c, '.' | ',')).collect();
    let fraction: String = fraction[1..].chars().filter(|c| *c != '.').collect();
    format!("{}.{}", whole, fraction)
}

/// Render a number with a comma as decimal separator ("2.5" -> "2,5")
pub fn to_comma_decimal(n: f64) -> String {
    n.to_string().replacen('.', ",", 1)
}

/// Render money with two decimals and a comma separator ("5" -> "5,00")
pub fn format_money(n: f64) -> String {
    format!("{:.2}", n).replacen('.', ",", 1)
}
