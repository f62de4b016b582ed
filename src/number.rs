//! Numeric text handling with the same results a browser script would see.

use std::sync::OnceLock;

use fancy_regex::Regex;

use crate::{Error, Result};

// ASCII digits only; other Unicode decimal digits are not numeric literals.
const FLOAT_PREFIX_PATTERN: &str =
    r"^[+-]?(?:Infinity|(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)";

fn float_prefix_regex() -> Result<&'static Regex> {
    static REGEX: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    REGEX
        .get_or_init(|| Regex::new(FLOAT_PREFIX_PATTERN).map_err(|err| err.to_string()))
        .as_ref()
        .map_err(|msg| Error::NumberPattern(msg.clone()))
}

/// Parses the longest leading decimal literal of `text`, like `parseFloat`.
///
/// Leading whitespace is skipped and trailing garbage ignored, so `" 12px"`
/// reads as `12`. Returns `None` when no literal starts the text.
pub fn parse_float_prefix(text: &str) -> Result<Option<f64>> {
    let trimmed = text.trim_start();
    let Some(matched) = float_prefix_regex()?
        .find(trimmed)
        .map_err(|err| Error::NumberPattern(err.to_string()))?
    else {
        return Ok(None);
    };

    let literal = matched.as_str();
    let value = match literal.trim_start_matches(['+', '-']) {
        "Infinity" if literal.starts_with('-') => f64::NEG_INFINITY,
        "Infinity" => f64::INFINITY,
        _ => literal
            .parse::<f64>()
            .map_err(|err| Error::NumberPattern(format!("{literal}: {err}")))?,
    };
    Ok(Some(value))
}

/// Formats `value` the way number-to-string conversion does in a browser:
/// `25`, `0.5`, `-Infinity`, `NaN`, `1e+21`, `1.5e-7`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if value == 0.0 {
        // Covers -0 as well.
        return "0".into();
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{value}");
    }

    let exponential = format!("{value:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}
