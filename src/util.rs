//! Number conversions shared by the argument checker and the hint formatter.
//!
//! Scripts and hints follow the number conventions of the editor the language was
//! born in: lenient literal parsing, integers printed without a fraction, `-0`
//! printed as `0`, and exponent notation from `1e21` upwards.

/// Parse a numeric argument token.
///
/// Accepts decimal literals (optional sign, fraction, exponent), `Infinity` with an
/// optional sign and unsigned `0x`/`0o`/`0b` integers. Surrounding whitespace is
/// ignored and an empty token is zero. Returns `None` for anything else, including
/// `NaN` and Rust-only spellings such as `inf`.
pub fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return Some(0.0);
    }

    match token {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    if let Some(value) = parse_radix_literal(token) {
        return value;
    }

    let decimal_chars = token
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal_chars {
        return None;
    }
    token.parse::<f64>().ok()
}

/// `Some(result)` when the token carries a radix prefix, `None` when it does not.
fn parse_radix_literal(token: &str) -> Option<Option<f64>> {
    let (radix, digits) = if let Some(d) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        (16, d)
    } else if let Some(d) = token.strip_prefix("0o").or_else(|| token.strip_prefix("0O")) {
        (8, d)
    } else if let Some(d) = token.strip_prefix("0b").or_else(|| token.strip_prefix("0B")) {
        (2, d)
    } else {
        return None;
    };

    if digits.is_empty() {
        return Some(None);
    }
    Some(digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix)
            .map(|d| acc * f64::from(radix) + f64::from(d))
    }))
}

/// Format a number the way coordinate hints display it.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{value}");
    }

    let exp = format!("{value:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if power.starts_with('-') => format!("{mantissa}e{power}"),
        Some((mantissa, power)) => format!("{mantissa}e+{power}"),
        None => exp,
    }
}

/// Sign of a number with `sign(0) == 0`, unlike [`f64::signum`].
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        value
    }
}
