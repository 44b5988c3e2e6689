//! Parsing of scraped money strings such as `"CN¥1,234.00"`.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static NUMERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,3}(,[0-9]{3})*(\.[0-9]+)?)").expect("static regex is valid")
});

/// Strings the scraper emits for "no figure"; they read as zero.
const ZERO_TOKENS: [&str; 4] = ["--", "Unlimited spending", "\u{2014}", "\u{e2}\u{80}\u{94}"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NumeralError {
    #[error("no numeric value in '{0}'")]
    NoNumber(String),

    #[error("invalid number '{0}'")]
    Invalid(String),
}

/// Currency prefix: the text before the first number (the whole string when
/// it has no number at all).
pub fn parse_currency(raw: &str) -> String {
    match NUMERAL.find(raw) {
        Some(m) => raw[..m.start()].to_string(),
        None => raw.to_string(),
    }
}

/// The first number in `raw`, with thousands separators removed.
pub fn parse_numeral(raw: &str) -> Result<f64, NumeralError> {
    if ZERO_TOKENS.contains(&raw) {
        return Ok(0.0);
    }
    let m = NUMERAL
        .find(raw)
        .ok_or_else(|| NumeralError::NoNumber(raw.to_string()))?;
    m.as_str()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| NumeralError::Invalid(m.as_str().to_string()))
}

/// Both halves at once.
pub fn parse_money(raw: &str) -> Result<(String, f64), NumeralError> {
    Ok((parse_currency(raw), parse_numeral(raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_scraped_amounts() {
        assert_eq!(parse_money("$1").unwrap(), ("$".to_string(), 1.0));
        assert_eq!(parse_money("$1,000.12").unwrap(), ("$".to_string(), 1000.12));
        assert_eq!(parse_money("$789.16").unwrap(), ("$".to_string(), 789.16));
        assert_eq!(parse_money("CN¥1,234.00").unwrap(), ("CN¥".to_string(), 1234.0));
        assert_eq!(parse_money("$1,400.00").unwrap(), ("$".to_string(), 1400.0));
    }

    #[test]
    fn zero_tokens_read_as_zero() {
        for token in ZERO_TOKENS {
            assert_eq!(parse_numeral(token).unwrap(), 0.0);
        }
    }

    #[test]
    fn currency_without_number_is_whole_string() {
        assert_eq!(parse_currency("Unlimited spending"), "Unlimited spending");
        assert_eq!(parse_currency("HK$12"), "HK$");
    }

    #[test]
    fn missing_number_is_an_error() {
        assert_eq!(parse_numeral("n/a"), Err(NumeralError::NoNumber("n/a".to_string())));
    }

    proptest! {
        #[test]
        fn formatted_amounts_round_trip(whole in 0u64..10_000_000_000u64, cents in 0u32..100) {
            let digits = whole.to_string();
            let mut grouped = String::new();
            for (i, ch) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(ch);
            }
            let raw = format!("US${grouped}.{cents:02}");
            let (currency, value) = parse_money(&raw).unwrap();
            prop_assert_eq!(currency, "US$");
            let expected = whole as f64 + cents as f64 / 100.0;
            prop_assert!((value - expected).abs() < 1e-6 * expected.max(1.0));
        }
    }
}
