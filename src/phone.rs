//! Phone number normalization shared by the lookup and call-placing paths.
//!
//! Numbers are pushed into an E.164-like shape using a small table of
//! dialing codes. Validation is deliberately loose: only the total digit
//! count is checked, there are no per-region national number lengths.

const DEFAULT_COUNTRY_CODE: &str = "1";

const COUNTRY_CODES: &[(&str, &str)] = &[
    ("India", "91"),
    ("United Kingdom", "44"),
    ("United States", "1"),
    ("China", "86"),
    ("Japan", "81"),
    ("Australia", "61"),
    ("Germany", "49"),
    ("France", "33"),
    ("Canada", "1"),
];

pub const MIN_DIGITS: usize = 10;
pub const MAX_DIGITS: usize = 15;

/// Dialing code for a country name, `"1"` when the country is not in the table.
pub fn country_code(country: &str) -> &'static str {
    let country = country.trim();
    COUNTRY_CODES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(country))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_COUNTRY_CODE)
}

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn normalize(raw: &str, country: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    if raw.starts_with('+') {
        return raw.to_string();
    }

    let digits = digits_of(raw);
    if let Some(rest) = digits.strip_prefix("00") {
        return format!("+{rest}");
    }
    let cc = country_code(country);
    match digits.strip_prefix('0') {
        Some(rest) => format!("+{cc}{rest}"),
        None => format!("+{cc}{digits}"),
    }
}

pub fn validate(phone: &str) -> bool {
    (MIN_DIGITS..=MAX_DIGITS).contains(&digits_of(phone).len())
}
