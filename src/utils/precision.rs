// src/utils/precision.rs
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Парсит цену из текста страницы: "1 234,56 ₽" -> 1234.56.
///
/// Handles space/NBSP thousands separators, comma or dot decimals and
/// `1.234,56` / `1,234.56` mixes. Returns `None` when there are no digits.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let body: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | ',') || c.is_whitespace())
        .filter(|c| !c.is_whitespace())
        .collect();
    let body = body.trim_end_matches(['.', ',']);

    let normalized = match (body.rfind(','), body.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => body.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => body.replace(',', ""),
        (Some(comma), None) if is_thousands_group(body, comma, ',') => body.replace(',', ""),
        (Some(_), None) => body.replace(',', "."),
        (None, Some(dot)) if is_thousands_group(body, dot, '.') => body.replace('.', ""),
        _ => body.to_string(),
    };

    Decimal::from_str(&normalized).ok()
}

/// `1.234.567` or `12,345`: repeated separator, or a single one followed by
/// exactly three digits with a non-zero integer part.
fn is_thousands_group(body: &str, last: usize, sep: char) -> bool {
    if body.matches(sep).count() > 1 {
        return true;
    }
    let int_part = &body[..last];
    body[last + 1..].len() == 3 && !int_part.is_empty() && int_part != "0"
}

/// Округляет цену до копеек.
pub fn normalize_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_russian_formatting() {
        assert_eq!(parse_price("1 234,56 ₽"), Some(dec("1234.56")));
        assert_eq!(parse_price("12\u{a0}990\u{a0}₽"), Some(dec("12990")));
        assert_eq!(parse_price("Продажа: 7 012,40 руб."), Some(dec("7012.40")));
    }

    #[test]
    fn parses_dot_decimals_and_mixed_separators() {
        assert_eq!(parse_price("$19.99"), Some(dec("19.99")));
        assert_eq!(parse_price("1,234.50"), Some(dec("1234.50")));
        assert_eq!(parse_price("1.234,50"), Some(dec("1234.50")));
    }

    #[test]
    fn treats_three_digit_groups_as_thousands() {
        assert_eq!(parse_price("12,345"), Some(dec("12345")));
        assert_eq!(parse_price("1.234.567"), Some(dec("1234567")));
        assert_eq!(parse_price("0,125"), Some(dec("0.125")));
    }

    #[test]
    fn stops_at_first_non_numeric_run() {
        assert_eq!(parse_price("799 ₽ 999 ₽"), Some(dec("799")));
    }

    #[test]
    fn no_digits_is_none() {
        assert_eq!(parse_price("нет в наличии"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn normalize_rounds_to_cents() {
        assert_eq!(normalize_price(dec("10.005")), dec("10.01"));
        assert_eq!(normalize_price(dec("10.004")), dec("10.00"));
    }
}
