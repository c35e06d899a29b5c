use crate::schema::Cell;

/// Converts a raw cell to a number, coercing anything unreadable to `0.0`.
///
/// Financial exports are full of blank cells, `N/A` markers and stray text, and
/// a single bad cell must never abort a whole statement. The conversion rule:
/// - `Empty`, whitespace-only text and `N/A` become `0.0`
/// - `$` and `,` are stripped before parsing
/// - anything that still fails to parse becomes `0.0`
///
/// Parenthesised negatives such as `(500)` are not interpreted and also become
/// `0.0`.
pub fn parse_value(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(value) if value.is_finite() => *value,
        Cell::Number(_) | Cell::Empty => 0.0,
        Cell::Text(text) => parse_value_str(text),
    }
}

/// String form of [`parse_value`].
pub fn parse_value_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        return 0.0;
    }

    let cleaned: String = trimmed.chars().filter(|c| *c != '$' && *c != ',').collect();

    match cleaned.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Hierarchy level from indentation: one level per two leading whitespace characters.
pub fn indentation_level(label: &str) -> u32 {
    let leading = label.chars().take_while(|c| c.is_whitespace()).count();
    (leading / 2) as u32
}

/// Strips a leading `"<digits> - "` account code and collapses whitespace.
///
/// `"  6000 - Rental   Income"` becomes `"Rental Income"`.
pub fn clean_category_name(label: &str) -> String {
    let trimmed = label.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();

    let without_code = if digits > 0 {
        let rest = trimmed[digits..].trim_start();
        match rest.strip_prefix('-') {
            Some(after_dash) => after_dash,
            None => trimmed,
        }
    } else {
        trimmed
    };

    without_code.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_blank_and_missing() {
        assert_eq!(parse_value(&Cell::Empty), 0.0);
        assert_eq!(parse_value(&Cell::from("")), 0.0);
        assert_eq!(parse_value(&Cell::from("   ")), 0.0);
        assert_eq!(parse_value(&Cell::from("N/A")), 0.0);
    }

    #[test]
    fn test_parse_value_currency() {
        assert_eq!(parse_value_str("$1,234.56"), 1234.56);
        assert_eq!(parse_value_str("  $ 12,000 "), 12000.0);
        assert_eq!(parse_value_str("-250.5"), -250.5);
        assert_eq!(parse_value(&Cell::Number(42.5)), 42.5);
    }

    #[test]
    fn test_parse_value_garbage_is_zero() {
        assert_eq!(parse_value_str("abc"), 0.0);
        assert_eq!(parse_value_str("12abc"), 0.0);
        assert_eq!(parse_value_str("NaN"), 0.0);
        assert_eq!(parse_value(&Cell::Number(f64::INFINITY)), 0.0);
    }

    #[test]
    fn test_parenthesised_negative_is_not_interpreted() {
        assert_eq!(parse_value_str("(500)"), 0.0);
    }

    #[test]
    fn test_indentation_level() {
        assert_eq!(indentation_level("Income"), 0);
        assert_eq!(indentation_level("  Rental Income"), 1);
        assert_eq!(indentation_level("   Odd"), 1);
        assert_eq!(indentation_level("    Laundry"), 2);
    }

    #[test]
    fn test_clean_category_name() {
        assert_eq!(clean_category_name("6000 - Rental Income"), "Rental Income");
        assert_eq!(clean_category_name("  6000-Rental   Income "), "Rental Income");
        assert_eq!(clean_category_name("Rental Income"), "Rental Income");
        assert_eq!(clean_category_name("2024 Capital Plan"), "2024 Capital Plan");
    }

    #[test]
    fn test_clean_category_name_is_idempotent() {
        let once = clean_category_name("  7100 - Repairs &   Maintenance");
        assert_eq!(clean_category_name(&once), once);
    }
}
