use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run (line breaks included) to one space and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Normalize an extracted value: collapse whitespace, title-case shouted
/// words ("GOLDMAN SACHS" -> "Goldman Sachs"), trim.
///
/// Values containing digits are codes (ISINs, tenors, "5Y") and keep their casing.
pub fn normalize_entity(value: &str) -> String {
    let collapsed = WHITESPACE.replace_all(value, " ");
    let trimmed = collapsed.trim();

    if is_upper(trimmed) && trimmed.chars().count() > 3 && !trimmed.chars().any(|c| c.is_ascii_digit())
    {
        title_case(trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// At least one cased character and no lower-case ones.
fn is_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Trade\n\n Date:\t 2024-01-15  "), "Trade Date: 2024-01-15");
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_entity("GOLDMAN  SACHS"), "Goldman Sachs");
        assert_eq!(normalize_entity("  Goldman Sachs "), "Goldman Sachs");
        assert_eq!(normalize_entity("EUR"), "EUR");
        assert_eq!(normalize_entity("US0378331005"), "US0378331005");
        assert_eq!(normalize_entity("ESTR+45BPS"), "ESTR+45BPS");
        assert_eq!(normalize_entity("estr"), "estr");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("trade confirmation"), "Trade Confirmation");
        assert_eq!(title_case("BNP PARIBAS"), "Bnp Paribas");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("€100 notional", 4), "€100");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
