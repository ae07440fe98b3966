//! Compiled patterns for financial entity classes.
//!
//! Every matcher runs independently over the same text; overlapping matches
//! across types are expected and left for the merge step.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::EntityMap;

/// 2 letter country code, 9 alphanumerics, 1 check digit.
pub static ISIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2}[A-Z0-9]{9}[0-9]\b").unwrap());

pub static CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:USD|EUR|GBP|JPY|\$|€|£)\s*[\d,]+\.?\d*(?:M|K|B)?").unwrap()
});

pub static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|\d{4}[-/]\d{2}[-/]\d{2}|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\s+\d{1,2},?\s+\d{4})\b",
    )
    .unwrap()
});

pub static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\.?\d*\s*%").unwrap());

/// Bare numeric tokens such as `1,000,000` or `95.5`.
pub static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+\.?\d*").unwrap());

static NOTIONAL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:notional|principal|amount):\s*([\d,]+\.?\d*)").unwrap()
});

static COUPON_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:coupon|interest\s+rate):\s*(\d+\.?\d*\s*%)").unwrap()
});

static MATURITY_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:maturity|expiry|expiration):\s*([^\n]+)").unwrap());

// Name characters exclude line breaks so a name stops at the end of its line.
static COUNTERPARTY_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:counterparty|party|issuer):[^\S\n]*([A-Z][a-zA-Z &,.\t]+(?:Inc|LLC|Ltd|Corp|AG|SA|plc)?)",
    )
    .unwrap()
});

static UNDERLYING_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:underlying|reference|asset):\s*([^\n]+)").unwrap());

static BARRIER_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:barrier|strike|trigger):\s*([\d,]+\.?\d*)").unwrap()
});

/// Whole-match hits of `re` in text order.
pub fn find_all(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// First capture group of every match of `re` in text order.
pub fn capture_all(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Run the full battery over `text`. Types without a match are omitted.
pub fn extract_all(text: &str) -> EntityMap {
    let mut entities = EntityMap::new();
    entities.extend("isin", find_all(&ISIN, text));
    entities.extend("currency_amounts", find_all(&CURRENCY, text));
    entities.extend("dates", find_all(&DATE, text));
    entities.extend("percentages", find_all(&PERCENTAGE, text));
    entities.extend("notional", capture_all(&NOTIONAL_KEYWORDS, text));
    entities.extend("coupon", capture_all(&COUPON_KEYWORDS, text));
    entities.extend("maturity", capture_all(&MATURITY_KEYWORDS, text));
    entities.extend("counterparty", capture_all(&COUNTERPARTY_KEYWORDS, text));
    entities.extend("underlying", capture_all(&UNDERLYING_KEYWORDS, text));
    entities.extend("barrier", capture_all(&BARRIER_KEYWORDS, text));
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isin_boundaries() {
        let text = "Bond US0378331005 and DE000BAY0017, not XUS0378331005";
        assert_eq!(find_all(&ISIN, text), vec!["US0378331005", "DE000BAY0017"]);
    }

    #[test]
    fn test_generic_classes() {
        let text = "Pay EUR 1,000,000 on 15/03/2025 or March 15, 2026 at 4.25 % p.a.";
        let entities = extract_all(text);

        assert_eq!(entities.get("currency_amounts").unwrap(), ["EUR 1,000,000"]);
        assert_eq!(entities.get("dates").unwrap(), ["15/03/2025", "March 15, 2026"]);
        assert_eq!(entities.get("percentages").unwrap(), ["4.25 %"]);
        assert!(entities.get("isin").is_none());
    }

    #[test]
    fn test_keyword_anchored_values() {
        let text = "Counterparty: Goldman Sachs\nNotional: 5,000,000\nCoupon: 3.5%\nMaturity: 2029-06-30\nUnderlying: Euro Stoxx 50\nBarrier: 60";
        let entities = extract_all(text);

        assert_eq!(entities.get("counterparty").unwrap(), ["Goldman Sachs"]);
        assert_eq!(entities.get("notional").unwrap(), ["5,000,000"]);
        assert_eq!(entities.get("coupon").unwrap(), ["3.5%"]);
        assert_eq!(entities.get("maturity").unwrap(), ["2029-06-30"]);
        assert_eq!(entities.get("underlying").unwrap(), ["Euro Stoxx 50"]);
        assert_eq!(entities.get("barrier").unwrap(), ["60"]);
    }

    #[test]
    fn test_overlaps_are_kept() {
        // The date lives inside the maturity capture as well.
        let entities = extract_all("Maturity: 30/06/2029");
        assert_eq!(entities.get("maturity").unwrap(), ["30/06/2029"]);
        assert_eq!(entities.get("dates").unwrap(), ["30/06/2029"]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Issuer: BNP Paribas SA\nISIN: FR0000131104";
        assert_eq!(extract_all(text), extract_all(text));
    }
}
