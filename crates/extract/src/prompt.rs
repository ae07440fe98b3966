use crate::normalizer::truncate_chars;

/// Document characters sent to the model for entity extraction.
pub const EXTRACTION_CONTEXT_CHARS: usize = 4000;

pub const EXTRACTION_SYSTEM: &str =
    "You are a financial document analyst. Extract ALL entity instances from documents.";

pub fn build_extraction_prompt(document_text: &str) -> String {
    let mut text = truncate_chars(document_text, EXTRACTION_CONTEXT_CHARS).to_string();
    if text.len() < document_text.len() {
        text.push_str("\n... [truncated]");
    }

    format!(
        r#"Carefully analyze this financial document and extract ALL instances of these entities:

Document:
{}

Extract ALL values (list multiple if found):

1. COUNTERPARTY: ALL company names, banks, investors, parties
2. NOTIONAL: ALL monetary amounts, investments, fees
3. ISIN: ISIN codes (12-character alphanumeric)
4. UNDERLYING: Instrument types (shares, bonds, preference shares)
5. MATURITY: Dates for maturity, expiry, closing, exit period
6. COUPON: Interest rates, dividend rates, IRR, returns
7. BARRIER: Thresholds, percentages, multipliers (2X, 10%, etc.)
8. TRADE_DATE: Transaction dates, issue dates
9. CURRENCY: Currencies (INR, USD, EUR, etc.)
10. PAYMENT_FREQUENCY: Payment schedule (quarterly, monthly)
11. STRIKE_PRICE: Strike prices

RULES:
- List EACH value on a separate line
- List every company/party separately
- List every rate/threshold separately
- If not found, write "Not found"

Format (repeat for multiple values):
COUNTERPARTY: [company 1]
COUNTERPARTY: [company 2]
NOTIONAL: [amount 1]
COUPON: [rate 1]
BARRIER: [threshold 1]

Extract everything you find."#,
        text
    )
}

pub fn build_json_repair_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}
