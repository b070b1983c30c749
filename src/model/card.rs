use serde::{Deserialize, Serialize};

/// Used when the card number has no digits at all.
const FALLBACK_LAST4: &str = "4242";
const FALLBACK_EXP_MONTH: &str = "12";
const FALLBACK_EXP_YEAR: &str = "25";

/// The label shown for a linked card. Detected from the leading digit only.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    Mastercard,
}

serde_plain::derive_display_from_serialize!(CardBrand);
serde_plain::derive_fromstr_from_deserialize!(CardBrand);

impl CardBrand {
    fn detect(digits: &str) -> Self {
        if digits.starts_with('5') {
            CardBrand::Mastercard
        } else {
            CardBrand::Visa
        }
    }
}

/// A simulated stored payment method. It only labels deposits; no card network is involved and
/// the number is never checked.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Card {
    id: String,
    brand: CardBrand,
    last4: String,
    exp_month: String,
    exp_year: String,
}

impl Card {
    /// Builds a card from free-text form input.
    ///
    /// - `number` may contain spaces or other separators; only digits are kept.
    /// - `expiry` is split on `/` into month and year, each defaulting when missing.
    pub fn from_input(id: impl Into<String>, number: &str, expiry: &str) -> Self {
        let digits: String = number.chars().filter(char::is_ascii_digit).collect();
        let last4 = if digits.is_empty() {
            FALLBACK_LAST4.to_string()
        } else {
            let start = digits.len().saturating_sub(4);
            digits[start..].to_string()
        };

        let mut parts = expiry.split('/').map(str::trim);
        let exp_month = non_empty_or(parts.next(), FALLBACK_EXP_MONTH);
        let exp_year = non_empty_or(parts.next(), FALLBACK_EXP_YEAR);

        Self {
            id: id.into(),
            brand: CardBrand::detect(&digits),
            last4,
            exp_month,
            exp_year,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn brand(&self) -> CardBrand {
        self.brand
    }

    pub fn last4(&self) -> &str {
        &self.last4
    }

    pub fn exp_month(&self) -> &str {
        &self.exp_month
    }

    pub fn exp_year(&self) -> &str {
        &self.exp_year
    }

    /// How deposits made with this card are labelled, e.g. `Visa •••• 4242`.
    pub fn method_label(&self) -> String {
        format!("{} •••• {}", self.brand, self.last4)
    }
}

fn non_empty_or(part: Option<&str>, fallback: &str) -> String {
    match part {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visa_test_number() {
        let card = Card::from_input("c1", "4242424242424242", "12/25");
        assert_eq!(card.last4(), "4242");
        assert_eq!(card.brand(), CardBrand::Visa);
        assert_eq!(card.exp_month(), "12");
        assert_eq!(card.exp_year(), "25");
    }

    #[test]
    fn test_mastercard_with_spaces() {
        let card = Card::from_input("c2", "5555 5555 5555 4444", "03/29");
        assert_eq!(card.last4(), "4444");
        assert_eq!(card.brand(), CardBrand::Mastercard);
        assert_eq!(card.method_label(), "Mastercard •••• 4444");
    }

    #[test]
    fn test_empty_input_uses_fallbacks() {
        let card = Card::from_input("c3", "", "");
        assert_eq!(card.last4(), "4242");
        assert_eq!(card.brand(), CardBrand::Visa);
        assert_eq!(card.exp_month(), "12");
        assert_eq!(card.exp_year(), "25");
    }

    #[test]
    fn test_short_number_and_partial_expiry() {
        let card = Card::from_input("c4", "512", "7");
        assert_eq!(card.last4(), "512");
        assert_eq!(card.brand(), CardBrand::Mastercard);
        assert_eq!(card.exp_month(), "7");
        assert_eq!(card.exp_year(), "25");
    }

    #[test]
    fn test_serialized_brand_label() {
        let card = Card::from_input("c5", "4000056655665556", "01/30");
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["brand"], "Visa");
        assert_eq!(value["last4"], "5556");
    }
}
