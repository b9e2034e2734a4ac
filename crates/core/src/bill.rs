use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::{Money, MoneyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillId(pub u64);

impl std::fmt::Display for BillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid amount: {0}")]
    Amount(#[from] MoneyError),
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),
}

/// A stored bill record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub id: BillId,
    pub merchant_name: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Amount as a client may submit it: either a number or the text a
/// processing run returned.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    pub fn to_money(&self) -> Result<Money, MoneyError> {
        match self {
            AmountInput::Number(n) => Money::from_f64(*n),
            AmountInput::Text(s) => Money::parse_amount(s),
        }
    }
}

/// Request body for storing a bill; every field is checked by [`NewBill::validate`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewBill {
    #[serde(default)]
    pub merchant_name: String,
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

/// A bill that passed validation and is ready to be assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBill {
    pub merchant_name: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: String,
    pub notes: Option<String>,
    pub raw_text: Option<String>,
}

impl NewBill {
    pub fn validate(self) -> Result<ValidatedBill, BillError> {
        let merchant_name = required(self.merchant_name, "merchant_name")?;
        let category = required(self.category, "category")?;
        let date_text = required(self.date, "date")?;

        let amount = self
            .amount
            .ok_or(BillError::MissingField("amount"))?
            .to_money()?;
        if amount.is_zero() {
            return Err(BillError::MissingField("amount"));
        }

        let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d")
            .map_err(|_| BillError::Date(date_text.clone()))?;

        Ok(ValidatedBill {
            merchant_name,
            amount,
            date,
            category,
            notes: self.notes.filter(|n| !n.is_empty()),
            raw_text: self.raw_text.filter(|t| !t.is_empty()),
        })
    }
}

impl ValidatedBill {
    pub fn into_bill(self, id: BillId, created_at: DateTime<Utc>) -> Bill {
        Bill {
            id,
            merchant_name: self.merchant_name,
            amount: self.amount,
            date: self.date,
            category: self.category,
            notes: self.notes,
            raw_text: self.raw_text,
            created_at,
        }
    }
}

fn required(value: String, field: &'static str) -> Result<String, BillError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(BillError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walmart() -> NewBill {
        serde_json::from_value(serde_json::json!({
            "merchant_name": "Walmart",
            "amount": 45.67,
            "date": "2025-06-15",
            "category": "Groceries"
        }))
        .unwrap()
    }

    #[test]
    fn validate_accepts_complete_bill() {
        let bill = walmart().validate().unwrap();
        assert_eq!(bill.merchant_name, "Walmart");
        assert_eq!(bill.amount, Money::from_cents(4567));
        assert_eq!(bill.date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert_eq!(bill.notes, None);
    }

    #[test]
    fn validate_accepts_processed_amount_text() {
        let mut req = walmart();
        req.amount = Some(AmountInput::Text("$45.67".into()));
        assert_eq!(req.validate().unwrap().amount, Money::from_cents(4567));
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut req = walmart();
        req.merchant_name = "   ".into();
        assert_eq!(req.validate(), Err(BillError::MissingField("merchant_name")));

        let mut req = walmart();
        req.amount = None;
        assert_eq!(req.validate(), Err(BillError::MissingField("amount")));

        let mut req = walmart();
        req.amount = Some(AmountInput::Number(0.0));
        assert_eq!(req.validate(), Err(BillError::MissingField("amount")));
    }

    #[test]
    fn validate_rejects_bad_date() {
        let mut req = walmart();
        req.date = "15/06/2025".into();
        assert_eq!(req.validate(), Err(BillError::Date("15/06/2025".into())));
    }

    #[test]
    fn validate_rejects_thousands_separator() {
        let mut req = walmart();
        req.amount = Some(AmountInput::Text("1,234.00".into()));
        assert!(matches!(req.validate(), Err(BillError::Amount(_))));
    }

    #[test]
    fn bill_serializes_snake_case_without_empty_optionals() {
        let bill = walmart()
            .validate()
            .unwrap()
            .into_bill(BillId(1), DateTime::from_timestamp(0, 0).unwrap());
        let json = serde_json::to_value(&bill).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["amount"], 45.67);
        assert_eq!(json["date"], "2025-06-15");
        assert!(json.get("notes").is_none());
        assert!(json.get("raw_text").is_none());
    }
}
