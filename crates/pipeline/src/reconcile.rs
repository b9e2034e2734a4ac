use serde_json::Value;

use crate::types::{BillProcessResult, Confidence, ParsedFields};

/// Typed, defaulting access to the parser's untyped reply.
pub struct FieldReader<'a> {
    fields: &'a ParsedFields,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a ParsedFields) -> Self {
        Self { fields }
    }

    /// The string at `key`, or empty when absent or not a string.
    pub fn text(&self, key: &str) -> String {
        match self.fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// The number at `key` clamped into `[0, 1]`, or 0 when absent or not a number.
    pub fn confidence(&self, key: &str) -> f64 {
        self.fields
            .get(key)
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .map_or(0.0, |c| c.clamp(0.0, 1.0))
    }
}

impl BillProcessResult {
    /// Merge a successful parser reply with the OCR text it was produced from.
    pub fn from_parsed(parsed: &ParsedFields, ocr_text: &str, content_type: &str) -> Self {
        let fields = FieldReader::new(parsed);

        let echoed = fields.text("raw_text");
        let raw_text = if echoed.is_empty() { ocr_text.to_string() } else { echoed };

        Self {
            raw_text,
            merchant_name: fields.text("merchant_name"),
            amount: fields.text("total_amount"),
            date: fields.text("date"),
            category: fields.text("category"),
            confidence: Confidence {
                merchant: fields.confidence("merchant_confidence"),
                amount: fields.confidence("amount_confidence"),
                date: fields.confidence("date_confidence"),
                category: fields.confidence("category_confidence"),
            },
            image_type: content_type.to_string(),
        }
    }

    /// OCR-only result for when parsing failed: no structured fields, zero confidence.
    pub fn degraded(ocr_text: &str, content_type: &str) -> Self {
        Self {
            raw_text: ocr_text.to_string(),
            image_type: content_type.to_string(),
            ..Self::default()
        }
    }
}
