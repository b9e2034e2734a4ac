use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content type assumed when the uploader declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Field values returned by the parser service, untyped.
pub type ParsedFields = serde_json::Map<String, serde_json::Value>;

/// An uploaded bill image. Consumed by the OCR stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    bytes: Vec<u8>,
    content_type: String,
    filename: String,
}

impl RawImage {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            filename: filename.into(),
        }
    }

    /// Set the declared content type; `None` or an empty value keeps the default.
    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        if let Some(ct) = content_type.map(str::trim).filter(|ct| !ct.is_empty()) {
            self.content_type = ct.to_string();
        }
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 hex digest of the image bytes.
    pub fn fingerprint(&self) -> String {
        Sha256::digest(&self.bytes).iter().map(|b| format!("{b:02x}")).collect()
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, String) {
        (self.bytes, self.filename)
    }
}

/// Per-field confidence, each in `[0, 1]`; 0 means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub merchant: f64,
    pub amount: f64,
    pub date: f64,
    pub category: f64,
}

/// The outcome of processing one bill image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillProcessResult {
    pub raw_text: String,
    pub merchant_name: String,
    pub amount: String,
    pub date: String,
    pub category: String,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_defaults_when_missing_or_blank() {
        let image = RawImage::new(b"IMG".to_vec(), "bill.jpg");
        assert_eq!(image.content_type(), DEFAULT_CONTENT_TYPE);

        let image = image.with_content_type(Some("  "));
        assert_eq!(image.content_type(), DEFAULT_CONTENT_TYPE);

        let image = image.with_content_type(Some("image/jpeg"));
        assert_eq!(image.content_type(), "image/jpeg");
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let image = RawImage::new(b"IMG".to_vec(), "bill.jpg");
        assert_eq!(image.fingerprint().len(), 64);
        assert_eq!(
            RawImage::new(Vec::new(), "empty").fingerprint(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(image.fingerprint(), RawImage::new(b"IMG".to_vec(), "other.png").fingerprint());
    }

    #[test]
    fn result_wire_shape_is_snake_case() {
        let result = BillProcessResult {
            raw_text: "Walmart".into(),
            merchant_name: "Walmart".into(),
            confidence: Confidence { merchant: 0.95, ..Confidence::default() },
            ..BillProcessResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["raw_text"], "Walmart");
        assert_eq!(json["merchant_name"], "Walmart");
        assert_eq!(json["confidence"]["merchant"], 0.95);
        assert!(json.get("image_type").is_none());
    }
}
