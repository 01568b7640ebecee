use serde_json::{Map, Value};

/// One sign-off submission as posted by the front end.
///
/// Every field is optional. Empty strings are treated as absent so that
/// "missing" has a single representation downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionRecord {
    pub date: Option<String>,
    pub location: Option<String>,
    pub bol: Option<String>,
    pub po: Option<String>,
    pub bol_link: Option<String>,
    pub stop: Option<String>,
    pub carrier: Option<String>,
    pub vendor_id: Option<String>,
    pub vendor_name: Option<String>,
    pub trailer_number: Option<String>,
    pub notes: Option<String>,
    pub driver_name: Option<String>,
    pub driver_id: Option<String>,

    pub signature_data_url: Option<String>,
    pub bol_photo_data_url: Option<String>,
    pub bol_pdf_data_url: Option<String>,
    pub photos: Vec<PhotoEntry>,

    pub to_email: Option<String>,
    pub cc_email: Option<String>,
    pub bcc_email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoEntry {
    pub data_url: Option<String>,
}

impl SubmissionRecord {
    /// Parse a raw request body. An empty body is an empty submission.
    pub fn from_body(body: &[u8]) -> Result<Self, String> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value =
            serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))?;
        Self::from_json(&value)
    }

    /// Read a record leniently from a JSON object. Scalars of any JSON type
    /// are accepted and rendered as text.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "Submission body must be a JSON object".to_string())?;

        Ok(Self {
            date: text_field(obj, "date"),
            location: text_field(obj, "location"),
            bol: text_field(obj, "bol"),
            po: text_field(obj, "po"),
            bol_link: text_field(obj, "bolLink"),
            stop: text_field(obj, "stop"),
            carrier: text_field(obj, "carrier"),
            vendor_id: text_field(obj, "vendorId"),
            vendor_name: text_field(obj, "vendorName"),
            trailer_number: text_field(obj, "trailerNumber"),
            notes: text_field(obj, "notes"),
            driver_name: text_field(obj, "driverName"),
            driver_id: text_field(obj, "driverId"),
            signature_data_url: text_field(obj, "signatureDataUrl"),
            bol_photo_data_url: text_field(obj, "bolPhotoDataUrl"),
            bol_pdf_data_url: text_field(obj, "bolPdfDataUrl"),
            photos: photos(obj),
            to_email: text_field(obj, "toEmail"),
            cc_email: text_field(obj, "ccEmail"),
            bcc_email: text_field(obj, "bccEmail"),
            subject: text_field(obj, "subject"),
            message: text_field(obj, "message"),
        })
    }
}

fn text_field(obj: &Map<String, Value>, field: &str) -> Option<String> {
    let text = match obj.get(field)? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn photos(obj: &Map<String, Value>) -> Vec<PhotoEntry> {
    let Some(entries) = obj.get("photos").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .map(|entry| PhotoEntry {
            data_url: entry
                .get("dataUrl")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
        .collect()
}
