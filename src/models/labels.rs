use base64::Engine;
use serde::Deserialize;

/// Response from the carrier label endpoint.
///
/// The backend may populate any of four payload fields depending on the
/// carrier and label format; [`LabelResponse::payload`] collapses them
/// into a single tagged value with a fixed priority.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelResponse {
    #[serde(default, rename = "parcelId")]
    pub parcel_id: Option<i64>,
    #[serde(default)]
    pub tracking_number: Option<String>,

    #[serde(default, rename = "zplBase64List")]
    pub zpl_base64_list: Option<Vec<String>>,
    #[serde(default, rename = "zplBase64")]
    pub zpl_base64: Option<String>,
    #[serde(default, rename = "labelsBase64")]
    pub labels_base64: Option<Vec<String>>,
    #[serde(default, rename = "pdfBase64")]
    pub pdf_base64: Option<String>,
}

/// The printable content of a label response, highest priority first.
/// ZPL shapes win over PDF fallbacks; batches win over single payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPayload {
    ZplBatch(Vec<String>),
    ZplSingle(String),
    PdfBatch(Vec<String>),
    PdfSingle(String),
}

impl LabelResponse {
    /// Pick the first non-empty payload shape in priority order, or
    /// `None` when the backend returned no printable content at all.
    pub fn payload(&self) -> Option<LabelPayload> {
        if let Some(list) = &self.zpl_base64_list {
            if !list.is_empty() {
                return Some(LabelPayload::ZplBatch(list.clone()));
            }
        }
        if let Some(single) = &self.zpl_base64 {
            if !single.is_empty() {
                return Some(LabelPayload::ZplSingle(single.clone()));
            }
        }
        if let Some(list) = &self.labels_base64 {
            if !list.is_empty() {
                return Some(LabelPayload::PdfBatch(list.clone()));
            }
        }
        if let Some(single) = &self.pdf_base64 {
            if !single.is_empty() {
                return Some(LabelPayload::PdfSingle(single.clone()));
            }
        }
        None
    }
}

/// Sniff whether a base64 payload is actually a PDF document rather than
/// raw label markup. Some carriers return PDFs in the ZPL field.
pub fn looks_like_pdf(b64: &str) -> bool {
    let trimmed = b64.trim_start();
    if trimmed.len() < 8 || !trimmed.is_char_boundary(8) {
        return false;
    }
    match base64::engine::general_purpose::STANDARD.decode(&trimmed[..8]) {
        Ok(bytes) => bytes.starts_with(b"%PDF-"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn priority_prefers_zpl_batch() {
        let resp = LabelResponse {
            zpl_base64_list: Some(vec!["a".into(), "b".into()]),
            zpl_base64: Some("c".into()),
            pdf_base64: Some("d".into()),
            ..Default::default()
        };
        assert_eq!(
            resp.payload(),
            Some(LabelPayload::ZplBatch(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn empty_batch_falls_through_to_single() {
        let resp = LabelResponse {
            zpl_base64_list: Some(vec![]),
            zpl_base64: Some("c".into()),
            ..Default::default()
        };
        assert_eq!(resp.payload(), Some(LabelPayload::ZplSingle("c".into())));
    }

    #[test]
    fn pdf_batch_beats_pdf_single() {
        let resp = LabelResponse {
            labels_base64: Some(vec!["p1".into()]),
            pdf_base64: Some("p2".into()),
            ..Default::default()
        };
        assert_eq!(resp.payload(), Some(LabelPayload::PdfBatch(vec!["p1".into()])));
    }

    #[test]
    fn no_shape_present_yields_none() {
        let resp = LabelResponse {
            zpl_base64: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(resp.payload(), None);
    }

    #[test]
    fn sniffs_pdf_in_disguise() {
        let pdf = STANDARD.encode(b"%PDF-1.4 rest of document");
        assert!(looks_like_pdf(&pdf));

        let zpl = STANDARD.encode(b"^XA^FO50,50^FDHELLO^FS^XZ");
        assert!(!looks_like_pdf(&zpl));

        assert!(!looks_like_pdf(""));
        assert!(!looks_like_pdf("short"));
        assert!(!looks_like_pdf("!!notbase64!!"));
    }

    #[test]
    fn deserializes_partial_response() {
        let resp: LabelResponse = serde_json::from_str(
            r#"{"parcelId": 991, "tracking_number": "SC123", "labelsBase64": ["x"]}"#,
        )
        .unwrap();
        assert_eq!(resp.parcel_id, Some(991));
        assert_eq!(resp.payload(), Some(LabelPayload::PdfBatch(vec!["x".into()])));
    }
}
