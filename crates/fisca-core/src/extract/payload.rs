//! Transport payload preparation
//!
//! The extraction service receives either inline text (spreadsheets are sent
//! as a CSV rendering, truncated) or the raw bytes base64-encoded (PDFs).
//! Cell semantics are the service's job; this module only serializes.

use base64::Engine;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::SourceUpload;

/// Spreadsheet renderings are cut off after this many lines. Approval sheets
/// put their data at the top; anything past this is header repetition or
/// empty rows, and the extraction call is priced per token.
pub const MAX_SHEET_LINES: usize = 100;

/// What actually goes over the wire for one document
#[derive(Debug, Clone)]
pub enum DocumentPayload {
    /// Inline text (CSV rendering of a spreadsheet, or a plain-text file)
    Text(String),
    /// Base64-encoded raw bytes with the declared MIME type
    Binary { mime: String, base64: String },
}

/// Prepare the transport payload for one uploaded document.
///
/// CSV/TSV/plain-text uploads become a truncated text rendering; PDFs are
/// base64-encoded. Anything else is rejected before an extraction call is
/// wasted on it.
pub fn prepare_payload(upload: &SourceUpload) -> Result<DocumentPayload> {
    let name = upload.file_name.to_lowercase();
    let mime = upload.mime.as_deref().unwrap_or("");

    if mime == "application/pdf" || name.ends_with(".pdf") {
        return Ok(DocumentPayload::Binary {
            mime: "application/pdf".to_string(),
            base64: base64::engine::general_purpose::STANDARD.encode(&upload.bytes),
        });
    }

    if mime.starts_with("text/")
        || mime == "application/csv"
        || name.ends_with(".csv")
        || name.ends_with(".tsv")
        || name.ends_with(".txt")
    {
        let text = String::from_utf8_lossy(&upload.bytes);
        let rendered = render_sheet_text(&text, name.ends_with(".tsv"))?;
        return Ok(DocumentPayload::Text(rendered));
    }

    Err(Error::UnsupportedDocument(format!(
        "{} (mime: {})",
        upload.file_name,
        if mime.is_empty() { "unknown" } else { mime }
    )))
}

/// Re-emit tabular text as comma-separated lines, capped at
/// [`MAX_SHEET_LINES`] records including the header.
fn render_sheet_text(text: &str, tab_delimited: bool) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(if tab_delimited { b'\t' } else { b',' })
        .from_reader(text.as_bytes());

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let mut lines = 0usize;
    for record in reader.records() {
        let record = record?;
        writer.write_record(&record)?;
        lines += 1;
        if lines >= MAX_SHEET_LINES {
            debug!(lines, "sheet rendering truncated");
            break;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("Failed to render sheet text: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: Option<&str>, bytes: &[u8]) -> SourceUpload {
        SourceUpload {
            id: 1,
            file_name: name.to_string(),
            mime: mime.map(|m| m.to_string()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_csv_becomes_text() {
        let csv = "name,requested,approved\nTree Planting Day,5000,4500\n";
        let payload = prepare_payload(&upload("sheet.csv", Some("text/csv"), csv.as_bytes())).unwrap();
        match payload {
            DocumentPayload::Text(text) => {
                assert!(text.contains("Tree Planting Day,5000,4500"));
            }
            _ => panic!("expected text payload"),
        }
    }

    #[test]
    fn test_sheet_truncated_at_line_cap() {
        let mut csv = String::from("name,amount\n");
        for i in 0..500 {
            csv.push_str(&format!("Project {},100\n", i));
        }
        let payload = prepare_payload(&upload("big.csv", None, csv.as_bytes())).unwrap();
        match payload {
            DocumentPayload::Text(text) => {
                assert_eq!(text.lines().count(), MAX_SHEET_LINES);
            }
            _ => panic!("expected text payload"),
        }
    }

    #[test]
    fn test_pdf_becomes_base64() {
        let payload =
            prepare_payload(&upload("proposal.pdf", Some("application/pdf"), b"%PDF-1.4")).unwrap();
        match payload {
            DocumentPayload::Binary { mime, base64 } => {
                assert_eq!(mime, "application/pdf");
                assert!(!base64.is_empty());
            }
            _ => panic!("expected binary payload"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = prepare_payload(&upload("photo.png", Some("image/png"), &[0u8; 4])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDocument(_)));
    }
}
