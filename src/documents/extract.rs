//! PDF text extraction for uploaded documents.
//!
//! Pages are read with `pdf-extract`, falling back to a raw `lopdf`
//! content-stream walk for files whose fonts or structure trip the primary
//! extractor. Unreadable documents are skipped with a warning: ingestion
//! never fails, it just yields less text.

use std::panic::{AssertUnwindSafe, catch_unwind};

use super::types::{ExtractedText, UploadedDocument};

/// Extract and concatenate the text of every page of every document.
///
/// Pages are appended in upload order with no separator between pages or
/// documents.
pub fn extract_text(documents: &[UploadedDocument]) -> ExtractedText {
    let mut extracted = ExtractedText::default();

    for document in documents {
        match extract_pages(document) {
            Ok(pages) => {
                tracing::debug!(
                    target: "ingest",
                    "'{}': {} pages",
                    document.filename,
                    pages.len()
                );
                extracted.documents_read += 1;
                extracted.pages_read += pages.len();
                for page in pages {
                    extracted.text.push_str(&page);
                }
            }
            Err(reason) => {
                tracing::warn!(target: "ingest", "skipping '{}': {reason}", document.filename);
            }
        }
    }

    extracted
}

/// Extract the text of each page of a single document.
pub fn extract_pages(document: &UploadedDocument) -> Result<Vec<String>, String> {
    extract_pages_with(document, |bytes| {
        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())
    })
}

fn extract_pages_with<F>(document: &UploadedDocument, primary: F) -> Result<Vec<String>, String>
where
    F: FnOnce(&[u8]) -> Result<Vec<String>, String>,
{
    if !document.looks_like_pdf() {
        return Err("not a PDF file".to_string());
    }

    // pdf-extract can panic on malformed input instead of returning an error
    let failure = match catch_unwind(AssertUnwindSafe(|| primary(&document.bytes))) {
        Ok(Ok(pages)) => return Ok(pages),
        Ok(Err(e)) => e,
        Err(panic_payload) => {
            if let Some(s) = panic_payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            }
        }
    };

    tracing::debug!(
        target: "ingest",
        "pdf-extract failed for '{}', trying lopdf fallback: {failure}",
        document.filename
    );

    extract_pages_via_lopdf(&document.bytes).map_err(|fallback| {
        format!("unreadable PDF ({failure}); fallback also failed: {fallback}")
    })
}

/// Fallback extraction walking page content streams with lopdf.
///
/// Less accurate for complex fonts but more tolerant of malformed PDFs.
fn extract_pages_via_lopdf(bytes: &[u8]) -> Result<Vec<String>, String> {
    use lopdf::{Document, Object};

    let doc = Document::load_mem(bytes).map_err(|e| format!("failed to load PDF: {e}"))?;
    let mut pages = Vec::new();

    for (_page_num, page_id) in doc.get_pages() {
        let mut page_text = String::new();

        if let Ok(content) = doc.get_page_content(page_id) {
            let operations = lopdf::content::Content::decode(&content)
                .map(|c| c.operations)
                .unwrap_or_default();

            for op in operations {
                match op.operator.as_str() {
                    "Tj" | "'" | "\"" => {
                        if let Some(Object::String(bytes, _)) = op.operands.last() {
                            page_text.push_str(&decode_pdf_string(bytes));
                        }
                    }
                    "TJ" => {
                        if let Some(Object::Array(items)) = op.operands.first() {
                            for item in items {
                                if let Object::String(bytes, _) = item {
                                    page_text.push_str(&decode_pdf_string(bytes));
                                }
                            }
                        }
                    }
                    "Td" | "TD" | "T*" => {
                        if !page_text.is_empty() && !page_text.ends_with(char::is_whitespace) {
                            page_text.push(' ');
                        }
                    }
                    "ET" => {
                        if !page_text.is_empty() && !page_text.ends_with('\n') {
                            page_text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
        }

        pages.push(page_text);
    }

    Ok(pages)
}

/// UTF-16BE when the string carries a byte-order mark, else UTF-8, else Latin-1.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect())
}
