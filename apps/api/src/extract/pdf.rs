//! PDF text extraction: `pdf-extract` first, `lopdf` page-by-page as the fallback.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::extract::ExtractError;
use crate::models::cv::SourceFormat;

/// Returns the document text in page order.
///
/// Image-only PDFs produce no text from either library; that surfaces as
/// `NoExtractableText` from the caller, not as an empty string.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let primary = extract_primary(bytes);
    match &primary {
        Ok(text) if !text.trim().is_empty() => return Ok(normalise(text)),
        Ok(_) => debug!("pdf-extract produced no text, trying lopdf"),
        Err(e) => warn!("pdf-extract failed ({e}), trying lopdf"),
    }

    match extract_fallback(bytes) {
        Ok(text) if !text.trim().is_empty() => Ok(normalise(&text)),
        Ok(_) => Err(ExtractError::NoExtractableText(SourceFormat::Pdf)),
        // The primary parsed the file, so it is readable but textless.
        Err(_) if primary.is_ok() => Err(ExtractError::NoExtractableText(SourceFormat::Pdf)),
        Err(e) => Err(ExtractError::corrupt(SourceFormat::Pdf, e)),
    }
}

fn extract_primary(bytes: &[u8]) -> Result<String, String> {
    // pdf-extract panics on some malformed font tables.
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf-extract panicked while decoding".to_string()),
    }
}

fn extract_fallback(bytes: &[u8]) -> Result<String, String> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
    let mut pages = Vec::new();

    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => debug!("lopdf could not read page {page_number}: {e}"),
        }
    }

    Ok(pages.join("\n"))
}

/// Trims trailing whitespace per line and collapses runs of blank lines.
fn normalise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    use super::*;

    /// Builds an in-memory PDF with one page per entry of `pages`.
    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let mut operations = Vec::new();
            if !text.is_empty() {
                operations = vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ];
            }
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_extracts_pages_in_order() {
        let bytes = build_pdf(&["Jane Smith Data Analyst", "3 years SQL experience"]);
        let text = extract_pdf_text(&bytes).unwrap();

        let first = text.find("Jane Smith").expect("first page text");
        let second = text.find("SQL experience").expect("second page text");
        assert!(first < second);
    }

    #[test]
    fn test_image_only_pdf_has_no_extractable_text() {
        let bytes = build_pdf(&[""]);
        assert_eq!(
            extract_pdf_text(&bytes),
            Err(ExtractError::NoExtractableText(SourceFormat::Pdf))
        );
    }

    #[test]
    fn test_truncated_pdf_is_corrupt() {
        let err = extract_pdf_text(b"%PDF-1.5\n1 0 obj <<").unwrap_err();
        assert!(matches!(err, ExtractError::CorruptDocument { .. }));
    }

    #[test]
    fn test_normalise_collapses_blank_runs() {
        assert_eq!(normalise("a  \n\n\n\nb\n"), "a\n\nb");
    }
}
