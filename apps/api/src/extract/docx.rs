//! DOCX text extraction: reads `word/document.xml` out of the zip container and
//! emits one line per `<w:p>` paragraph, in document order.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::extract::ExtractError;
use crate::models::cv::SourceFormat;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_document_part(bytes)?;
    let paragraphs = paragraphs_from_xml(&xml)?;
    Ok(paragraphs.join("\n"))
}

fn read_document_part(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::corrupt(SourceFormat::Docx, e.to_string()))?;

    let mut part = archive.by_name(DOCUMENT_PART).map_err(|_| {
        ExtractError::corrupt(SourceFormat::Docx, format!("missing {DOCUMENT_PART}"))
    })?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ExtractError::corrupt(SourceFormat::Docx, e.to_string()))?;
    Ok(xml)
}

/// Collects paragraph text. Empty paragraphs are kept so the count matches the document.
///
/// Paragraphs nest inside text boxes (`w:txbxContent`). Each paragraph gets its
/// slot when it opens, so an outer paragraph keeps the text on both sides of a
/// text box and comes before the paragraphs inside it. The `mc:Fallback` copy of
/// a text box is skipped; it repeats the text of the preferred rendering.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_text_run = false;
    // Tab stops inside paragraph properties are layout, not content.
    let mut in_properties = false;
    let mut fallback_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ExtractError::corrupt(SourceFormat::Docx, e.to_string()))?;

        match event {
            Event::Eof => break,
            Event::Start(e) if fallback_depth > 0 => {
                if e.local_name().as_ref() == b"Fallback" {
                    fallback_depth += 1;
                }
            }
            Event::End(e) if fallback_depth > 0 => {
                if e.local_name().as_ref() == b"Fallback" {
                    fallback_depth -= 1;
                }
            }
            _ if fallback_depth > 0 => {}
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"t" => in_text_run = true,
                b"pPr" => in_properties = true,
                b"Fallback" => fallback_depth = 1,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if !in_properties => push_to(&mut paragraphs, &open, "\t"),
                b"br" | b"cr" => push_to(&mut paragraphs, &open, "\n"),
                _ => {}
            },
            Event::Text(e) if in_text_run => {
                let text = e
                    .unescape()
                    .map_err(|e| ExtractError::corrupt(SourceFormat::Docx, e.to_string()))?;
                push_to(&mut paragraphs, &open, &text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"pPr" => in_properties = false,
                b"p" => {
                    open.pop();
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Appends to the innermost open paragraph; text outside any paragraph is dropped.
fn push_to(paragraphs: &mut [String], open: &[usize], text: &str) {
    if let Some(paragraph) = open.last().and_then(|&i| paragraphs.get_mut(i)) {
        paragraph.push_str(text);
    }
}
