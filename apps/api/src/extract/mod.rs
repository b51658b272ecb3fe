//! Document Text Extractor: uploaded CV bytes → plain text.
//!
//! Nothing touches the filesystem. Bytes are dropped once text is extracted.

pub mod docx;
pub mod handlers;
pub mod pdf;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::cv::{CvDocument, SourceFormat};

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt {format} document: {message}")]
    CorruptDocument {
        format: SourceFormat,
        message: String,
    },

    #[error("No extractable text found in {0} document")]
    NoExtractableText(SourceFormat),
}

impl ExtractError {
    pub(crate) fn corrupt(format: SourceFormat, message: impl Into<String>) -> Self {
        Self::CorruptDocument {
            format,
            message: message.into(),
        }
    }
}

/// Extracts plain text from a CV in the declared format.
pub fn extract_text(bytes: &[u8], format: SourceFormat) -> Result<CvDocument, ExtractError> {
    check_magic(bytes, format)?;

    let raw_text = match format {
        SourceFormat::Pdf => pdf::extract_pdf_text(bytes)?,
        SourceFormat::Docx => docx::extract_docx_text(bytes)?,
    };

    if raw_text.trim().is_empty() {
        return Err(ExtractError::NoExtractableText(format));
    }

    info!(
        "Extracted {} chars from {} document ({} bytes)",
        raw_text.chars().count(),
        format,
        bytes.len()
    );

    Ok(CvDocument {
        raw_text,
        source_format: format,
    })
}

/// Resolves the declared format: an explicit label wins over the file name.
pub fn resolve_format(
    explicit: Option<&str>,
    filename: Option<&str>,
    content_type: Option<&str>,
) -> Result<SourceFormat, ExtractError> {
    let resolved = explicit
        .and_then(SourceFormat::from_label)
        .or_else(|| filename.and_then(SourceFormat::from_filename))
        .or_else(|| content_type.and_then(SourceFormat::from_label));

    resolved.ok_or_else(|| {
        let declared = explicit
            .or(filename)
            .or(content_type)
            .unwrap_or("unknown")
            .to_string();
        debug!("Rejecting upload with unresolvable format: {declared}");
        ExtractError::UnsupportedFormat(declared)
    })
}

fn check_magic(bytes: &[u8], format: SourceFormat) -> Result<(), ExtractError> {
    // PDF allows leading junk before the header; look within the first KiB.
    let found = match format {
        SourceFormat::Pdf => bytes
            .windows(PDF_MAGIC.len())
            .take(1024)
            .any(|w| w == PDF_MAGIC),
        SourceFormat::Docx => bytes.starts_with(ZIP_MAGIC),
    };
    if found {
        Ok(())
    } else {
        Err(ExtractError::corrupt(
            format,
            "file contents do not match the declared format",
        ))
    }
}
