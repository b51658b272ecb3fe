use std::fmt;

use serde::{Deserialize, Serialize};

/// Container formats accepted for an uploaded CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Docx,
}

impl SourceFormat {
    /// Resolves a format from a file name's extension (`cv.PDF`, `resume.docx`).
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_label(ext)
    }

    /// Resolves a format from an explicit label or a MIME type.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "pdf" | "application/pdf" => Some(Self::Pdf),
            "docx"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Docx => write!(f, "DOCX"),
        }
    }
}

/// Plain text extracted from an uploaded CV. The uploaded bytes are not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvDocument {
    pub raw_text: String,
    pub source_format: SourceFormat,
}
