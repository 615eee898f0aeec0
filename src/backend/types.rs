//! Request and response types exchanged with the scheme backend.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::workflow::Answer;

/// MIME type every uploaded scheme document must carry.
pub const PDF_MIME: &str = "application/pdf";

/// Content type assumed for narration when the server does not send one.
pub const DEFAULT_AUDIO_MIME: &str = "audio/mp3";

/// A document selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SchemeFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// A PDF document held in memory.
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, PDF_MIME, bytes)
    }

    /// Read a document from disk, inferring its MIME type.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("scheme.pdf")
            .to_string();
        let mime_type = sniff_mime(&file_name, &bytes);
        Ok(Self::new(file_name, mime_type, bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME)
    }
}

/// Infer a MIME type from the `%PDF-` magic or the file extension.
pub fn sniff_mime(file_name: &str, bytes: &[u8]) -> &'static str {
    let has_pdf_extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if bytes.starts_with(b"%PDF-") || has_pdf_extension {
        PDF_MIME
    } else {
        "application/octet-stream"
    }
}

/// What the user submits from the upload form.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub files: Vec<SchemeFile>,
    pub language_code: String,
}

impl UploadRequest {
    pub fn new(file: SchemeFile, language_code: impl Into<String>) -> Self {
        Self {
            files: vec![file],
            language_code: language_code.into(),
        }
    }

    /// Check the form before anything touches the network.
    ///
    /// Returns the single file to send.
    pub fn validate(&self) -> Result<&SchemeFile, StageError> {
        let [file] = self.files.as_slice() else {
            return Err(StageError::Validation("Please upload one PDF file.".into()));
        };
        if !file.is_pdf() {
            return Err(StageError::Validation("File must be a PDF.".into()));
        }
        if self.language_code.trim().is_empty() {
            return Err(StageError::Validation("Please select a language.".into()));
        }
        Ok(file)
    }

    /// Validate, then hand over the file and trimmed language code.
    pub fn into_parts(mut self) -> Result<(SchemeFile, String), StageError> {
        self.validate()?;
        let language = self.language_code.trim().to_string();
        // validate() guarantees exactly one file.
        let file = self.files.swap_remove(0);
        Ok((file, language))
    }
}

/// Body of `POST /upload_scheme`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "summary_title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "summary", default, skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    /// Newline-delimited plain text, one question per line.
    #[serde(
        rename = "eligibility_questions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub eligibility_questions_raw: Option<String>,
    /// Display name of the language the summary was produced in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// Narration the server already generated, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Extracted document text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryResult {
    /// The summary text, if present and not blank.
    pub fn summary(&self) -> Option<&str> {
        self.summary_text
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

/// Body of `POST /check_eligibility`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRequest {
    pub questions: Vec<String>,
    pub responses: Vec<Answer>,
    pub language: String,
}

/// Response of `POST /check_eligibility`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub is_eligible: bool,
    #[serde(rename = "result", default)]
    pub result_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EligibilityVerdict {
    /// Headline shown above the result text.
    pub fn label(&self) -> &'static str {
        if self.is_eligible {
            "Eligible"
        } else {
            "Not Eligible"
        }
    }
}

/// Body of `POST /generate_audio`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRequest {
    pub summary: String,
    pub language: String,
}

/// Raw narration returned by `POST /generate_audio`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_exactly_one_pdf() {
        let mut request = UploadRequest::new(SchemeFile::pdf("a.pdf", b"%PDF-1.4".to_vec()), "en");
        assert!(request.validate().is_ok());

        request.files.push(SchemeFile::pdf("b.pdf", vec![]));
        assert_eq!(
            request.validate().unwrap_err(),
            StageError::Validation("Please upload one PDF file.".into())
        );

        request.files.clear();
        assert!(matches!(request.validate(), Err(StageError::Validation(_))));
    }

    #[test]
    fn validate_rejects_non_pdf_and_blank_language() {
        let request = UploadRequest::new(SchemeFile::new("a.txt", "text/plain", vec![]), "en");
        assert_eq!(
            request.validate().unwrap_err().to_string(),
            "File must be a PDF."
        );

        let request = UploadRequest::new(SchemeFile::pdf("a.pdf", vec![]), "  ");
        assert_eq!(
            request.validate().unwrap_err().to_string(),
            "Please select a language."
        );
    }

    #[test]
    fn into_parts_moves_the_file_out() {
        let request = UploadRequest::new(SchemeFile::pdf("a.pdf", b"%PDF-1.4".to_vec()), " hi ");
        let (file, language) = request.into_parts().unwrap();
        assert_eq!(file.file_name, "a.pdf");
        assert_eq!(file.bytes, b"%PDF-1.4");
        assert_eq!(language, "hi");

        let request = UploadRequest::new(SchemeFile::pdf("a.pdf", vec![]), "");
        assert!(request.into_parts().is_err());
    }

    #[test]
    fn sniff_by_magic_or_extension() {
        assert_eq!(sniff_mime("scheme.bin", b"%PDF-1.7\n"), PDF_MIME);
        assert_eq!(sniff_mime("SCHEME.PDF", b""), PDF_MIME);
        assert_eq!(sniff_mime("notes.txt", b"hello"), "application/octet-stream");
    }

    #[tokio::test]
    async fn from_path_reads_and_sniffs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pm-kisan");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();

        let file = SchemeFile::from_path(&path).await.unwrap();
        assert_eq!(file.file_name, "pm-kisan");
        assert!(file.is_pdf());
        assert_eq!(file.bytes, b"%PDF-1.4 body");
    }

    #[test]
    fn summary_result_parses_backend_shape() {
        let json = serde_json::json!({
            "success": true,
            "summary_title": "PM-KISAN",
            "summary": "Scheme X helps farmers.",
            "eligibility_questions": "Are you a farmer?\nDo you own land?",
            "language": "English",
            "language_code": "en",
            "audio_url": "http://127.0.0.1:8000/static/temp_audio/x.mp3",
            "audio_base64": "AAAA",
            "raw": "full text"
        });
        let parsed: SummaryResult = serde_json::from_value(json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.title.as_deref(), Some("PM-KISAN"));
        assert_eq!(parsed.summary(), Some("Scheme X helps farmers."));
        assert_eq!(parsed.language_code.as_deref(), Some("en"));
        assert!(parsed.error.is_none());
    }

    #[test]
    fn error_only_body_is_unsuccessful() {
        let parsed: SummaryResult =
            serde_json::from_str(r#"{"error": "No file part"}"#).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error.as_deref(), Some("No file part"));
        assert!(parsed.summary().is_none());
    }

    #[test]
    fn blank_summary_is_not_a_summary() {
        let result = SummaryResult {
            success: true,
            summary_text: Some("  \n".into()),
            ..Default::default()
        };
        assert!(result.summary().is_none());
    }

    #[test]
    fn eligibility_request_wire_shape() {
        let request = EligibilityRequest {
            questions: vec!["Are you a farmer?".into()],
            responses: vec![Answer::Yes],
            language: "hi".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "questions": ["Are you a farmer?"],
                "responses": ["Yes"],
                "language": "hi"
            })
        );
    }

    #[test]
    fn verdict_label() {
        let verdict: EligibilityVerdict = serde_json::from_str(
            r#"{"success": true, "is_eligible": false, "result": "Income exceeds threshold."}"#,
        )
        .unwrap();
        assert_eq!(verdict.label(), "Not Eligible");
        assert_eq!(verdict.result_text, "Income exceeds threshold.");

        let eligible = EligibilityVerdict {
            is_eligible: true,
            ..verdict
        };
        assert_eq!(eligible.label(), "Eligible");
    }
}
