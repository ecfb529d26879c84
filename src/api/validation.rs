use std::path::Path;

use crate::api::errors::ApiError;

pub(crate) fn validate_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if mime_allowed_for_extension(&mime, &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "pdf" => mime == "application/pdf",
        "doc" => mime == "application/msword",
        "docx" => {
            mime == "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        "txt" => matches!(mime, "text/plain" | "text/plain; charset=utf-8"),
        "zip" => matches!(mime, "application/zip" | "application/x-zip-compressed"),
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        _ => false,
    }
}

/// Keeps only characters safe for an object storage key.
pub(crate) fn sanitized_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["pdf", "txt", "zip", "png"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_matching_extension_and_mime() {
        assert!(validate_upload("report.pdf", "application/pdf", &allowed()).is_ok());
        assert!(validate_upload("notes.TXT", "text/plain", &allowed()).is_ok());
    }

    #[test]
    fn rejects_disallowed_extension() {
        assert!(validate_upload("malware.exe", "application/octet-stream", &allowed()).is_err());
        assert!(validate_upload("noextension", "application/pdf", &allowed()).is_err());
    }

    #[test]
    fn rejects_mime_mismatch() {
        assert!(validate_upload("report.pdf", "image/png", &allowed()).is_err());
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitized_filename("my report (final).pdf"), "my_report__final_.pdf");
        assert_eq!(sanitized_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitized_filename(""), "file");
    }
}
