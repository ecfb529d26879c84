use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::UploadedFile;
use crate::db::types::UploadPurpose;

#[derive(Debug, Serialize)]
pub(crate) struct UploadedFileResponse {
    pub(crate) id: String,
    pub(crate) owner_id: String,
    pub(crate) purpose: UploadPurpose,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) size_bytes: i64,
    pub(crate) checksum: String,
    pub(crate) storage_key: String,
    pub(crate) created_at: String,
}

impl UploadedFileResponse {
    pub(crate) fn from_db(file: UploadedFile) -> Self {
        Self {
            id: file.id,
            owner_id: file.owner_id,
            purpose: file.purpose,
            filename: file.filename,
            content_type: file.content_type,
            size_bytes: file.size_bytes,
            checksum: file.checksum,
            storage_key: file.storage_key,
            created_at: format_primitive(file.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadUrlResponse {
    pub(crate) url: String,
    pub(crate) expires_in_minutes: u64,
}
