use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{sanitized_filename, validate_upload};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UploadPurpose;
use crate::repositories;
use crate::schemas::upload::{DownloadUrlResponse, UploadedFileResponse};
use crate::services::access;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_uploads).post(upload_file))
        .route("/:file_id", get(get_upload))
        .route("/:file_id/download", get(download_url))
}

async fn upload_file(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedFileResponse>), ApiError> {
    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut purpose: Option<UploadPurpose> = None;
    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            content_type = field.content_type().map(|s| s.to_string());
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                let next_size = bytes.len() as u64 + chunk.len() as u64;
                if next_size > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {}MB limit",
                        state.settings().storage().max_upload_size_mb
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            file_bytes = Some(bytes);
        } else if name == "purpose" {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest("Invalid purpose field".to_string()))?;
            purpose = Some(parse_purpose(&text)?);
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    let filename =
        filename.ok_or_else(|| ApiError::BadRequest("Filename is required".to_string()))?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    let purpose = purpose.unwrap_or(UploadPurpose::Submission);

    validate_upload(
        &filename,
        &content_type,
        &state.settings().storage().allowed_upload_extensions,
    )?;

    let file_id = Uuid::new_v4().to_string();
    let safe_name = sanitized_filename(&filename);
    let storage_key = format!("uploads/{}/{file_id}_{safe_name}", user.id);

    let (size_bytes, checksum) = storage
        .upload_bytes(&storage_key, &content_type, file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store file"))?;

    let record = repositories::uploads::create(
        state.db(),
        repositories::uploads::CreateUploadedFile {
            id: &file_id,
            owner_id: &user.id,
            purpose,
            filename: &safe_name,
            content_type: &content_type,
            size_bytes,
            checksum: &checksum,
            storage_key: &storage_key,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record uploaded file"))?;

    tracing::info!(
        owner_id = %user.id,
        file_id = %record.id,
        size_bytes,
        action = "file_upload",
        "File uploaded"
    );

    Ok((StatusCode::CREATED, Json(UploadedFileResponse::from_db(record))))
}

async fn list_my_uploads(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UploadedFileResponse>>, ApiError> {
    let files = repositories::uploads::list_for_owner(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list uploads"))?;

    Ok(Json(files.into_iter().map(UploadedFileResponse::from_db).collect()))
}

async fn get_upload(
    Path(file_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UploadedFileResponse>, ApiError> {
    let file = repositories::uploads::find_by_id(state.db(), &file_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch uploaded file"))?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    if file.owner_id != user.id && !access::is_admin(&user) {
        return Err(ApiError::Forbidden("Not enough permissions for this file"));
    }

    Ok(Json(UploadedFileResponse::from_db(file)))
}

async fn download_url(
    Path(file_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;

    let file = repositories::uploads::find_by_id(state.db(), &file_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch uploaded file"))?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    if file.owner_id != user.id && !access::is_admin(&user) {
        return Err(ApiError::Forbidden("Not enough permissions for this file"));
    }

    let expires_in_minutes = state.settings().storage().presigned_url_expire_minutes;
    let url = storage
        .presign_get(&file.storage_key, std::time::Duration::from_secs(expires_in_minutes * 60))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate download URL"))?;

    Ok(Json(DownloadUrlResponse { url, expires_in_minutes }))
}

fn parse_purpose(raw: &str) -> Result<UploadPurpose, ApiError> {
    match raw.trim() {
        "syllabus" => Ok(UploadPurpose::Syllabus),
        "assignment_attachment" => Ok(UploadPurpose::AssignmentAttachment),
        "submission" => Ok(UploadPurpose::Submission),
        other => Err(ApiError::BadRequest(format!("Unknown upload purpose '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_purpose;
    use crate::db::types::UploadPurpose;

    #[test]
    fn purpose_parses_known_values() {
        assert!(matches!(parse_purpose("syllabus"), Ok(UploadPurpose::Syllabus)));
        assert!(matches!(
            parse_purpose("assignment_attachment"),
            Ok(UploadPurpose::AssignmentAttachment)
        ));
        assert!(matches!(parse_purpose(" submission "), Ok(UploadPurpose::Submission)));
        assert!(parse_purpose("unknown").is_err());
    }
}
