use sqlx::PgPool;

use crate::db::models::UploadedFile;
use crate::db::types::UploadPurpose;

const COLUMNS: &str = "\
    id, owner_id, purpose, filename, content_type, size_bytes, checksum, \
    storage_key, created_at";

pub(crate) struct CreateUploadedFile<'a> {
    pub(crate) id: &'a str,
    pub(crate) owner_id: &'a str,
    pub(crate) purpose: UploadPurpose,
    pub(crate) filename: &'a str,
    pub(crate) content_type: &'a str,
    pub(crate) size_bytes: i64,
    pub(crate) checksum: &'a str,
    pub(crate) storage_key: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateUploadedFile<'_>,
) -> Result<UploadedFile, sqlx::Error> {
    sqlx::query_as::<_, UploadedFile>(&format!(
        "INSERT INTO uploaded_files (
            id, owner_id, purpose, filename, content_type, size_bytes,
            checksum, storage_key, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.owner_id)
    .bind(params.purpose)
    .bind(params.filename)
    .bind(params.content_type)
    .bind(params.size_bytes)
    .bind(params.checksum)
    .bind(params.storage_key)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    file_id: &str,
) -> Result<Option<UploadedFile>, sqlx::Error> {
    sqlx::query_as::<_, UploadedFile>(&format!(
        "SELECT {COLUMNS} FROM uploaded_files WHERE id = $1",
    ))
    .bind(file_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_owner(
    pool: &PgPool,
    owner_id: &str,
) -> Result<Vec<UploadedFile>, sqlx::Error> {
    sqlx::query_as::<_, UploadedFile>(&format!(
        "SELECT {COLUMNS} FROM uploaded_files
         WHERE owner_id = $1
         ORDER BY created_at DESC",
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
}
