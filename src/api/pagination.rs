use serde::Serialize;

/// Default page size for list endpoints that omit `limit`.
pub(crate) const fn default_limit() -> i64 {
    100
}

/// Skip/limit page wrapper shared by the user, course, and enrollment
/// listings. `total_count` ignores pagination so clients can page through.
#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}
