use sqlx::PgPool;

use crate::db::models::Submission;

const COLUMNS: &str = "\
    id, assignment_id, student_id, submission_path, notes, is_late, points, \
    feedback, graded_at, graded_by, created_at, updated_at";

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) assignment_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) submission_path: &'a str,
    pub(crate) notes: Option<&'a str>,
    pub(crate) is_late: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Ok(None) means the (assignment, student) pair already has a submission.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubmission<'_>,
) -> Result<Option<Submission>, sqlx::Error> {
    let result = sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, assignment_id, student_id, submission_path, notes, is_late,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.assignment_id)
    .bind(params.student_id)
    .bind(params.submission_path)
    .bind(params.notes)
    .bind(params.is_late)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await;

    match result {
        Ok(submission) => Ok(Some(submission)),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => Ok(None),
        Err(err) => Err(err),
    }
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(submission_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_for_assignment_student(
    pool: &PgPool,
    assignment_id: &str,
    student_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE assignment_id = $1 AND student_id = $2",
    ))
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_assignment(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE assignment_id = $1
         ORDER BY created_at",
    ))
    .bind(assignment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn grade(
    pool: &PgPool,
    submission_id: &str,
    points: f64,
    feedback: Option<&str>,
    graded_by: &str,
    graded_at: time::PrimitiveDateTime,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions SET
            points = $1,
            feedback = COALESCE($2, feedback),
            graded_by = $3,
            graded_at = $4,
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(points)
    .bind(feedback)
    .bind(graded_by)
    .bind(graded_at)
    .bind(submission_id)
    .fetch_one(pool)
    .await
}
