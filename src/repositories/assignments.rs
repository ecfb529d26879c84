use sqlx::PgPool;

use crate::db::models::Assignment;
use crate::db::types::AssignmentKind;

const COLUMNS: &str = "\
    id, course_id, created_by, title, description, instructions, kind, \
    max_points, due_date, available_from, available_until, is_active, \
    allow_late_submission, late_penalty_percentage, attachment_path, \
    created_at, updated_at";

pub(crate) struct CreateAssignment<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) created_by: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) instructions: Option<&'a str>,
    pub(crate) kind: AssignmentKind,
    pub(crate) max_points: i32,
    pub(crate) due_date: time::PrimitiveDateTime,
    pub(crate) available_from: Option<time::PrimitiveDateTime>,
    pub(crate) available_until: Option<time::PrimitiveDateTime>,
    pub(crate) allow_late_submission: bool,
    pub(crate) late_penalty_percentage: i32,
    pub(crate) attachment_path: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssignment<'_>,
) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO assignments (
            id, course_id, created_by, title, description, instructions, kind,
            max_points, due_date, available_from, available_until,
            allow_late_submission, late_penalty_percentage, attachment_path,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.created_by)
    .bind(params.title)
    .bind(params.description)
    .bind(params.instructions)
    .bind(params.kind)
    .bind(params.max_points)
    .bind(params.due_date)
    .bind(params.available_from)
    .bind(params.available_until)
    .bind(params.allow_late_submission)
    .bind(params.late_penalty_percentage)
    .bind(params.attachment_path)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = $1"))
        .bind(assignment_id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct UpdateAssignment {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) instructions: Option<String>,
    pub(crate) max_points: Option<i32>,
    pub(crate) due_date: Option<time::PrimitiveDateTime>,
    pub(crate) available_from: Option<time::PrimitiveDateTime>,
    pub(crate) available_until: Option<time::PrimitiveDateTime>,
    pub(crate) is_active: Option<bool>,
    pub(crate) allow_late_submission: Option<bool>,
    pub(crate) late_penalty_percentage: Option<i32>,
    pub(crate) attachment_path: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    assignment_id: &str,
    params: UpdateAssignment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assignments SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            instructions = COALESCE($3, instructions),
            max_points = COALESCE($4, max_points),
            due_date = COALESCE($5, due_date),
            available_from = COALESCE($6, available_from),
            available_until = COALESCE($7, available_until),
            is_active = COALESCE($8, is_active),
            allow_late_submission = COALESCE($9, allow_late_submission),
            late_penalty_percentage = COALESCE($10, late_penalty_percentage),
            attachment_path = COALESCE($11, attachment_path),
            updated_at = $12
         WHERE id = $13",
    )
    .bind(params.title)
    .bind(params.description)
    .bind(params.instructions)
    .bind(params.max_points)
    .bind(params.due_date)
    .bind(params.available_from)
    .bind(params.available_until)
    .bind(params.is_active)
    .bind(params.allow_late_submission)
    .bind(params.late_penalty_percentage)
    .bind(params.attachment_path)
    .bind(params.updated_at)
    .bind(assignment_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn list_for_course(
    pool: &PgPool,
    course_id: &str,
    include_inactive: bool,
) -> Result<Vec<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM assignments
         WHERE course_id = $1 AND ($2 OR is_active)
         ORDER BY due_date",
    ))
    .bind(course_id)
    .bind(include_inactive)
    .fetch_all(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, assignment_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
        .bind(assignment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
