use std::collections::HashMap;

use sqlx::PgPool;

use crate::db::models::Course;

const COLUMNS: &str = "\
    id, code, title, description, credits, department, semester, year, \
    max_students, syllabus_path, is_active, lecturer_id, created_at, updated_at";

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) code: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) credits: i32,
    pub(crate) department: &'a str,
    pub(crate) semester: &'a str,
    pub(crate) year: i32,
    pub(crate) max_students: i32,
    pub(crate) lecturer_id: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (
            id, code, title, description, credits, department, semester, year,
            max_students, lecturer_id, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.code)
    .bind(params.title)
    .bind(params.description)
    .bind(params.credits)
    .bind(params.department)
    .bind(params.semester)
    .bind(params.year)
    .bind(params.max_students)
    .bind(params.lecturer_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM courses WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub(crate) struct UpdateCourse {
    pub(crate) code: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) credits: Option<i32>,
    pub(crate) department: Option<String>,
    pub(crate) semester: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) max_students: Option<i32>,
    pub(crate) syllabus_path: Option<String>,
    pub(crate) is_active: Option<bool>,
    pub(crate) lecturer_id: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    course_id: &str,
    params: UpdateCourse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE courses SET
            code = COALESCE($1, code),
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            credits = COALESCE($4, credits),
            department = COALESCE($5, department),
            semester = COALESCE($6, semester),
            year = COALESCE($7, year),
            max_students = COALESCE($8, max_students),
            syllabus_path = COALESCE($9, syllabus_path),
            is_active = COALESCE($10, is_active),
            lecturer_id = COALESCE($11, lecturer_id),
            updated_at = $12
         WHERE id = $13",
    )
    .bind(params.code)
    .bind(params.title)
    .bind(params.description)
    .bind(params.credits)
    .bind(params.department)
    .bind(params.semester)
    .bind(params.year)
    .bind(params.max_students)
    .bind(params.syllabus_path)
    .bind(params.is_active)
    .bind(params.lecturer_id)
    .bind(params.updated_at)
    .bind(course_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct CourseFilter {
    pub(crate) department: Option<String>,
    pub(crate) semester: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) lecturer_id: Option<String>,
    pub(crate) is_active: Option<bool>,
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &CourseFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COLUMNS} FROM courses
         WHERE ($1::varchar IS NULL OR department = $1)
           AND ($2::varchar IS NULL OR semester = $2)
           AND ($3::int IS NULL OR year = $3)
           AND ($4::varchar IS NULL OR lecturer_id = $4)
           AND ($5::bool IS NULL OR is_active = $5)
         ORDER BY code
         OFFSET $6 LIMIT $7",
    ))
    .bind(&filter.department)
    .bind(&filter.semester)
    .bind(filter.year)
    .bind(&filter.lecturer_id)
    .bind(filter.is_active)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count(pool: &PgPool, filter: &CourseFilter) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM courses
         WHERE ($1::varchar IS NULL OR department = $1)
           AND ($2::varchar IS NULL OR semester = $2)
           AND ($3::int IS NULL OR year = $3)
           AND ($4::varchar IS NULL OR lecturer_id = $4)
           AND ($5::bool IS NULL OR is_active = $5)",
    )
    .bind(&filter.department)
    .bind(&filter.semester)
    .bind(filter.year)
    .bind(&filter.lecturer_id)
    .bind(filter.is_active)
    .fetch_one(pool)
    .await
}

/// Seats taken; only rows with status 'enrolled' count toward capacity.
pub(crate) async fn enrolled_count(pool: &PgPool, course_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'enrolled'",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn enrolled_counts(
    pool: &PgPool,
    course_ids: &[String],
) -> Result<HashMap<String, i64>, sqlx::Error> {
    if course_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT course_id, COUNT(*) FROM enrollments
         WHERE course_id = ANY($1) AND status = 'enrolled'
         GROUP BY course_id",
    )
    .bind(course_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

pub(crate) async fn delete(pool: &PgPool, course_id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM courses WHERE id = $1").bind(course_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
