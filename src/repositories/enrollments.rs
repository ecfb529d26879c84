use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Enrollment;
use crate::db::types::{EnrollmentStatus, UserRole};

const COLUMNS: &str = "\
    id, course_id, student_id, status, final_grade, letter_grade, \
    enrolled_at, completed_at, dropped_at, created_at, updated_at";

/// Outcome of the transactional enroll attempt. Precondition checks run in a
/// fixed order so clients see stable error kinds.
#[derive(Debug)]
pub(crate) enum EnrollOutcome {
    Created(Enrollment),
    CourseNotFound,
    CourseInactive,
    CourseFull,
    StudentNotFound,
    NotAStudent,
    AlreadyEnrolled,
}

#[derive(Debug)]
pub(crate) enum TransitionOutcome {
    Updated(Enrollment),
    CourseFull,
}

#[derive(Debug, sqlx::FromRow)]
struct CourseSeatRow {
    is_active: bool,
    max_students: i32,
}

async fn enrolled_count(
    tx: &mut sqlx::PgConnection,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'enrolled'",
    )
    .bind(course_id)
    .fetch_one(tx)
    .await
}

/// Creates an enrollment while holding a row lock on the course, so two
/// concurrent requests cannot both take the last seat. Capacity counts only
/// rows with status 'enrolled'. The partial unique index on live
/// (student, course) pairs backstops the duplicate check.
pub(crate) async fn enroll(
    pool: &PgPool,
    student_id: &str,
    course_id: &str,
    initial_status: EnrollmentStatus,
    now: time::PrimitiveDateTime,
) -> Result<EnrollOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let course = sqlx::query_as::<_, CourseSeatRow>(
        "SELECT is_active, max_students FROM courses WHERE id = $1 FOR UPDATE",
    )
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(course) = course else {
        return Ok(EnrollOutcome::CourseNotFound);
    };

    if !course.is_active {
        return Ok(EnrollOutcome::CourseInactive);
    }

    let taken = enrolled_count(&mut *tx, course_id).await?;
    if taken >= course.max_students as i64 {
        return Ok(EnrollOutcome::CourseFull);
    }

    let target = sqlx::query_as::<_, (UserRole, bool)>(
        "SELECT role, is_active FROM users WHERE id = $1",
    )
    .bind(student_id)
    .fetch_optional(&mut *tx)
    .await?;

    match target {
        None => return Ok(EnrollOutcome::StudentNotFound),
        Some((UserRole::Student, true)) => {}
        Some(_) => return Ok(EnrollOutcome::NotAStudent),
    }

    let existing = sqlx::query_scalar::<_, String>(
        "SELECT id FROM enrollments
         WHERE student_id = $1 AND course_id = $2
           AND status IN ('pending', 'enrolled')",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await?;

    if existing.is_some() {
        return Ok(EnrollOutcome::AlreadyEnrolled);
    }

    let enrolled_at =
        if initial_status == EnrollmentStatus::Enrolled { Some(now) } else { None };

    let insert = sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (
            id, course_id, student_id, status, enrolled_at, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(course_id)
    .bind(student_id)
    .bind(initial_status)
    .bind(enrolled_at)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await;

    let enrollment = match insert {
        Ok(enrollment) => enrollment,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }
        Err(err) => return Err(err),
    };

    tx.commit().await?;
    Ok(EnrollOutcome::Created(enrollment))
}

/// Applies a status transition, stamping the matching timestamp. Promoting to
/// 'enrolled' re-checks capacity under the course row lock so the enrolled
/// count never exceeds max_students.
pub(crate) async fn transition_status(
    pool: &PgPool,
    enrollment: &Enrollment,
    new_status: EnrollmentStatus,
    now: time::PrimitiveDateTime,
) -> Result<TransitionOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if new_status == EnrollmentStatus::Enrolled {
        let max_students = sqlx::query_scalar::<_, i32>(
            "SELECT max_students FROM courses WHERE id = $1 FOR UPDATE",
        )
        .bind(&enrollment.course_id)
        .fetch_one(&mut *tx)
        .await?;

        let taken = enrolled_count(&mut *tx, &enrollment.course_id).await?;
        if taken >= max_students as i64 {
            return Ok(TransitionOutcome::CourseFull);
        }
    }

    let enrolled_at = (new_status == EnrollmentStatus::Enrolled).then_some(now);
    let completed_at = (new_status == EnrollmentStatus::Completed).then_some(now);
    let dropped_at = (new_status == EnrollmentStatus::Dropped).then_some(now);

    let updated = sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET
            status = $1,
            enrolled_at = COALESCE($2, enrolled_at),
            completed_at = COALESCE($3, completed_at),
            dropped_at = COALESCE($4, dropped_at),
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}",
    ))
    .bind(new_status)
    .bind(enrolled_at)
    .bind(completed_at)
    .bind(dropped_at)
    .bind(now)
    .bind(&enrollment.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(TransitionOutcome::Updated(updated))
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    enrollment_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1"))
        .bind(enrollment_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments ORDER BY created_at DESC OFFSET $1 LIMIT $2",
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments").fetch_one(pool).await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments
         WHERE student_id = $1
         ORDER BY created_at DESC",
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_course(
    pool: &PgPool,
    course_id: &str,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments
         WHERE course_id = $1
         ORDER BY created_at DESC",
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_enrolled_for_student_course(
    pool: &PgPool,
    student_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments
         WHERE student_id = $1 AND course_id = $2 AND status = 'enrolled'",
    ))
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn update_grade(
    pool: &PgPool,
    enrollment_id: &str,
    final_grade: f64,
    letter_grade: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET
            final_grade = $1,
            letter_grade = $2,
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(final_grade)
    .bind(letter_grade)
    .bind(updated_at)
    .bind(enrollment_id)
    .fetch_one(pool)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CourseEnrollmentStats {
    pub(crate) total: i64,
    pub(crate) pending: i64,
    pub(crate) enrolled: i64,
    pub(crate) completed: i64,
    pub(crate) dropped: i64,
    pub(crate) average_grade: Option<f64>,
}

pub(crate) async fn course_stats(
    pool: &PgPool,
    course_id: &str,
) -> Result<CourseEnrollmentStats, sqlx::Error> {
    sqlx::query_as::<_, CourseEnrollmentStats>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'enrolled') AS enrolled,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'dropped') AS dropped,
                AVG(final_grade) AS average_grade
         FROM enrollments
         WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await
}

/// Completed course ids for a student, used by the recommendation heuristic.
pub(crate) async fn completed_course_ids(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT course_id FROM enrollments WHERE student_id = $1 AND status = 'completed'",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}
