use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use validator::Validate;

use crate::api::courses::fetch_course;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Enrollment;
use crate::db::types::{EnrollmentStatus, UserRole};
use crate::repositories;
use crate::repositories::enrollments::{EnrollOutcome, TransitionOutcome};
use crate::schemas::enrollment::{
    CourseEnrollmentStatsResponse, EnrollmentCreate, EnrollmentGradeUpdate, EnrollmentListQuery,
    EnrollmentResponse, EnrollmentStatusUpdate,
};
use crate::services::{access, grading};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments).post(create_enrollment))
        .route("/my", get(my_enrollments))
        .route("/course/:course_id", get(course_enrollments))
        .route("/course/:course_id/stats", get(course_stats))
        .route("/:enrollment_id", get(get_enrollment).delete(drop_enrollment))
        .route("/:enrollment_id/status", patch(update_status))
        .route("/:enrollment_id/grade", patch(update_grade))
}

async fn create_enrollment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentCreate>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    let student_id = match access::resolve_enroll_target(&user, payload.student_id.as_deref()) {
        access::EnrollTarget::Student(id) => id,
        access::EnrollTarget::ForbiddenMismatch => {
            return Err(ApiError::Forbidden("Students may only enroll themselves"));
        }
        access::EnrollTarget::MissingStudentId => {
            return Err(ApiError::BadRequest("student_id is required".to_string()));
        }
    };

    let initial_status = payload.status.unwrap_or(EnrollmentStatus::Pending);
    if !initial_status.is_live() {
        return Err(ApiError::BadRequest(
            "Initial status must be pending or enrolled".to_string(),
        ));
    }
    if user.role == UserRole::Student && initial_status != EnrollmentStatus::Pending {
        return Err(ApiError::Forbidden("Students enroll with pending status"));
    }

    let outcome = repositories::enrollments::enroll(
        state.db(),
        &student_id,
        &payload.course_id,
        initial_status,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create enrollment"))?;

    let enrollment = match outcome {
        EnrollOutcome::Created(enrollment) => enrollment,
        EnrollOutcome::CourseNotFound => {
            return Err(ApiError::NotFound("Course not found".to_string()));
        }
        EnrollOutcome::CourseInactive => {
            return Err(ApiError::UnprocessableEntity("Course is not active".to_string()));
        }
        EnrollOutcome::CourseFull => {
            return Err(ApiError::UnprocessableEntity("Course is full".to_string()));
        }
        EnrollOutcome::StudentNotFound => {
            return Err(ApiError::NotFound("Student not found".to_string()));
        }
        EnrollOutcome::NotAStudent => {
            return Err(ApiError::UnprocessableEntity(
                "Target user is not an active student".to_string(),
            ));
        }
        EnrollOutcome::AlreadyEnrolled => {
            return Err(ApiError::Conflict(
                "Student already has a live enrollment in this course".to_string(),
            ));
        }
    };

    tracing::info!(
        actor_id = %user.id,
        student_id = %enrollment.student_id,
        course_id = %enrollment.course_id,
        status = ?enrollment.status,
        action = "enrollment_create",
        "Enrollment created"
    );

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from_db(enrollment))))
}

async fn list_enrollments(
    Query(params): Query<EnrollmentListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<EnrollmentResponse>>, ApiError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or_else(default_limit).clamp(1, 1000);

    let enrollments = repositories::enrollments::list(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;
    let total_count = repositories::enrollments::count(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    Ok(Json(PaginatedResponse {
        items: enrollments.into_iter().map(EnrollmentResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn my_enrollments(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrollmentResponse>>, ApiError> {
    let enrollments = repositories::enrollments::list_for_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(enrollments.into_iter().map(EnrollmentResponse::from_db).collect()))
}

async fn course_enrollments(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrollmentResponse>>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    if !access::can_view_course_enrollments(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this course"));
    }

    let enrollments = repositories::enrollments::list_for_course(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(enrollments.into_iter().map(EnrollmentResponse::from_db).collect()))
}

async fn course_stats(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseEnrollmentStatsResponse>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    if !access::can_view_course_enrollments(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this course"));
    }

    let stats = repositories::enrollments::course_stats(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load enrollment stats"))?;

    Ok(Json(CourseEnrollmentStatsResponse {
        course_id,
        total: stats.total,
        pending: stats.pending,
        enrolled: stats.enrolled,
        completed: stats.completed,
        dropped: stats.dropped,
        average_grade: stats.average_grade,
    }))
}

async fn get_enrollment(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = fetch_enrollment(&state, &enrollment_id).await?;
    let course = fetch_course(&state, &enrollment.course_id).await?;

    if !access::can_view_enrollment(&user, &enrollment, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this enrollment"));
    }

    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}

async fn update_status(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentStatusUpdate>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = fetch_enrollment(&state, &enrollment_id).await?;
    let course = fetch_course(&state, &enrollment.course_id).await?;

    if !access::can_update_enrollment_status(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this enrollment"));
    }

    if !enrollment.status.can_transition_to(payload.status) {
        return Err(ApiError::UnprocessableEntity(format!(
            "Cannot transition enrollment from {:?} to {:?}",
            enrollment.status, payload.status
        )));
    }

    let outcome = repositories::enrollments::transition_status(
        state.db(),
        &enrollment,
        payload.status,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update enrollment status"))?;

    let updated = match outcome {
        TransitionOutcome::Updated(enrollment) => enrollment,
        TransitionOutcome::CourseFull => {
            return Err(ApiError::UnprocessableEntity("Course is full".to_string()));
        }
    };

    tracing::info!(
        actor_id = %user.id,
        enrollment_id = %updated.id,
        status = ?updated.status,
        action = "enrollment_status",
        "Enrollment status updated"
    );

    Ok(Json(EnrollmentResponse::from_db(updated)))
}

async fn update_grade(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentGradeUpdate>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let enrollment = fetch_enrollment(&state, &enrollment_id).await?;
    let course = fetch_course(&state, &enrollment.course_id).await?;

    if !access::can_grade_enrollment(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this enrollment"));
    }

    if !grading::final_grade_in_bounds(payload.final_grade) {
        return Err(ApiError::BadRequest("final_grade must be between 0 and 100".to_string()));
    }

    if !grading::status_accepts_grade(enrollment.status) {
        return Err(ApiError::UnprocessableEntity(format!(
            "Cannot grade an enrollment in {:?} status",
            enrollment.status
        )));
    }

    let letter = grading::letter_grade(payload.final_grade);
    let updated = repositories::enrollments::update_grade(
        state.db(),
        &enrollment_id,
        payload.final_grade,
        letter,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update grade"))?;

    tracing::info!(
        actor_id = %user.id,
        enrollment_id = %updated.id,
        final_grade = payload.final_grade,
        letter_grade = letter,
        action = "enrollment_grade",
        "Final grade recorded"
    );

    Ok(Json(EnrollmentResponse::from_db(updated)))
}

/// DELETE marks the enrollment dropped rather than removing the row, so the
/// history survives for transcripts and statistics.
async fn drop_enrollment(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = fetch_enrollment(&state, &enrollment_id).await?;
    let course = fetch_course(&state, &enrollment.course_id).await?;

    if !access::can_remove_enrollment(&user, &enrollment, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this enrollment"));
    }

    if !enrollment.status.can_transition_to(EnrollmentStatus::Dropped) {
        return Err(ApiError::UnprocessableEntity(format!(
            "Cannot drop an enrollment in {:?} status",
            enrollment.status
        )));
    }

    let outcome = repositories::enrollments::transition_status(
        state.db(),
        &enrollment,
        EnrollmentStatus::Dropped,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to drop enrollment"))?;

    let updated = match outcome {
        TransitionOutcome::Updated(enrollment) => enrollment,
        TransitionOutcome::CourseFull => {
            return Err(ApiError::internal("unexpected capacity check on drop", "Failed to drop"));
        }
    };

    tracing::info!(
        actor_id = %user.id,
        enrollment_id = %updated.id,
        action = "enrollment_drop",
        "Enrollment dropped"
    );

    Ok(Json(EnrollmentResponse::from_db(updated)))
}

async fn fetch_enrollment(
    state: &AppState,
    enrollment_id: &str,
) -> Result<Enrollment, ApiError> {
    repositories::enrollments::find_by_id(state.db(), enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn capacity_frees_after_drop() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let admin = test_support::insert_admin(ctx.state.db(), "root@university.edu").await;
        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS101", &lecturer.id, 1).await;
        let alice =
            test_support::insert_student(ctx.state.db(), "alice@university.edu", "pw-alice").await;
        let bella =
            test_support::insert_student(ctx.state.db(), "bella@university.edu", "pw-bella").await;
        let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

        // Admin enrolls Alice directly into the single seat.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/enrollments",
                Some(&admin_token),
                Some(json!({
                    "course_id": course.id,
                    "student_id": alice.id,
                    "status": "enrolled"
                })),
            ))
            .await
            .expect("enroll alice");
        let status = response.status();
        let alice_enrollment = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {alice_enrollment}");
        assert_eq!(alice_enrollment["status"], "enrolled");
        assert!(alice_enrollment["enrolled_at"].is_string());

        // Second enrolled-status enrollment must hit the capacity check.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/enrollments",
                Some(&admin_token),
                Some(json!({
                    "course_id": course.id,
                    "student_id": bella.id,
                    "status": "enrolled"
                })),
            ))
            .await
            .expect("enroll bella");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Dropping Alice frees the seat.
        let alice_id = alice_enrollment["id"].as_str().expect("id");
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                &format!("/api/v1/enrollments/{alice_id}"),
                Some(&admin_token),
                None,
            ))
            .await
            .expect("drop alice");
        assert_eq!(response.status(), StatusCode::OK);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/enrollments",
                Some(&admin_token),
                Some(json!({
                    "course_id": course.id,
                    "student_id": bella.id,
                    "status": "enrolled"
                })),
            ))
            .await
            .expect("enroll bella again");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn duplicate_live_enrollment_conflicts() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS102", &lecturer.id, 30).await;
        let student =
            test_support::insert_student(ctx.state.db(), "stu@university.edu", "pw-stu").await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let payload = json!({"course_id": course.id});
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/enrollments",
                Some(&token),
                Some(payload.clone()),
            ))
            .await
            .expect("first enroll");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/enrollments",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("second enroll");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn student_cannot_enroll_someone_else() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS103", &lecturer.id, 30).await;
        let student =
            test_support::insert_student(ctx.state.db(), "stu@university.edu", "pw-stu").await;
        let other =
            test_support::insert_student(ctx.state.db(), "other@university.edu", "pw-other").await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/enrollments",
                Some(&token),
                Some(json!({"course_id": course.id, "student_id": other.id})),
            ))
            .await
            .expect("enroll other");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn grade_records_letter_and_rejects_bad_states() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS104", &lecturer.id, 30).await;
        let student =
            test_support::insert_student(ctx.state.db(), "stu@university.edu", "pw-stu").await;
        let enrollment = test_support::insert_enrollment(
            ctx.state.db(),
            &course.id,
            &student.id,
            crate::db::types::EnrollmentStatus::Enrolled,
        )
        .await;
        let token = test_support::bearer_token(&lecturer.id, ctx.state.settings());

        // Out-of-range grades are rejected.
        for bad in [-1.0, 101.0] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::PATCH,
                    &format!("/api/v1/enrollments/{}/grade", enrollment.id),
                    Some(&token),
                    Some(json!({"final_grade": bad})),
                ))
                .await
                .expect("bad grade");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "grade {bad}");
        }

        // Both ends of the valid range succeed, and re-grading overwrites.
        for (grade, letter) in [(0.0, "F"), (100.0, "A"), (90.0, "A")] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::PATCH,
                    &format!("/api/v1/enrollments/{}/grade", enrollment.id),
                    Some(&token),
                    Some(json!({"final_grade": grade})),
                ))
                .await
                .expect("grade");
            let status = response.status();
            let graded = test_support::read_json(response).await;
            assert_eq!(status, StatusCode::OK, "response: {graded}");
            assert_eq!(graded["final_grade"], grade);
            assert_eq!(graded["letter_grade"], letter);
        }
    }

    #[tokio::test]
    async fn student_cannot_drop_completed_enrollment() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS105", &lecturer.id, 30).await;
        let student =
            test_support::insert_student(ctx.state.db(), "stu@university.edu", "pw-stu").await;
        let enrollment = test_support::insert_enrollment(
            ctx.state.db(),
            &course.id,
            &student.id,
            crate::db::types::EnrollmentStatus::Completed,
        )
        .await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                &format!("/api/v1/enrollments/{}", enrollment.id),
                Some(&token),
                None,
            ))
            .await
            .expect("drop completed");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn invalid_status_transition_is_rejected() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS106", &lecturer.id, 30).await;
        let student =
            test_support::insert_student(ctx.state.db(), "stu@university.edu", "pw-stu").await;
        let enrollment = test_support::insert_enrollment(
            ctx.state.db(),
            &course.id,
            &student.id,
            crate::db::types::EnrollmentStatus::Pending,
        )
        .await;
        let token = test_support::bearer_token(&lecturer.id, ctx.state.settings());

        // Pending cannot jump straight to completed.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/v1/enrollments/{}/status", enrollment.id),
                Some(&token),
                Some(json!({"status": "completed"})),
            ))
            .await
            .expect("bad transition");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/v1/enrollments/{}/status", enrollment.id),
                Some(&token),
                Some(json!({"status": "enrolled"})),
            ))
            .await
            .expect("good transition");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["status"], "enrolled");
    }
}
