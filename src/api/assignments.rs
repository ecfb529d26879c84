use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::courses::fetch_course;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::{Assignment, Submission};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::assignment::{
    AssignmentCreate, AssignmentResponse, AssignmentUpdate, SubmissionCreate,
    SubmissionGradeRequest, SubmissionResponse,
};
use crate::services::{access, grading};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_assignment))
        .route("/course/:course_id", get(course_assignments))
        .route("/:assignment_id", get(get_assignment).patch(update_assignment).delete(delete_assignment))
        .route("/:assignment_id/submissions", get(list_submissions).post(submit))
        .route("/:assignment_id/submissions/my", get(my_submission))
        .route("/:assignment_id/submissions/:submission_id", get(get_submission))
        .route("/:assignment_id/submissions/:submission_id/grade", post(grade_submission))
}

async fn create_assignment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let course = fetch_course(&state, &payload.course_id).await?;
    if !access::can_create_assignment(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this course"));
    }

    let now = primitive_now_utc();
    let assignment = repositories::assignments::create(
        state.db(),
        repositories::assignments::CreateAssignment {
            id: &Uuid::new_v4().to_string(),
            course_id: &course.id,
            created_by: &user.id,
            title: &payload.title,
            description: &payload.description,
            instructions: payload.instructions.as_deref(),
            kind: payload.kind,
            max_points: payload.max_points,
            due_date: to_primitive_utc(payload.due_date),
            available_from: payload.available_from.map(to_primitive_utc),
            available_until: payload.available_until.map(to_primitive_utc),
            allow_late_submission: payload.allow_late_submission,
            late_penalty_percentage: payload.late_penalty_percentage,
            attachment_path: payload.attachment_path.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assignment"))?;

    tracing::info!(
        actor_id = %user.id,
        assignment_id = %assignment.id,
        course_id = %assignment.course_id,
        action = "assignment_create",
        "Assignment created"
    );

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment, now))))
}

async fn course_assignments(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;

    // Staff see drafts too; students only see published assignments.
    let include_inactive = access::can_manage_course(&user, &course);
    let assignments =
        repositories::assignments::list_for_course(state.db(), &course_id, include_inactive)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;

    let now = primitive_now_utc();
    Ok(Json(
        assignments
            .into_iter()
            .map(|assignment| AssignmentResponse::from_db(assignment, now))
            .collect(),
    ))
}

async fn get_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    Ok(Json(AssignmentResponse::from_db(assignment, primitive_now_utc())))
}

async fn update_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let course = fetch_course(&state, &assignment.course_id).await?;
    if !access::can_manage_assignment(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this assignment"));
    }

    repositories::assignments::update(
        state.db(),
        &assignment_id,
        repositories::assignments::UpdateAssignment {
            title: payload.title,
            description: payload.description,
            instructions: payload.instructions,
            max_points: payload.max_points,
            due_date: payload.due_date.map(to_primitive_utc),
            available_from: payload.available_from.map(to_primitive_utc),
            available_until: payload.available_until.map(to_primitive_utc),
            is_active: payload.is_active,
            allow_late_submission: payload.allow_late_submission,
            late_penalty_percentage: payload.late_penalty_percentage,
            attachment_path: payload.attachment_path,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update assignment"))?;

    let updated = fetch_assignment(&state, &assignment_id).await?;
    Ok(Json(AssignmentResponse::from_db(updated, primitive_now_utc())))
}

async fn delete_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let course = fetch_course(&state, &assignment.course_id).await?;
    if !access::can_manage_assignment(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this assignment"));
    }

    repositories::assignments::delete(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assignment"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn submit(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if user.role != UserRole::Student {
        return Err(ApiError::Forbidden("Only students may submit work"));
    }

    let assignment = fetch_assignment(&state, &assignment_id).await?;
    if !assignment.is_active {
        return Err(ApiError::UnprocessableEntity("Assignment is not active".to_string()));
    }

    let enrollment = repositories::enrollments::find_enrolled_for_student_course(
        state.db(),
        &user.id,
        &assignment.course_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;
    if enrollment.is_none() {
        return Err(ApiError::Forbidden("Active enrollment in the course is required"));
    }

    let now = primitive_now_utc();

    if let Some(available_from) = assignment.available_from {
        if now < available_from {
            return Err(ApiError::UnprocessableEntity(
                "Assignment is not yet available".to_string(),
            ));
        }
    }
    if let Some(available_until) = assignment.available_until {
        if now > available_until {
            return Err(ApiError::UnprocessableEntity(
                "Assignment is no longer available".to_string(),
            ));
        }
    }

    let is_late = now > assignment.due_date;
    if is_late && !assignment.allow_late_submission {
        return Err(ApiError::UnprocessableEntity(
            "The deadline has passed and late submissions are not allowed".to_string(),
        ));
    }

    let created = repositories::submissions::create(
        state.db(),
        repositories::submissions::CreateSubmission {
            id: &Uuid::new_v4().to_string(),
            assignment_id: &assignment.id,
            student_id: &user.id,
            submission_path: &payload.submission_path,
            notes: payload.notes.as_deref(),
            is_late,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create submission"))?;

    let Some(submission) = created else {
        return Err(ApiError::Conflict(
            "A submission for this assignment already exists".to_string(),
        ));
    };

    tracing::info!(
        student_id = %user.id,
        assignment_id = %assignment.id,
        is_late,
        action = "submission_create",
        "Submission received"
    );

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

async fn list_submissions(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let course = fetch_course(&state, &assignment.course_id).await?;

    if !access::can_list_submissions(&user, &assignment, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this assignment"));
    }

    let submissions = repositories::submissions::list_for_assignment(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(submissions.into_iter().map(SubmissionResponse::from_db).collect()))
}

async fn my_submission(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = repositories::submissions::find_for_assignment_student(
        state.db(),
        &assignment_id,
        &user.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?;

    let Some(submission) = submission else {
        return Err(ApiError::NotFound("Submission not found".to_string()));
    };

    Ok(Json(SubmissionResponse::from_db(submission)))
}

async fn get_submission(
    Path((assignment_id, submission_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let course = fetch_course(&state, &assignment.course_id).await?;
    let submission = fetch_submission(&state, &submission_id, &assignment_id).await?;

    if !access::can_view_submission(&user, &submission, &assignment, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this submission"));
    }

    Ok(Json(SubmissionResponse::from_db(submission)))
}

async fn grade_submission(
    Path((assignment_id, submission_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionGradeRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let submission = fetch_submission(&state, &submission_id, &assignment_id).await?;

    if !access::can_grade_submission(&user, &assignment) {
        return Err(ApiError::Forbidden("Not enough permissions to grade this submission"));
    }

    if payload.points > f64::from(assignment.max_points) {
        return Err(ApiError::BadRequest(format!(
            "points cannot exceed the assignment maximum of {}",
            assignment.max_points
        )));
    }

    let awarded = if submission.is_late {
        grading::apply_late_penalty(payload.points, assignment.late_penalty_percentage)
    } else {
        payload.points
    };

    let graded = repositories::submissions::grade(
        state.db(),
        &submission_id,
        awarded,
        payload.feedback.as_deref(),
        &user.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grade submission"))?;

    tracing::info!(
        grader_id = %user.id,
        submission_id = %graded.id,
        points = awarded,
        action = "submission_grade",
        "Submission graded"
    );

    Ok(Json(SubmissionResponse::from_db(graded)))
}

async fn fetch_assignment(
    state: &AppState,
    assignment_id: &str,
) -> Result<Assignment, ApiError> {
    repositories::assignments::find_by_id(state.db(), assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

async fn fetch_submission(
    state: &AppState,
    submission_id: &str,
    assignment_id: &str,
) -> Result<Submission, ApiError> {
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?;

    match submission {
        Some(submission) if submission.assignment_id == assignment_id => Ok(submission),
        _ => Err(ApiError::NotFound("Submission not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::EnrollmentStatus;
    use crate::test_support;

    async fn seed_course_and_student(
        ctx: &test_support::TestContext,
    ) -> (crate::db::models::User, crate::db::models::Course, crate::db::models::User) {
        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS201", &lecturer.id, 30).await;
        let student =
            test_support::insert_student(ctx.state.db(), "stu@university.edu", "pw-stu").await;
        test_support::insert_enrollment(
            ctx.state.db(),
            &course.id,
            &student.id,
            EnrollmentStatus::Enrolled,
        )
        .await;
        (lecturer, course, student)
    }

    #[tokio::test]
    async fn submit_and_grade_flow() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let (lecturer, course, student) = seed_course_and_student(&ctx).await;
        let lecturer_token = test_support::bearer_token(&lecturer.id, ctx.state.settings());
        let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/assignments",
                Some(&lecturer_token),
                Some(json!({
                    "course_id": course.id,
                    "title": "Problem Set 1",
                    "max_points": 100,
                    "due_date": "2030-01-01T00:00:00Z"
                })),
            ))
            .await
            .expect("create assignment");
        let status = response.status();
        let assignment = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {assignment}");
        let assignment_id = assignment["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions"),
                Some(&student_token),
                Some(json!({"submission_path": "uploads/ps1.pdf", "notes": "done"})),
            ))
            .await
            .expect("submit");
        let status = response.status();
        let submission = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {submission}");
        assert_eq!(submission["is_late"], false);
        let submission_id = submission["id"].as_str().expect("id").to_string();

        // Second submission for the same pair must conflict.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions"),
                Some(&student_token),
                Some(json!({"submission_path": "uploads/ps1-v2.pdf"})),
            ))
            .await
            .expect("second submit");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Points above max are rejected, then a valid grade lands.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions/{submission_id}/grade"),
                Some(&lecturer_token),
                Some(json!({"points": 150.0})),
            ))
            .await
            .expect("overgrade");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions/{submission_id}/grade"),
                Some(&lecturer_token),
                Some(json!({"points": 92.5, "feedback": "Good work"})),
            ))
            .await
            .expect("grade");
        let status = response.status();
        let graded = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {graded}");
        assert_eq!(graded["points"], 92.5);
        assert_eq!(graded["feedback"], "Good work");

        // Full marks sit exactly on the max_points boundary and succeed;
        // grading is correction-friendly, so this overwrites the 92.5.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions/{submission_id}/grade"),
                Some(&lecturer_token),
                Some(json!({"points": 100.0})),
            ))
            .await
            .expect("regrade at max");
        let status = response.status();
        let graded = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {graded}");
        assert_eq!(graded["points"], 100.0);
    }

    #[tokio::test]
    async fn past_due_without_late_policy_is_rejected() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let (lecturer, course, student) = seed_course_and_student(&ctx).await;
        let lecturer_token = test_support::bearer_token(&lecturer.id, ctx.state.settings());
        let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/assignments",
                Some(&lecturer_token),
                Some(json!({
                    "course_id": course.id,
                    "title": "Old Homework",
                    "max_points": 50,
                    "due_date": "2020-01-01T00:00:00Z",
                    "allow_late_submission": false
                })),
            ))
            .await
            .expect("create assignment");
        let assignment = test_support::read_json(response).await;
        let assignment_id = assignment["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions"),
                Some(&student_token),
                Some(json!({"submission_path": "uploads/late.pdf"})),
            ))
            .await
            .expect("late submit");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn late_submission_takes_penalty_at_grading() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let (lecturer, course, student) = seed_course_and_student(&ctx).await;
        let lecturer_token = test_support::bearer_token(&lecturer.id, ctx.state.settings());
        let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/assignments",
                Some(&lecturer_token),
                Some(json!({
                    "course_id": course.id,
                    "title": "Flexible Homework",
                    "max_points": 100,
                    "due_date": "2020-01-01T00:00:00Z",
                    "allow_late_submission": true,
                    "late_penalty_percentage": 25
                })),
            ))
            .await
            .expect("create assignment");
        let assignment = test_support::read_json(response).await;
        let assignment_id = assignment["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions"),
                Some(&student_token),
                Some(json!({"submission_path": "uploads/late.pdf"})),
            ))
            .await
            .expect("late submit");
        let status = response.status();
        let submission = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {submission}");
        assert_eq!(submission["is_late"], true);
        let submission_id = submission["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions/{submission_id}/grade"),
                Some(&lecturer_token),
                Some(json!({"points": 80.0})),
            ))
            .await
            .expect("grade late");
        let status = response.status();
        let graded = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {graded}");
        assert_eq!(graded["points"], 60.0);
    }

    #[tokio::test]
    async fn unenrolled_student_cannot_submit() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let course =
            test_support::insert_course(ctx.state.db(), "CS202", &lecturer.id, 30).await;
        let outsider =
            test_support::insert_student(ctx.state.db(), "out@university.edu", "pw-out").await;
        let lecturer_token = test_support::bearer_token(&lecturer.id, ctx.state.settings());
        let outsider_token = test_support::bearer_token(&outsider.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/assignments",
                Some(&lecturer_token),
                Some(json!({
                    "course_id": course.id,
                    "title": "Homework",
                    "max_points": 10,
                    "due_date": "2030-01-01T00:00:00Z"
                })),
            ))
            .await
            .expect("create assignment");
        let assignment = test_support::read_json(response).await;
        let assignment_id = assignment["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/assignments/{assignment_id}/submissions"),
                Some(&outsider_token),
                Some(json!({"submission_path": "uploads/x.pdf"})),
            ))
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
