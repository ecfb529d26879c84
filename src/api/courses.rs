use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Course;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::course::{CourseCreate, CourseListQuery, CourseResponse, CourseUpdate};
use crate::services::access;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:course_id", get(get_course).patch(update_course).delete(delete_course))
}

async fn list_courses(
    Query(params): Query<CourseListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<CourseResponse>>, ApiError> {
    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or_else(default_limit).clamp(1, 1000);

    // Students only browse the active catalog; staff may filter freely.
    let is_active = if user.role == UserRole::Student { Some(true) } else { params.is_active };

    let filter = repositories::courses::CourseFilter {
        department: params.department,
        semester: params.semester,
        year: params.year,
        lecturer_id: params.lecturer_id,
        is_active,
    };

    let courses = repositories::courses::list(state.db(), &filter, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;
    let total_count = repositories::courses::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count courses"))?;

    let ids: Vec<String> = courses.iter().map(|course| course.id.clone()).collect();
    let counts = repositories::courses::enrolled_counts(state.db(), &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    let items = courses
        .into_iter()
        .map(|course| {
            let enrolled = counts.get(&course.id).copied().unwrap_or(0);
            CourseResponse::from_db(course, enrolled)
        })
        .collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

async fn get_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    // Inactive courses are invisible to students, not forbidden.
    if user.role == UserRole::Student && !course.is_active {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }
    let enrolled = repositories::courses::enrolled_count(state.db(), &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    Ok(Json(CourseResponse::from_db(course, enrolled)))
}

async fn create_course(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    if !access::can_create_course(&user) {
        return Err(ApiError::Forbidden("Only administrators may create courses"));
    }

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = repositories::courses::exists_by_code(state.db(), &payload.code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course code"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Course with this code already exists".to_string()));
    }

    let lecturer = repositories::users::find_by_id(state.db(), &payload.lecturer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch lecturer"))?;
    match lecturer {
        None => return Err(ApiError::NotFound("Lecturer not found".to_string())),
        Some(ref target) if target.role != UserRole::Lecturer => {
            return Err(ApiError::BadRequest(
                "Assigned lecturer must have the lecturer role".to_string(),
            ));
        }
        Some(_) => {}
    }

    let now = primitive_now_utc();
    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            code: &payload.code,
            title: &payload.title,
            description: &payload.description,
            credits: payload.credits,
            department: &payload.department,
            semester: &payload.semester,
            year: payload.year,
            max_students: payload.max_students,
            lecturer_id: &payload.lecturer_id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    tracing::info!(
        admin_id = %user.id,
        course_id = %course.id,
        code = %course.code,
        action = "course_create",
        "Course created"
    );

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course, 0))))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let course = fetch_course(&state, &course_id).await?;
    if !access::can_manage_course(&user, &course) {
        return Err(ApiError::Forbidden("Not enough permissions for this course"));
    }

    if payload.lecturer_id.is_some() && !access::can_reassign_lecturer(&user) {
        return Err(ApiError::Forbidden("Only administrators may reassign the lecturer"));
    }

    if let Some(new_code) = payload.code.as_deref() {
        let existing = repositories::courses::exists_by_code(state.db(), new_code)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check course code"))?;
        if existing.is_some_and(|id| id != course_id) {
            return Err(ApiError::Conflict("Course with this code already exists".to_string()));
        }
    }

    if let Some(new_lecturer_id) = payload.lecturer_id.as_deref() {
        let lecturer = repositories::users::find_by_id(state.db(), new_lecturer_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch lecturer"))?;
        match lecturer {
            None => return Err(ApiError::NotFound("Lecturer not found".to_string())),
            Some(ref target) if target.role != UserRole::Lecturer => {
                return Err(ApiError::BadRequest(
                    "Assigned lecturer must have the lecturer role".to_string(),
                ));
            }
            Some(_) => {}
        }
    }

    repositories::courses::update(
        state.db(),
        &course_id,
        repositories::courses::UpdateCourse {
            code: payload.code,
            title: payload.title,
            description: payload.description,
            credits: payload.credits,
            department: payload.department,
            semester: payload.semester,
            year: payload.year,
            max_students: payload.max_students,
            syllabus_path: payload.syllabus_path,
            is_active: payload.is_active,
            lecturer_id: payload.lecturer_id,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update course"))?;

    let updated = fetch_course(&state, &course_id).await?;
    let enrolled = repositories::courses::enrolled_count(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    Ok(Json(CourseResponse::from_db(updated, enrolled)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if !access::is_admin(&user) {
        return Err(ApiError::Forbidden("Only administrators may delete courses"));
    }

    let deleted = repositories::courses::delete(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete course"))?;

    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    tracing::info!(
        admin_id = %user.id,
        course_id = %course_id,
        action = "course_delete",
        "Course deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_course(state: &AppState, course_id: &str) -> Result<Course, ApiError> {
    repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn admin_creates_course_and_lecturer_updates_it() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let admin = test_support::insert_admin(ctx.state.db(), "root@university.edu").await;
        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
        let lecturer_token = test_support::bearer_token(&lecturer.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/courses",
                Some(&admin_token),
                Some(json!({
                    "code": "CS101",
                    "title": "Intro to Computer Science",
                    "description": "Foundations",
                    "credits": 3,
                    "department": "CS",
                    "semester": "fall",
                    "year": 2026,
                    "max_students": 2,
                    "lecturer_id": lecturer.id
                })),
            ))
            .await
            .expect("create course");

        let status = response.status();
        let created = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {created}");
        let course_id = created["id"].as_str().expect("course id").to_string();
        assert_eq!(created["enrolled_count"], 0);
        assert_eq!(created["is_full"], false);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/v1/courses/{course_id}"),
                Some(&lecturer_token),
                Some(json!({"title": "Intro to CS (updated)"})),
            ))
            .await
            .expect("update course");

        let status = response.status();
        let updated = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {updated}");
        assert_eq!(updated["title"], "Intro to CS (updated)");
    }

    #[tokio::test]
    async fn lecturer_cannot_create_course() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let token = test_support::bearer_token(&lecturer.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/courses",
                Some(&token),
                Some(json!({
                    "code": "CS900",
                    "title": "Forbidden",
                    "credits": 3,
                    "lecturer_id": lecturer.id
                })),
            ))
            .await
            .expect("create course");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn duplicate_course_code_conflicts() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let admin = test_support::insert_admin(ctx.state.db(), "root@university.edu").await;
        let lecturer =
            test_support::insert_lecturer(ctx.state.db(), "lect@university.edu").await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let payload = json!({
            "code": "MATH201",
            "title": "Calculus I",
            "credits": 4,
            "lecturer_id": lecturer.id
        });

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/courses",
                Some(&token),
                Some(payload.clone()),
            ))
            .await
            .expect("first create");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/courses",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("second create");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
