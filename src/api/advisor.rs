use axum::{extract::State, routing::post, Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::types::{EnrollmentStatus, UserRole};
use crate::repositories;
use crate::schemas::advisor::{RecommendationRequest, RecommendationResponse};
use crate::services::recommendations::{self, PreferenceProfile};

/// Upper bound on the catalog slice scored per request.
const CANDIDATE_POOL_LIMIT: i64 = 1000;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/course-recommendations", post(course_recommendations))
}

async fn course_recommendations(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    if user.role != UserRole::Student {
        return Err(ApiError::Forbidden("Recommendations are available to students only"));
    }

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let enrollments = repositories::enrollments::list_for_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load enrollments"))?;

    let enrolled_ids: Vec<&str> = enrollments
        .iter()
        .filter(|enrollment| enrollment.status == EnrollmentStatus::Enrolled)
        .map(|enrollment| enrollment.course_id.as_str())
        .collect();
    let excluded_ids: Vec<&str> = enrollments
        .iter()
        .filter(|enrollment| {
            enrollment.status.is_live() || enrollment.status == EnrollmentStatus::Completed
        })
        .map(|enrollment| enrollment.course_id.as_str())
        .collect();

    let filter = repositories::courses::CourseFilter {
        is_active: Some(true),
        ..Default::default()
    };
    let catalog = repositories::courses::list(state.db(), &filter, 0, CANDIDATE_POOL_LIMIT)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load course catalog"))?;

    let (enrolled_courses, rest): (Vec<_>, Vec<_>) = catalog
        .into_iter()
        .partition(|course| enrolled_ids.contains(&course.id.as_str()));
    let candidates: Vec<_> = rest
        .into_iter()
        .filter(|course| !excluded_ids.contains(&course.id.as_str()))
        .collect();

    let profile = PreferenceProfile {
        interests: payload.interests,
        difficulty: payload.difficulty,
        academic_background: payload.academic_background,
        max_results: payload.max_results,
    };

    let mut rng = StdRng::from_entropy();
    let ranked =
        recommendations::recommend(&candidates, &enrolled_courses, &profile, &mut rng);

    let completed_titles: Vec<String> = {
        let completed_ids = repositories::enrollments::completed_course_ids(state.db(), &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load completed courses"))?;
        let mut titles = Vec::with_capacity(completed_ids.len());
        for course_id in &completed_ids {
            if let Some(course) = repositories::courses::find_by_id(state.db(), course_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load course"))?
            {
                titles.push(course.title);
            }
        }
        titles
    };
    let suggested_titles: Vec<String> =
        ranked.iter().map(|rec| rec.course_title.clone()).collect();

    let advisory = state
        .advisor()
        .advisory_text(&user.first_name, &completed_titles, &suggested_titles)
        .await;

    let total_recommendations = ranked.len();
    Ok(Json(RecommendationResponse {
        recommendations: ranked,
        total_recommendations,
        advisory,
        generated_at: format_primitive(primitive_now_utc()),
    }))
}
