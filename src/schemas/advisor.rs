use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::advisor::AdvisoryText;
use crate::services::recommendations::{DifficultyTier, Recommendation};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RecommendationRequest {
    #[serde(default)]
    pub(crate) interests: Vec<String>,
    #[serde(default)]
    #[serde(alias = "preferredDifficulty")]
    pub(crate) difficulty: Option<DifficultyTier>,
    #[serde(default)]
    #[serde(alias = "academicBackground")]
    pub(crate) academic_background: Option<String>,
    #[serde(default)]
    #[serde(alias = "maxResults")]
    #[validate(range(min = 1, max = 50, message = "max_results must be between 1 and 50"))]
    pub(crate) max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecommendationResponse {
    pub(crate) recommendations: Vec<Recommendation>,
    pub(crate) total_recommendations: usize,
    pub(crate) advisory: AdvisoryText,
    pub(crate) generated_at: String,
}
