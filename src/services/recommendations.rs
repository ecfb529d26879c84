//! Course recommendation heuristic. The score is a ranking aid with a random
//! tie-breaking component, not a correctness-bearing value; callers inject
//! the RNG so tests can seed it.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::db::models::Course;

pub(crate) const DEFAULT_MAX_RESULTS: usize = 10;

const INTEREST_WEIGHT: f64 = 20.0;
const DIFFICULTY_WEIGHT: f64 = 15.0;
const BACKGROUND_WEIGHT: f64 = 25.0;
const PREREQUISITE_WEIGHT: f64 = 10.0;
const JITTER_SPAN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DifficultyTier {
    Beginner,
    Intermediate,
    Advanced,
}

/// Typed preference profile; every recognized option is an explicit field.
#[derive(Debug, Clone, Default)]
pub(crate) struct PreferenceProfile {
    pub(crate) interests: Vec<String>,
    pub(crate) difficulty: Option<DifficultyTier>,
    pub(crate) academic_background: Option<String>,
    pub(crate) max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Recommendation {
    pub(crate) course_id: String,
    pub(crate) course_code: String,
    pub(crate) course_title: String,
    pub(crate) credits: i32,
    pub(crate) match_score: f64,
    pub(crate) reasons: Vec<String>,
}

pub(crate) fn credits_tier(credits: i32) -> DifficultyTier {
    match credits {
        i32::MIN..=2 => DifficultyTier::Beginner,
        3..=4 => DifficultyTier::Intermediate,
        _ => DifficultyTier::Advanced,
    }
}

/// Scores each candidate against the profile and the student's current
/// courses, then returns the top entries by descending score.
pub(crate) fn recommend<R: Rng>(
    candidates: &[Course],
    enrolled: &[Course],
    profile: &PreferenceProfile,
    rng: &mut R,
) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = candidates
        .iter()
        .map(|course| score_course(course, enrolled, profile, rng))
        .collect();

    scored.sort_by(|a, b| {
        b.match_score.partial_cmp(&a.match_score).unwrap_or(std::cmp::Ordering::Equal)
    });

    let limit = profile.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    scored.truncate(limit);
    scored
}

fn score_course<R: Rng>(
    course: &Course,
    enrolled: &[Course],
    profile: &PreferenceProfile,
    rng: &mut R,
) -> Recommendation {
    let haystack =
        format!("{} {} {}", course.title, course.description, course.code).to_lowercase();
    let description_lower = course.description.to_lowercase();

    let mut score = 0.0;
    let mut reasons = Vec::new();

    let matched_interests: Vec<&String> = profile
        .interests
        .iter()
        .filter(|interest| {
            let needle = interest.trim().to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .collect();
    if !matched_interests.is_empty() {
        score += INTEREST_WEIGHT * matched_interests.len() as f64;
        reasons.push(format!(
            "Matches your interests: {}",
            matched_interests.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        ));
    }

    if let Some(tier) = profile.difficulty {
        if credits_tier(course.credits) == tier {
            score += DIFFICULTY_WEIGHT;
            reasons.push("Fits your preferred difficulty level".to_string());
        }
    }

    if let Some(background) = &profile.academic_background {
        let needle = background.trim().to_lowercase();
        if !needle.is_empty() && description_lower.contains(&needle) {
            score += BACKGROUND_WEIGHT;
            reasons.push("Builds on your academic background".to_string());
        }
    }

    let continues_from = enrolled.iter().find(|current| {
        description_lower.contains(&current.code.to_lowercase())
    });
    if let Some(current) = continues_from {
        score += PREREQUISITE_WEIGHT;
        reasons.push(format!("Follows on from {}", current.code));
    }

    score += rng.gen_range(0.0..JITTER_SPAN);

    Recommendation {
        course_id: course.id.clone(),
        course_code: course.code.clone(),
        course_title: course.title.clone(),
        credits: course.credits,
        match_score: score,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn course(id: &str, code: &str, title: &str, description: &str, credits: i32) -> Course {
        let now = primitive_now_utc();
        Course {
            id: id.to_string(),
            code: code.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            credits,
            department: "CS".to_string(),
            semester: "fall".to_string(),
            year: 2026,
            max_students: 30,
            syllabus_path: None,
            is_active: true,
            lecturer_id: "lec-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn credits_map_to_tiers() {
        assert_eq!(credits_tier(1), DifficultyTier::Beginner);
        assert_eq!(credits_tier(2), DifficultyTier::Beginner);
        assert_eq!(credits_tier(3), DifficultyTier::Intermediate);
        assert_eq!(credits_tier(4), DifficultyTier::Intermediate);
        assert_eq!(credits_tier(5), DifficultyTier::Advanced);
        assert_eq!(credits_tier(6), DifficultyTier::Advanced);
    }

    // Jitter is in [0, 10); a 20-point interest match cannot be overtaken by
    // jitter alone, so the ranking below holds for every seed.
    #[test]
    fn interest_match_dominates_jitter() {
        let candidates = vec![
            course("c1", "CS201", "Databases", "Relational systems", 3),
            course("c2", "CS202", "Web Development", "Building web applications", 3),
        ];
        let profile = PreferenceProfile {
            interests: vec!["web".to_string()],
            ..Default::default()
        };

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ranked = recommend(&candidates, &[], &profile, &mut rng);
            assert_eq!(ranked[0].course_id, "c2", "seed {seed}");
        }
    }

    #[test]
    fn each_matched_interest_adds_twenty() {
        let candidates =
            vec![course("c1", "CS301", "Machine Learning", "Neural networks and data", 4)];
        let profile = PreferenceProfile {
            interests: vec!["machine".to_string(), "data".to_string(), "biology".to_string()],
            ..Default::default()
        };

        let mut rng = StdRng::seed_from_u64(7);
        let ranked = recommend(&candidates, &[], &profile, &mut rng);

        // Two interests matched: base 40, plus jitter below 10.
        assert!(ranked[0].match_score >= 40.0);
        assert!(ranked[0].match_score < 50.0);
    }

    #[test]
    fn difficulty_and_background_contribute() {
        let candidates = vec![course(
            "c1",
            "CS401",
            "Compilers",
            "Requires prior systems programming experience",
            5,
        )];
        let profile = PreferenceProfile {
            interests: Vec::new(),
            difficulty: Some(DifficultyTier::Advanced),
            academic_background: Some("systems programming".to_string()),
            max_results: None,
        };

        let mut rng = StdRng::seed_from_u64(1);
        let ranked = recommend(&candidates, &[], &profile, &mut rng);

        // 15 for the tier match plus 25 for the background match.
        assert!(ranked[0].match_score >= 40.0);
        assert!(ranked[0].match_score < 50.0);
        assert_eq!(ranked[0].reasons.len(), 2);
    }

    #[test]
    fn prerequisite_signal_from_enrolled_course_code() {
        let enrolled = vec![course("c0", "CS101", "Intro", "First course", 3)];
        let candidates =
            vec![course("c1", "CS102", "Data Structures", "Continues CS101 material", 3)];

        let mut rng = StdRng::seed_from_u64(3);
        let ranked = recommend(&candidates, &enrolled, &PreferenceProfile::default(), &mut rng);

        assert!(ranked[0].match_score >= 10.0);
        assert!(ranked[0].reasons.iter().any(|reason| reason.contains("CS101")));
    }

    #[test]
    fn results_truncate_to_max() {
        let candidates: Vec<Course> = (0..30)
            .map(|i| course(&format!("c{i}"), &format!("CS{i}"), "Course", "Text", 3))
            .collect();

        let mut rng = StdRng::seed_from_u64(5);
        let default_limit =
            recommend(&candidates, &[], &PreferenceProfile::default(), &mut rng);
        assert_eq!(default_limit.len(), DEFAULT_MAX_RESULTS);

        let profile = PreferenceProfile { max_results: Some(3), ..Default::default() };
        let three = recommend(&candidates, &[], &profile, &mut rng);
        assert_eq!(three.len(), 3);
    }

    #[test]
    fn scores_are_descending() {
        let candidates = vec![
            course("c1", "CS201", "Databases", "Relational systems", 3),
            course("c2", "CS202", "Web Development", "Building web applications", 3),
            course("c3", "CS203", "Networks", "Packets and protocols", 3),
        ];

        let mut rng = StdRng::seed_from_u64(11);
        let ranked = recommend(&candidates, &[], &PreferenceProfile::default(), &mut rng);

        for pair in ranked.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
        }
    }
}
