use crate::db::types::EnrollmentStatus;

pub(crate) const MIN_FINAL_GRADE: f64 = 0.0;
pub(crate) const MAX_FINAL_GRADE: f64 = 100.0;

pub(crate) fn final_grade_in_bounds(grade: f64) -> bool {
    (MIN_FINAL_GRADE..=MAX_FINAL_GRADE).contains(&grade)
}

/// Fixed thresholds; boundary values map to the higher band.
pub(crate) fn letter_grade(final_grade: f64) -> &'static str {
    if final_grade >= 90.0 {
        "A"
    } else if final_grade >= 80.0 {
        "B"
    } else if final_grade >= 70.0 {
        "C"
    } else if final_grade >= 60.0 {
        "D"
    } else {
        "F"
    }
}

/// Grades may be set while the enrollment is in progress or completed, but
/// not on pending or dropped rows.
pub(crate) fn status_accepts_grade(status: EnrollmentStatus) -> bool {
    matches!(status, EnrollmentStatus::Enrolled | EnrollmentStatus::Completed)
}

/// Late submissions lose `penalty_percentage` of the awarded points, floored
/// at zero. Applied when the lecturer grades, not when the student submits.
pub(crate) fn apply_late_penalty(points: f64, penalty_percentage: i32) -> f64 {
    let factor = 1.0 - f64::from(penalty_percentage.clamp(0, 100)) / 100.0;
    (points * factor).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_grade_bands() {
        assert_eq!(letter_grade(95.0), "A");
        assert_eq!(letter_grade(85.0), "B");
        assert_eq!(letter_grade(75.0), "C");
        assert_eq!(letter_grade(65.0), "D");
        assert_eq!(letter_grade(50.0), "F");
    }

    #[test]
    fn letter_grade_boundaries_map_up() {
        assert_eq!(letter_grade(90.0), "A");
        assert_eq!(letter_grade(80.0), "B");
        assert_eq!(letter_grade(70.0), "C");
        assert_eq!(letter_grade(60.0), "D");
        assert_eq!(letter_grade(59.9), "F");
    }

    #[test]
    fn grade_bounds() {
        assert!(final_grade_in_bounds(0.0));
        assert!(final_grade_in_bounds(100.0));
        assert!(!final_grade_in_bounds(-1.0));
        assert!(!final_grade_in_bounds(101.0));
    }

    #[test]
    fn grade_allowed_by_status() {
        assert!(status_accepts_grade(EnrollmentStatus::Enrolled));
        assert!(status_accepts_grade(EnrollmentStatus::Completed));
        assert!(!status_accepts_grade(EnrollmentStatus::Pending));
        assert!(!status_accepts_grade(EnrollmentStatus::Dropped));
    }

    #[test]
    fn late_penalty_reduces_points() {
        assert_eq!(apply_late_penalty(80.0, 25), 60.0);
        assert_eq!(apply_late_penalty(80.0, 0), 80.0);
        assert_eq!(apply_late_penalty(80.0, 100), 0.0);
        // Out-of-range percentages are clamped rather than amplified.
        assert_eq!(apply_late_penalty(80.0, 150), 0.0);
        assert_eq!(apply_late_penalty(80.0, -10), 80.0);
    }
}
