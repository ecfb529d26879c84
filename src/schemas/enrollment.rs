use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentCreate {
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<EnrollmentStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentStatusUpdate {
    pub(crate) status: EnrollmentStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EnrollmentGradeUpdate {
    #[serde(alias = "finalGrade")]
    #[validate(range(min = 0.0, max = 100.0, message = "final_grade must be between 0 and 100"))]
    pub(crate) final_grade: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentListQuery {
    #[serde(default)]
    pub(crate) skip: Option<i64>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) final_grade: Option<f64>,
    pub(crate) letter_grade: Option<String>,
    pub(crate) enrolled_at: Option<String>,
    pub(crate) completed_at: Option<String>,
    pub(crate) dropped_at: Option<String>,
    pub(crate) created_at: String,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            course_id: enrollment.course_id,
            student_id: enrollment.student_id,
            status: enrollment.status,
            final_grade: enrollment.final_grade,
            letter_grade: enrollment.letter_grade,
            enrolled_at: enrollment.enrolled_at.map(format_primitive),
            completed_at: enrollment.completed_at.map(format_primitive),
            dropped_at: enrollment.dropped_at.map(format_primitive),
            created_at: format_primitive(enrollment.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseEnrollmentStatsResponse {
    pub(crate) course_id: String,
    pub(crate) total: i64,
    pub(crate) pending: i64,
    pub(crate) enrolled: i64,
    pub(crate) completed: i64,
    pub(crate) dropped: i64,
    pub(crate) average_grade: Option<f64>,
}
