use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AssignmentKind, EnrollmentStatus, UploadPurpose, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) credits: i32,
    pub(crate) department: String,
    pub(crate) semester: String,
    pub(crate) year: i32,
    pub(crate) max_students: i32,
    pub(crate) syllabus_path: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) lecturer_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) final_grade: Option<f64>,
    pub(crate) letter_grade: Option<String>,
    pub(crate) enrolled_at: Option<PrimitiveDateTime>,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) dropped_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) created_by: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) instructions: Option<String>,
    pub(crate) kind: AssignmentKind,
    pub(crate) max_points: i32,
    pub(crate) due_date: PrimitiveDateTime,
    pub(crate) available_from: Option<PrimitiveDateTime>,
    pub(crate) available_until: Option<PrimitiveDateTime>,
    pub(crate) is_active: bool,
    pub(crate) allow_late_submission: bool,
    pub(crate) late_penalty_percentage: i32,
    pub(crate) attachment_path: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) submission_path: String,
    pub(crate) notes: Option<String>,
    pub(crate) is_late: bool,
    pub(crate) points: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) graded_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UploadedFile {
    pub(crate) id: String,
    pub(crate) owner_id: String,
    pub(crate) purpose: UploadPurpose,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) size_bytes: i64,
    pub(crate) checksum: String,
    pub(crate) storage_key: String,
    pub(crate) created_at: PrimitiveDateTime,
}
