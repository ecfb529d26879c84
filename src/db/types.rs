use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Lecturer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "enrollmentstatus", rename_all = "lowercase")]
pub(crate) enum EnrollmentStatus {
    Pending,
    Enrolled,
    Dropped,
    Completed,
}

impl EnrollmentStatus {
    /// Status transitions are forward-only; terminal rows stay as history.
    pub(crate) fn can_transition_to(self, next: EnrollmentStatus) -> bool {
        matches!(
            (self, next),
            (EnrollmentStatus::Pending, EnrollmentStatus::Enrolled)
                | (EnrollmentStatus::Pending, EnrollmentStatus::Dropped)
                | (EnrollmentStatus::Enrolled, EnrollmentStatus::Completed)
                | (EnrollmentStatus::Enrolled, EnrollmentStatus::Dropped)
        )
    }

    pub(crate) fn is_live(self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Enrolled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "assignmentkind", rename_all = "lowercase")]
pub(crate) enum AssignmentKind {
    Assignment,
    Quiz,
    Exam,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "uploadpurpose", rename_all = "snake_case")]
pub(crate) enum UploadPurpose {
    Syllabus,
    AssignmentAttachment,
    Submission,
}
