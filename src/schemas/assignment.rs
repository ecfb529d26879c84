use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Assignment, Submission};
use crate::db::types::AssignmentKind;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentCreate {
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) instructions: Option<String>,
    #[serde(default = "default_kind")]
    pub(crate) kind: AssignmentKind,
    #[serde(alias = "maxPoints")]
    #[validate(range(min = 1, max = 1000, message = "max_points must be between 1 and 1000"))]
    pub(crate) max_points: i32,
    #[serde(alias = "dueDate", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) due_date: OffsetDateTime,
    #[serde(
        default,
        alias = "availableFrom",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) available_from: Option<OffsetDateTime>,
    #[serde(
        default,
        alias = "availableUntil",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) available_until: Option<OffsetDateTime>,
    #[serde(default)]
    #[serde(alias = "allowLateSubmission")]
    pub(crate) allow_late_submission: bool,
    #[serde(default)]
    #[serde(alias = "latePenaltyPercentage")]
    #[validate(range(min = 0, max = 100, message = "late_penalty_percentage must be 0-100"))]
    pub(crate) late_penalty_percentage: i32,
    #[serde(default)]
    #[serde(alias = "attachmentPath")]
    pub(crate) attachment_path: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) instructions: Option<String>,
    #[serde(default)]
    #[serde(alias = "maxPoints")]
    #[validate(range(min = 1, max = 1000, message = "max_points must be between 1 and 1000"))]
    pub(crate) max_points: Option<i32>,
    #[serde(
        default,
        alias = "dueDate",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) due_date: Option<OffsetDateTime>,
    #[serde(
        default,
        alias = "availableFrom",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) available_from: Option<OffsetDateTime>,
    #[serde(
        default,
        alias = "availableUntil",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) available_until: Option<OffsetDateTime>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default)]
    #[serde(alias = "allowLateSubmission")]
    pub(crate) allow_late_submission: Option<bool>,
    #[serde(default)]
    #[serde(alias = "latePenaltyPercentage")]
    #[validate(range(min = 0, max = 100, message = "late_penalty_percentage must be 0-100"))]
    pub(crate) late_penalty_percentage: Option<i32>,
    #[serde(default)]
    #[serde(alias = "attachmentPath")]
    pub(crate) attachment_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) created_by: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) instructions: Option<String>,
    pub(crate) kind: AssignmentKind,
    pub(crate) max_points: i32,
    pub(crate) due_date: String,
    pub(crate) available_from: Option<String>,
    pub(crate) available_until: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) is_overdue: bool,
    pub(crate) allow_late_submission: bool,
    pub(crate) late_penalty_percentage: i32,
    pub(crate) attachment_path: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AssignmentResponse {
    pub(crate) fn from_db(assignment: Assignment, now: PrimitiveDateTime) -> Self {
        let is_overdue = now > assignment.due_date;
        Self {
            id: assignment.id,
            course_id: assignment.course_id,
            created_by: assignment.created_by,
            title: assignment.title,
            description: assignment.description,
            instructions: assignment.instructions,
            kind: assignment.kind,
            max_points: assignment.max_points,
            due_date: format_primitive(assignment.due_date),
            available_from: assignment.available_from.map(format_primitive),
            available_until: assignment.available_until.map(format_primitive),
            is_active: assignment.is_active,
            is_overdue,
            allow_late_submission: assignment.allow_late_submission,
            late_penalty_percentage: assignment.late_penalty_percentage,
            attachment_path: assignment.attachment_path,
            created_at: format_primitive(assignment.created_at),
            updated_at: format_primitive(assignment.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionCreate {
    #[serde(alias = "submissionPath")]
    #[validate(length(min = 1, message = "submission_path must not be empty"))]
    pub(crate) submission_path: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionGradeRequest {
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) submission_path: String,
    pub(crate) notes: Option<String>,
    pub(crate) is_late: bool,
    pub(crate) points: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_at: Option<String>,
    pub(crate) graded_by: Option<String>,
    pub(crate) created_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            submission_path: submission.submission_path,
            notes: submission.notes,
            is_late: submission.is_late,
            points: submission.points,
            feedback: submission.feedback,
            graded_at: submission.graded_at.map(format_primitive),
            graded_by: submission.graded_by,
            created_at: format_primitive(submission.created_at),
        }
    }
}

fn default_kind() -> AssignmentKind {
    AssignmentKind::Assignment
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Frontend's datetime-local often sends without timezone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_datetime_accepts_common_shapes() {
        assert!(parse_offset_datetime_flexible("2026-09-01T12:00:00Z").is_some());
        assert!(parse_offset_datetime_flexible("2026-09-01T12:00").is_some());
        assert!(parse_offset_datetime_flexible("2026-09-01T12:00:00").is_some());
        assert!(parse_offset_datetime_flexible("2026-09-01T12:00:00+03:00").is_some());
        assert!(parse_offset_datetime_flexible("not-a-date").is_none());
    }
}
