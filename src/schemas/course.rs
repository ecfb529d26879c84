use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Course;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub(crate) code: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[validate(range(min = 1, max = 6, message = "credits must be between 1 and 6"))]
    pub(crate) credits: i32,
    #[serde(default)]
    pub(crate) department: String,
    #[serde(default)]
    pub(crate) semester: String,
    #[serde(default)]
    pub(crate) year: i32,
    #[serde(default = "default_max_students")]
    #[serde(alias = "maxStudents")]
    #[validate(range(min = 1, message = "max_students must be positive"))]
    pub(crate) max_students: i32,
    #[serde(alias = "lecturerId")]
    pub(crate) lecturer_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub(crate) code: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 6, message = "credits must be between 1 and 6"))]
    pub(crate) credits: Option<i32>,
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default)]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    #[serde(alias = "maxStudents")]
    #[validate(range(min = 1, message = "max_students must be positive"))]
    pub(crate) max_students: Option<i32>,
    #[serde(default)]
    #[serde(alias = "syllabusPath")]
    pub(crate) syllabus_path: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default)]
    #[serde(alias = "lecturerId")]
    pub(crate) lecturer_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct CourseListQuery {
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default)]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    #[serde(alias = "lecturerId")]
    pub(crate) lecturer_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default)]
    pub(crate) skip: Option<i64>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) credits: i32,
    pub(crate) department: String,
    pub(crate) semester: String,
    pub(crate) year: i32,
    pub(crate) max_students: i32,
    pub(crate) enrolled_count: i64,
    pub(crate) is_full: bool,
    pub(crate) syllabus_path: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) lecturer_id: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course, enrolled_count: i64) -> Self {
        let is_full = enrolled_count >= course.max_students as i64;
        Self {
            id: course.id,
            code: course.code,
            title: course.title,
            description: course.description,
            credits: course.credits,
            department: course.department,
            semester: course.semester,
            year: course.year,
            max_students: course.max_students,
            enrolled_count,
            is_full,
            syllabus_path: course.syllabus_path,
            is_active: course.is_active,
            lecturer_id: course.lecturer_id,
            created_at: format_primitive(course.created_at),
            updated_at: format_primitive(course.updated_at),
        }
    }
}

fn default_max_students() -> i32 {
    30
}
