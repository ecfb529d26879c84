//! One authorization predicate per operation, taking the actor and the
//! resource it acts on. Handlers call these instead of branching on role
//! inline.

use crate::db::models::{Assignment, Course, Enrollment, Submission, User};
use crate::db::types::UserRole;

pub(crate) fn is_admin(actor: &User) -> bool {
    actor.role == UserRole::Admin
}

pub(crate) fn can_create_course(actor: &User) -> bool {
    is_admin(actor)
}

pub(crate) fn can_manage_course(actor: &User, course: &Course) -> bool {
    is_admin(actor) || course.lecturer_id == actor.id
}

pub(crate) fn can_reassign_lecturer(actor: &User) -> bool {
    is_admin(actor)
}

/// Students may only enroll themselves; admins and lecturers must name a
/// target student explicitly.
pub(crate) enum EnrollTarget {
    Student(String),
    ForbiddenMismatch,
    MissingStudentId,
}

pub(crate) fn resolve_enroll_target(actor: &User, requested: Option<&str>) -> EnrollTarget {
    if actor.role == UserRole::Student {
        return match requested {
            Some(id) if id != actor.id => EnrollTarget::ForbiddenMismatch,
            _ => EnrollTarget::Student(actor.id.clone()),
        };
    }
    match requested {
        Some(id) => EnrollTarget::Student(id.to_string()),
        None => EnrollTarget::MissingStudentId,
    }
}

pub(crate) fn can_update_enrollment_status(actor: &User, course: &Course) -> bool {
    is_admin(actor) || course.lecturer_id == actor.id
}

pub(crate) fn can_grade_enrollment(actor: &User, course: &Course) -> bool {
    is_admin(actor) || course.lecturer_id == actor.id
}

pub(crate) fn can_remove_enrollment(
    actor: &User,
    enrollment: &Enrollment,
    course: &Course,
) -> bool {
    is_admin(actor)
        || course.lecturer_id == actor.id
        || (actor.role == UserRole::Student && enrollment.student_id == actor.id)
}

pub(crate) fn can_view_enrollment(actor: &User, enrollment: &Enrollment, course: &Course) -> bool {
    is_admin(actor) || course.lecturer_id == actor.id || enrollment.student_id == actor.id
}

pub(crate) fn can_view_course_enrollments(actor: &User, course: &Course) -> bool {
    is_admin(actor) || course.lecturer_id == actor.id
}

pub(crate) fn can_create_assignment(actor: &User, course: &Course) -> bool {
    is_admin(actor) || course.lecturer_id == actor.id
}

pub(crate) fn can_manage_assignment(actor: &User, course: &Course) -> bool {
    is_admin(actor) || course.lecturer_id == actor.id
}

pub(crate) fn can_grade_submission(actor: &User, assignment: &Assignment) -> bool {
    is_admin(actor) || assignment.created_by == actor.id
}

pub(crate) fn can_list_submissions(actor: &User, assignment: &Assignment, course: &Course) -> bool {
    is_admin(actor) || assignment.created_by == actor.id || course.lecturer_id == actor.id
}

pub(crate) fn can_view_submission(
    actor: &User,
    submission: &Submission,
    assignment: &Assignment,
    course: &Course,
) -> bool {
    is_admin(actor)
        || submission.student_id == actor.id
        || assignment.created_by == actor.id
        || course.lecturer_id == actor.id
}
