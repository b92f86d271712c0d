use thiserror::Error;

use crate::{DatabaseError, SessionError};

/// Input that was rejected before anything was written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Admin registration is not allowed")]
    AdminRegistration,
    #[error("The field {0} is required")]
    MissingField(&'static str),
    #[error("Thumbnail must be an image")]
    ThumbnailNotImage,
    #[error("Thumbnail must be smaller than {max_bytes} bytes")]
    ThumbnailTooLarge { max_bytes: usize },
}

/// Errors from the course, enrollment, coursework, and admin workflows
#[derive(Debug, Error)]
pub enum CollabError {
    /// The acting user isn't allowed to do this
    #[error("Not permitted to {action}")]
    NotPermitted { action: &'static str },
    #[error("Student is not enrolled in course {course_id}")]
    NotEnrolled { course_id: u32 },
    #[error("Lesson {lesson_id} does not belong to course {course_id}")]
    LessonNotInCourse { lesson_id: u32, course_id: u32 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] DatabaseError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type CollabResult<T> = Result<T, CollabError>;
