use crossbeam::channel::{Receiver, Sender};

use crate::{PrimaryKey, Role, Status};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// Events emitted by the collab system whenever shared state changes
#[derive(Debug, Clone, PartialEq)]
pub enum CollabEvent {
    /// A user logged in or registered
    SessionStarted { user_id: PrimaryKey, role: Role },
    /// A user logged out
    SessionEnded { user_id: PrimaryKey },
    /// An admin activated or deactivated a user
    UserStatusChanged {
        user_id: PrimaryKey,
        status: Status,
    },
    UserDeleted { user_id: PrimaryKey },
    /// A course was activated or deactivated
    CourseStatusChanged {
        course_id: PrimaryKey,
        status: Status,
    },
    CourseDeleted { course_id: PrimaryKey },
    /// A student enrolled in a course
    Enrolled {
        student_id: PrimaryKey,
        course_id: PrimaryKey,
    },
    /// A student completed a lesson
    LessonCompleted {
        student_id: PrimaryKey,
        course_id: PrimaryKey,
        lesson_id: PrimaryKey,
        /// The new completion percentage of the course
        progress_percentage: f64,
    },
    /// A student submitted or resubmitted an assignment
    SubmissionReceived {
        assignment_id: PrimaryKey,
        student_id: PrimaryKey,
    },
    /// An instructor graded a submission
    SubmissionGraded {
        submission_id: PrimaryKey,
        student_id: PrimaryKey,
    },
}
