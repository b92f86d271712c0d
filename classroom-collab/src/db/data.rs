use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Record};

/// The type used for primary keys in the store.
pub type PrimaryKey = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Where a user with this role lands after logging in
    pub fn home_path(&self) -> &'static str {
        match self {
            Self::Student => "/my-courses",
            Self::Instructor => "/instructor/courses",
            Self::Admin => "/admin/dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    pub fn toggled(&self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    Video,
    Text,
    Pdf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Submitted,
    Reviewed,
}

/// An account. The password is an argon2 hash, or plaintext for legacy records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: PrimaryKey,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

/// A [User] without the password, safe to hand out and to keep in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: PrimaryKey,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub category: String,
    pub instructor_id: PrimaryKey,
    /// Copied from the instructor when the course is created
    pub instructor_name: String,
    pub duration: String,
    /// A URL or an embedded `data:` image
    pub thumbnail: String,
    #[serde(default)]
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: PrimaryKey,
    pub course_id: PrimaryKey,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonKind,
    /// A URL for video and pdf lessons, the text itself otherwise
    pub content: String,
    /// Sort key within the course, not necessarily contiguous
    pub order: u32,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub course_id: PrimaryKey,
    pub enrolled_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub course_id: PrimaryKey,
    #[serde(default)]
    pub completed_lessons: Vec<PrimaryKey>,
    /// Lesson count when the record was created
    pub total_lessons: u32,
    pub progress_percentage: f64,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: PrimaryKey,
    pub course_id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: PrimaryKey,
    pub assignment_id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub response: String,
    #[serde(default)]
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub grade: Option<String>,
    pub feedback: Option<String>,
}

macro_rules! record {
    ($record:ty, $collection:expr) => {
        impl Record for $record {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> PrimaryKey {
                self.id
            }
        }
    };
}

record!(User, Collection::Users);
record!(Course, Collection::Courses);
record!(Lesson, Collection::Lessons);
record!(Enrollment, Collection::Enrollments);
record!(Progress, Collection::Progress);
record!(Assignment, Collection::Assignments);
record!(Submission, Collection::Submissions);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub category: String,
    pub instructor_id: PrimaryKey,
    pub instructor_name: String,
    pub duration: String,
    pub thumbnail: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub course_id: PrimaryKey,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonKind,
    pub content: String,
    pub order: u32,
    pub duration: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
    pub student_id: PrimaryKey,
    pub course_id: PrimaryKey,
    pub enrolled_at: DateTime<Utc>,
    pub status: Status,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgress {
    pub student_id: PrimaryKey,
    pub course_id: PrimaryKey,
    pub completed_lessons: Vec<PrimaryKey>,
    pub total_lessons: u32,
    pub progress_percentage: f64,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub course_id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub assignment_id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub response: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub grade: Option<String>,
    pub feedback: Option<String>,
}
