//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, Utc};
use classroom_collab::{
    navigation::{Navigation as CollabNavigation, Page},
    Assignment as CollabAssignment, Course as CollabCourse, CourseDetails as CollabCourseDetails,
    DashboardStats as CollabDashboardStats, EnrolledCourse as CollabEnrolledCourse,
    Enrollment as CollabEnrollment, InstructorAssignment as CollabInstructorAssignment,
    Lesson as CollabLesson, LessonKind, LessonView as CollabLessonView, PrimaryKey,
    Progress as CollabProgress, Role, SessionData, Status,
    StudentAssignment as CollabStudentAssignment, Submission as CollabSubmission,
    SubmissionEntry as CollabSubmissionEntry, SubmissionStatus, UserProfile,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: PrimaryKey,
    name: String,
    email: String,
    #[schema(value_type = String, example = "student")]
    role: Role,
    #[schema(value_type = String, example = "active")]
    status: Status,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    user: User,
    expires_at: DateTime<Utc>,
    /// Where the client should go next
    redirect: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    id: PrimaryKey,
    title: String,
    description: String,
    category: String,
    instructor_id: PrimaryKey,
    instructor_name: String,
    duration: String,
    thumbnail: String,
    #[schema(value_type = String, example = "active")]
    status: Status,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    id: PrimaryKey,
    course_id: PrimaryKey,
    title: String,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "video")]
    kind: LessonKind,
    content: String,
    order: u32,
    duration: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    id: PrimaryKey,
    student_id: PrimaryKey,
    course_id: PrimaryKey,
    enrolled_at: DateTime<Utc>,
    #[schema(value_type = String, example = "active")]
    status: Status,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    id: PrimaryKey,
    student_id: PrimaryKey,
    course_id: PrimaryKey,
    completed_lessons: Vec<PrimaryKey>,
    total_lessons: u32,
    progress_percentage: f64,
    last_accessed: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    id: PrimaryKey,
    course_id: PrimaryKey,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    id: PrimaryKey,
    assignment_id: PrimaryKey,
    student_id: PrimaryKey,
    response: String,
    #[schema(value_type = String, example = "submitted")]
    status: SubmissionStatus,
    submitted_at: DateTime<Utc>,
    grade: Option<String>,
    feedback: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    course: Course,
    lessons: Vec<Lesson>,
    enrolled: bool,
    progress: Option<Progress>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    course: Course,
    enrollment: Enrollment,
    progress: Option<Progress>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    course: Course,
    lesson: Lesson,
    lessons: Vec<Lesson>,
    progress: Option<Progress>,
    completed: bool,
    previous_lesson_id: Option<PrimaryKey>,
    next_lesson_id: Option<PrimaryKey>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorAssignment {
    assignment: Assignment,
    course_title: String,
    submission_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentAssignment {
    assignment: Assignment,
    course_title: String,
    submission: Option<Submission>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntry {
    submission: Submission,
    student_name: String,
    student_email: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSubmissions {
    assignment: Assignment,
    submissions: Vec<SubmissionEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    total_users: usize,
    active_users: usize,
    total_courses: usize,
    active_courses: usize,
    total_enrollments: usize,
}

/// Either `page` or `redirect` is set
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    page: Option<&'static str>,
    redirect: Option<&'static str>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<User> for UserProfile {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
            expires_at: self.expires_at,
            redirect: self.role().home_path(),
        }
    }
}

impl ToSerialized<Course> for CollabCourse {
    fn to_serialized(&self) -> Course {
        Course {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            instructor_id: self.instructor_id,
            instructor_name: self.instructor_name.clone(),
            duration: self.duration.clone(),
            thumbnail: self.thumbnail.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Lesson> for CollabLesson {
    fn to_serialized(&self) -> Lesson {
        Lesson {
            id: self.id,
            course_id: self.course_id,
            title: self.title.clone(),
            kind: self.kind,
            content: self.content.clone(),
            order: self.order,
            duration: self.duration.clone(),
        }
    }
}

impl ToSerialized<Enrollment> for CollabEnrollment {
    fn to_serialized(&self) -> Enrollment {
        Enrollment {
            id: self.id,
            student_id: self.student_id,
            course_id: self.course_id,
            enrolled_at: self.enrolled_at,
            status: self.status,
        }
    }
}

impl ToSerialized<Progress> for CollabProgress {
    fn to_serialized(&self) -> Progress {
        Progress {
            id: self.id,
            student_id: self.student_id,
            course_id: self.course_id,
            completed_lessons: self.completed_lessons.clone(),
            total_lessons: self.total_lessons,
            progress_percentage: self.progress_percentage,
            last_accessed: self.last_accessed,
        }
    }
}

impl ToSerialized<Assignment> for CollabAssignment {
    fn to_serialized(&self) -> Assignment {
        Assignment {
            id: self.id,
            course_id: self.course_id,
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Submission> for CollabSubmission {
    fn to_serialized(&self) -> Submission {
        Submission {
            id: self.id,
            assignment_id: self.assignment_id,
            student_id: self.student_id,
            response: self.response.clone(),
            status: self.status,
            submitted_at: self.submitted_at,
            grade: self.grade.clone(),
            feedback: self.feedback.clone(),
        }
    }
}

impl ToSerialized<CourseDetails> for CollabCourseDetails {
    fn to_serialized(&self) -> CourseDetails {
        CourseDetails {
            course: self.course.to_serialized(),
            lessons: self.lessons.to_serialized(),
            enrolled: self.enrolled,
            progress: self.progress.to_serialized(),
        }
    }
}

impl ToSerialized<EnrolledCourse> for CollabEnrolledCourse {
    fn to_serialized(&self) -> EnrolledCourse {
        EnrolledCourse {
            course: self.course.to_serialized(),
            enrollment: self.enrollment.to_serialized(),
            progress: self.progress.to_serialized(),
        }
    }
}

impl ToSerialized<LessonView> for CollabLessonView {
    fn to_serialized(&self) -> LessonView {
        LessonView {
            course: self.course.to_serialized(),
            lesson: self.lesson.to_serialized(),
            lessons: self.lessons.to_serialized(),
            progress: self.progress.to_serialized(),
            completed: self.completed,
            previous_lesson_id: self.previous,
            next_lesson_id: self.next,
        }
    }
}

impl ToSerialized<InstructorAssignment> for CollabInstructorAssignment {
    fn to_serialized(&self) -> InstructorAssignment {
        InstructorAssignment {
            assignment: self.assignment.to_serialized(),
            course_title: self.course_title.clone(),
            submission_count: self.submission_count,
        }
    }
}

impl ToSerialized<StudentAssignment> for CollabStudentAssignment {
    fn to_serialized(&self) -> StudentAssignment {
        StudentAssignment {
            assignment: self.assignment.to_serialized(),
            course_title: self.course_title.clone(),
            submission: self.submission.to_serialized(),
        }
    }
}

impl ToSerialized<SubmissionEntry> for CollabSubmissionEntry {
    fn to_serialized(&self) -> SubmissionEntry {
        SubmissionEntry {
            submission: self.submission.to_serialized(),
            student_name: self.student_name.clone(),
            student_email: self.student_email.clone(),
        }
    }
}

impl ToSerialized<AssignmentSubmissions> for (CollabAssignment, Vec<CollabSubmissionEntry>) {
    fn to_serialized(&self) -> AssignmentSubmissions {
        AssignmentSubmissions {
            assignment: self.0.to_serialized(),
            submissions: self.1.to_serialized(),
        }
    }
}

impl ToSerialized<DashboardStats> for CollabDashboardStats {
    fn to_serialized(&self) -> DashboardStats {
        DashboardStats {
            total_users: self.total_users,
            active_users: self.active_users,
            total_courses: self.total_courses,
            active_courses: self.active_courses,
            total_enrollments: self.total_enrollments,
        }
    }
}

impl ToSerialized<Navigation> for CollabNavigation {
    fn to_serialized(&self) -> Navigation {
        match self {
            CollabNavigation::Render(page) => Navigation {
                page: Some(page_name(page)),
                redirect: None,
            },
            CollabNavigation::Redirect(target) => Navigation {
                page: None,
                redirect: Some(*target),
            },
        }
    }
}

fn page_name(page: &Page) -> &'static str {
    match page {
        Page::Home => "home",
        Page::Login => "login",
        Page::Register => "register",
        Page::Courses => "courses",
        Page::CourseDetails { .. } => "course-details",
        Page::MyCourses => "my-courses",
        Page::MyAssignments => "my-assignments",
        Page::LessonView { .. } => "lesson-view",
        Page::InstructorCourses => "instructor-courses",
        Page::CreateCourse => "create-course",
        Page::EditCourse { .. } => "edit-course",
        Page::CreateLesson { .. } => "create-lesson",
        Page::InstructorAssignments => "instructor-assignments",
        Page::CreateAssignment => "create-assignment",
        Page::ViewSubmissions { .. } => "view-submissions",
        Page::AdminDashboard => "admin-dashboard",
        Page::AdminUsers => "admin-users",
        Page::AdminCourses => "admin-courses",
    }
}
