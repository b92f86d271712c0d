use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{admin, auth, courses, instructor, navigation, schemas, serialized, sse, student};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        auth::user,
        navigation::resolve,
        courses::catalog,
        courses::categories,
        courses::course,
        courses::enroll,
        courses::lesson,
        courses::complete_lesson,
        student::my_courses,
        student::my_assignments,
        student::submit,
        instructor::my_courses,
        instructor::create_course,
        instructor::update_course,
        instructor::delete_course,
        instructor::toggle_course_status,
        instructor::create_lesson,
        instructor::assignments,
        instructor::create_assignment,
        instructor::delete_assignment,
        instructor::submissions,
        instructor::grade,
        admin::dashboard,
        admin::users,
        admin::toggle_user_status,
        admin::delete_user,
        admin::courses,
        admin::toggle_course_status,
        admin::delete_course,
        sse::event_stream,
    ),
    components(schemas(
        schemas::LoginSchema,
        schemas::RegisterSchema,
        schemas::NewCourseSchema,
        schemas::UpdateCourseSchema,
        schemas::NewLessonSchema,
        schemas::NewAssignmentSchema,
        schemas::SubmissionSchema,
        schemas::GradeSchema,
        serialized::User,
        serialized::LoginResult,
        serialized::Course,
        serialized::Lesson,
        serialized::Enrollment,
        serialized::Progress,
        serialized::Assignment,
        serialized::Submission,
        serialized::CourseDetails,
        serialized::EnrolledCourse,
        serialized::LessonView,
        serialized::InstructorAssignment,
        serialized::StudentAssignment,
        serialized::SubmissionEntry,
        serialized::AssignmentSubmissions,
        serialized::DashboardStats,
        serialized::Navigation,
        sse::ServerEvent,
    )),
    modifiers(&Security),
    info(
        description = "classroom-server exposes endpoints for courses, coursework, and administration"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
