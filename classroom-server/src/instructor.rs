use axum::{
    extract::Path,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json,
};
use classroom_collab::{
    AssignmentInput, CourseChanges, CourseInput, Grade, LessonInput, PrimaryKey,
};

use crate::{
    auth::StaffSession,
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        GradeSchema, NewAssignmentSchema, NewCourseSchema, NewLessonSchema, UpdateCourseSchema,
        ValidatedJson,
    },
    serialized::{
        Assignment, AssignmentSubmissions, Course, InstructorAssignment, Lesson, Submission,
        ToSerialized,
    },
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/instructor/courses",
    operation_id = "instructor_courses",
    tag = "instructor",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Course>, description = "Courses taught by the caller")
    )
)]
async fn my_courses(
    session: StaffSession,
    context: ServerContext,
) -> ServerResult<Json<Vec<Course>>> {
    let courses = context.collab.catalog.courses_by(session.user().id).await?;

    Ok(Json(courses.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/instructor/courses",
    tag = "instructor",
    request_body = NewCourseSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course),
        (status = 400, description = "Missing fields or invalid thumbnail")
    )
)]
async fn create_course(
    session: StaffSession,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewCourseSchema>,
) -> ServerResult<Json<Course>> {
    let course = context
        .collab
        .catalog
        .create_course(
            session.user(),
            CourseInput {
                title: body.title,
                description: body.description,
                category: body.category,
                duration: body.duration,
                thumbnail: body.thumbnail,
            },
        )
        .await?;

    Ok(Json(course.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/instructor/courses/{id}",
    tag = "instructor",
    request_body = UpdateCourseSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course),
        (status = 403, description = "Not the owner of the course")
    )
)]
async fn update_course(
    session: StaffSession,
    context: ServerContext,
    Path(course_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<UpdateCourseSchema>,
) -> ServerResult<Json<Course>> {
    let course = context
        .collab
        .catalog
        .update_course(
            session.user(),
            course_id,
            CourseChanges {
                title: body.title,
                description: body.description,
                category: body.category,
                duration: body.duration,
                thumbnail: body.thumbnail,
                status: body.status,
            },
        )
        .await?;

    Ok(Json(course.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/instructor/courses/{id}",
    tag = "instructor",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204),
        (status = 403, description = "Not the owner of the course")
    )
)]
async fn delete_course(
    session: StaffSession,
    context: ServerContext,
    Path(course_id): Path<PrimaryKey>,
) -> ServerResult<StatusCode> {
    context
        .collab
        .catalog
        .delete_course(session.user(), course_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/instructor/courses/{id}/status",
    tag = "instructor",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course, description = "The course with its status flipped")
    )
)]
async fn toggle_course_status(
    session: StaffSession,
    context: ServerContext,
    Path(course_id): Path<PrimaryKey>,
) -> ServerResult<Json<Course>> {
    let course = context
        .collab
        .catalog
        .toggle_status(session.user(), course_id)
        .await?;

    Ok(Json(course.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/instructor/courses/{id}/lessons",
    tag = "instructor",
    request_body = NewLessonSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Lesson)
    )
)]
async fn create_lesson(
    session: StaffSession,
    context: ServerContext,
    Path(course_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<NewLessonSchema>,
) -> ServerResult<Json<Lesson>> {
    let lesson = context
        .collab
        .catalog
        .create_lesson(
            session.user(),
            course_id,
            LessonInput {
                title: body.title,
                kind: body.kind,
                content: body.content,
                duration: body.duration,
            },
        )
        .await?;

    Ok(Json(lesson.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/instructor/assignments",
    tag = "instructor",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<InstructorAssignment>)
    )
)]
async fn assignments(
    session: StaffSession,
    context: ServerContext,
) -> ServerResult<Json<Vec<InstructorAssignment>>> {
    let assignments = context
        .collab
        .coursework
        .instructor_assignments(session.user().id)
        .await?;

    Ok(Json(assignments.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/instructor/assignments",
    tag = "instructor",
    request_body = NewAssignmentSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Assignment)
    )
)]
async fn create_assignment(
    session: StaffSession,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewAssignmentSchema>,
) -> ServerResult<Json<Assignment>> {
    let assignment = context
        .collab
        .coursework
        .create_assignment(
            session.user(),
            AssignmentInput {
                course_id: body.course_id,
                title: body.title,
                description: body.description,
                due_date: body.due_date,
            },
        )
        .await?;

    Ok(Json(assignment.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/instructor/assignments/{id}",
    tag = "instructor",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204)
    )
)]
async fn delete_assignment(
    session: StaffSession,
    context: ServerContext,
    Path(assignment_id): Path<PrimaryKey>,
) -> ServerResult<StatusCode> {
    context
        .collab
        .coursework
        .delete_assignment(session.user(), assignment_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/instructor/assignments/{id}/submissions",
    tag = "instructor",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = AssignmentSubmissions)
    )
)]
async fn submissions(
    session: StaffSession,
    context: ServerContext,
    Path(assignment_id): Path<PrimaryKey>,
) -> ServerResult<Json<AssignmentSubmissions>> {
    let submissions = context
        .collab
        .coursework
        .submissions(session.user(), assignment_id)
        .await?;

    Ok(Json(submissions.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/instructor/submissions/{id}/grade",
    tag = "instructor",
    request_body = GradeSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Submission),
        (status = 400, description = "Grade is missing")
    )
)]
async fn grade(
    session: StaffSession,
    context: ServerContext,
    Path(submission_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<GradeSchema>,
) -> ServerResult<Json<Submission>> {
    let submission = context
        .collab
        .coursework
        .grade(
            session.user(),
            submission_id,
            Grade {
                grade: body.grade,
                feedback: body.feedback,
            },
        )
        .await?;

    Ok(Json(submission.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/courses", get(my_courses).post(create_course))
        .route("/courses/:id", put(update_course).delete(delete_course))
        .route("/courses/:id/status", post(toggle_course_status))
        .route("/courses/:id/lessons", post(create_lesson))
        .route("/assignments", get(assignments).post(create_assignment))
        .route("/assignments/:id", delete(delete_assignment))
        .route("/assignments/:id/submissions", get(submissions))
        .route("/submissions/:id/grade", put(grade))
}
