use axum::{
    extract::Path,
    routing::{get, post},
    Json,
};
use classroom_collab::PrimaryKey;

use crate::{
    auth::StudentSession,
    context::ServerContext,
    errors::ServerResult,
    schemas::{SubmissionSchema, ValidatedJson},
    serialized::{EnrolledCourse, StudentAssignment, Submission, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/student/courses",
    tag = "student",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<EnrolledCourse>)
    )
)]
async fn my_courses(
    session: StudentSession,
    context: ServerContext,
) -> ServerResult<Json<Vec<EnrolledCourse>>> {
    let courses = context.collab.learning.my_courses(session.user().id).await?;

    Ok(Json(courses.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/student/assignments",
    tag = "student",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<StudentAssignment>)
    )
)]
async fn my_assignments(
    session: StudentSession,
    context: ServerContext,
) -> ServerResult<Json<Vec<StudentAssignment>>> {
    let assignments = context
        .collab
        .coursework
        .student_assignments(session.user().id)
        .await?;

    Ok(Json(assignments.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/student/assignments/{id}/submission",
    tag = "student",
    request_body = SubmissionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Submission),
        (status = 403, description = "Not enrolled in the assignment's course")
    )
)]
async fn submit(
    session: StudentSession,
    context: ServerContext,
    Path(assignment_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<SubmissionSchema>,
) -> ServerResult<Json<Submission>> {
    let submission = context
        .collab
        .coursework
        .submit(session.user(), assignment_id, body.response)
        .await?;

    Ok(Json(submission.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/courses", get(my_courses))
        .route("/assignments", get(my_assignments))
        .route("/assignments/:id/submission", post(submit))
}
