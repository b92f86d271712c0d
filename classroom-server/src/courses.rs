use axum::{
    extract::{Path, Query},
    routing::{get, post},
    Json,
};
use classroom_collab::{CatalogFilter, PrimaryKey};

use crate::{
    auth::{Session, StudentSession},
    context::ServerContext,
    errors::ServerResult,
    schemas::CatalogQuery,
    serialized::{Course, CourseDetails, Enrollment, LessonView, Progress, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/courses",
    tag = "courses",
    params(CatalogQuery),
    responses(
        (status = 200, body = Vec<Course>, description = "Active courses matching the filter")
    )
)]
async fn catalog(
    context: ServerContext,
    Query(query): Query<CatalogQuery>,
) -> ServerResult<Json<Vec<Course>>> {
    let courses = context
        .collab
        .catalog
        .browse(&CatalogFilter {
            search: query.search.filter(|s| !s.trim().is_empty()),
            category: query.category,
        })
        .await?;

    Ok(Json(courses.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/courses/categories",
    tag = "courses",
    responses(
        (status = 200, body = Vec<String>)
    )
)]
async fn categories(context: ServerContext) -> ServerResult<Json<Vec<String>>> {
    let categories = context.collab.catalog.categories().await?;

    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/v1/courses/{id}",
    tag = "courses",
    security(
        (),
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = CourseDetails),
        (status = 404, description = "Course not found")
    )
)]
async fn course(
    session: Option<Session>,
    context: ServerContext,
    Path(course_id): Path<PrimaryKey>,
) -> ServerResult<Json<CourseDetails>> {
    let details = context
        .collab
        .catalog
        .details(course_id, session.as_ref().map(|s| s.user()))
        .await?;

    Ok(Json(details.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/courses/{id}/enroll",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Enrollment),
        (status = 409, description = "Already enrolled")
    )
)]
async fn enroll(
    session: StudentSession,
    context: ServerContext,
    Path(course_id): Path<PrimaryKey>,
) -> ServerResult<Json<Enrollment>> {
    let enrollment = context
        .collab
        .learning
        .enroll(session.user(), course_id)
        .await?;

    Ok(Json(enrollment.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/lessons/{lesson_id}",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = LessonView),
        (status = 404, description = "Lesson not found in this course")
    )
)]
async fn lesson(
    session: StudentSession,
    context: ServerContext,
    Path((course_id, lesson_id)): Path<(PrimaryKey, PrimaryKey)>,
) -> ServerResult<Json<LessonView>> {
    let view = context
        .collab
        .learning
        .lesson_view(session.user().id, course_id, lesson_id)
        .await?;

    Ok(Json(view.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/lessons/{lesson_id}/complete",
    tag = "courses",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Progress),
        (status = 403, description = "Not enrolled in the course")
    )
)]
async fn complete_lesson(
    session: StudentSession,
    context: ServerContext,
    Path((course_id, lesson_id)): Path<(PrimaryKey, PrimaryKey)>,
) -> ServerResult<Json<Progress>> {
    let progress = context
        .collab
        .learning
        .complete_lesson(session.user(), course_id, lesson_id)
        .await?;

    Ok(Json(progress.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(catalog))
        .route("/categories", get(categories))
        .route("/:id", get(course))
        .route("/:id/enroll", post(enroll))
        .route("/:id/lessons/:lesson_id", get(lesson))
        .route("/:id/lessons/:lesson_id/complete", post(complete_lesson))
}
