use axum::{
    extract::Path,
    http::StatusCode,
    routing::{delete, get, post},
    Json,
};
use classroom_collab::PrimaryKey;

use crate::{
    auth::AdminSession,
    context::ServerContext,
    errors::ServerResult,
    serialized::{Course, DashboardStats, ToSerialized, User},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/admin/dashboard",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = DashboardStats)
    )
)]
async fn dashboard(
    session: AdminSession,
    context: ServerContext,
) -> ServerResult<Json<DashboardStats>> {
    let stats = context.collab.admin.dashboard(session.user()).await?;

    Ok(Json(stats.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>)
    )
)]
async fn users(session: AdminSession, context: ServerContext) -> ServerResult<Json<Vec<User>>> {
    let users = context.collab.admin.users(session.user()).await?;

    Ok(Json(users.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/users/{id}/status",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User, description = "The user with their status flipped"),
        (status = 403, description = "Admins can't deactivate themselves")
    )
)]
async fn toggle_user_status(
    session: AdminSession,
    context: ServerContext,
    Path(user_id): Path<PrimaryKey>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .admin
        .toggle_user_status(session.user(), user_id)
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/admin/users/{id}",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204),
        (status = 403, description = "Admins can't delete themselves")
    )
)]
async fn delete_user(
    session: AdminSession,
    context: ServerContext,
    Path(user_id): Path<PrimaryKey>,
) -> ServerResult<StatusCode> {
    context
        .collab
        .admin
        .delete_user(session.user(), user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/admin/courses",
    operation_id = "admin_courses",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Course>, description = "Every course, in any status")
    )
)]
async fn courses(session: AdminSession, context: ServerContext) -> ServerResult<Json<Vec<Course>>> {
    let courses = context.collab.admin.courses(session.user()).await?;

    Ok(Json(courses.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/courses/{id}/status",
    operation_id = "admin_toggle_course_status",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Course)
    )
)]
async fn toggle_course_status(
    session: AdminSession,
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
    delete,
    path = "/v1/admin/courses/{id}",
    operation_id = "admin_delete_course",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204)
    )
)]
async fn delete_course(
    session: AdminSession,
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

pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(users))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/status", post(toggle_user_status))
        .route("/courses", get(courses))
        .route("/courses/:id", delete(delete_course))
        .route("/courses/:id/status", post(toggle_course_status))
}
