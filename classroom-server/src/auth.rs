use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json,
};
use classroom_collab::{
    gate::{self, Access},
    navigation::{ADMINS, STAFF, STUDENTS},
    Credentials, Registration, Role, SessionData, UserProfile,
};
use serde::Deserialize;

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(pub SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> &UserProfile {
        &self.0.user
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Finds the session token in the Authorization header, or the `token` query parameter
fn token_from_parts(parts: &Parts) -> ServerResult<Option<String>> {
    if let Some(header) = parts.headers.get(header::AUTHORIZATION) {
        let header = header
            .to_str()
            .map_err(|_| ServerError::Validation("Authorization must be Bearer".to_string()))?;

        let parts: Vec<_> = header.split_ascii_whitespace().collect();

        return match parts.as_slice() {
            ["Bearer", token] => Ok(Some(token.to_string())),
            _ => Err(ServerError::Validation(
                "Authorization must be Bearer".to_string(),
            )),
        };
    }

    let query = Query::<TokenQuery>::try_from_uri(&parts.uri)
        .map(|q| q.0.token)
        .unwrap_or_default();

    Ok(query)
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)?
            .ok_or(ServerError::Unauthorized("Missing authorization"))?;

        let session = state
            .collab
            .auth
            .session(&token)
            .ok_or(ServerError::Unauthorized("Session does not exist"))?;

        Ok(Self(session))
    }
}

/// Runs the role gate on the request's session
async fn gated_session(
    parts: &mut Parts,
    state: &ServerContext,
    required: &[Role],
) -> ServerResult<SessionData> {
    let session = match Session::from_request_parts(parts, state).await {
        Ok(session) => Some(session.0),
        Err(ServerError::Unauthorized(_)) => None,
        Err(e) => return Err(e),
    };

    match (gate::check(required, session.as_ref()), session) {
        (Access::Render, Some(session)) => Ok(session),
        (Access::RedirectToHome, _) => Err(ServerError::Forbidden(format!(
            "Your role may not access this, go to {}",
            Access::HOME_PATH
        ))),
        _ => Err(ServerError::Unauthorized("Login required")),
    }
}

macro_rules! gated_extractor {
    ($(#[$meta:meta])* $name:ident, $roles:expr) => {
        $(#[$meta])*
        pub struct $name(pub SessionData);

        impl $name {
            pub fn user(&self) -> &UserProfile {
                &self.0.user
            }
        }

        #[async_trait]
        impl FromRequestParts<ServerContext> for $name {
            type Rejection = ServerError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &ServerContext,
            ) -> Result<Self, Self::Rejection> {
                gated_session(parts, state, $roles).await.map(Self)
            }
        }
    };
}

gated_extractor!(
    /// A session belonging to a student
    StudentSession,
    STUDENTS
);
gated_extractor!(
    /// A session belonging to an instructor or admin
    StaffSession,
    STAFF
);
gated_extractor!(
    /// A session belonging to an admin
    AdminSession,
    ADMINS
);

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 400, description = "Invalid registration"),
        (status = 409, description = "Email already registered")
    )
)]
async fn register(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .collab
        .auth
        .register(Registration {
            name: body.name,
            email: body.email,
            password: body.password,
            confirm_password: body.confirm_password,
            role: body.role,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 400, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive")
    )
)]
async fn login(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .collab
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204)
    )
)]
async fn logout(session: Session, context: ServerContext) -> ServerResult<StatusCode> {
    context.collab.auth.logout(&session.0.token)?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/auth/user",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn user(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(user))
}
