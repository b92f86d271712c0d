use axum::{extract::DefaultBodyLimit, routing::get};
use log::info;
use std::{
    io,
    net::{Ipv6Addr, SocketAddr},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod admin;
mod auth;
mod context;
mod courses;
mod docs;
mod errors;
mod instructor;
mod navigation;
mod schemas;
mod serialized;
mod sse;
mod student;

pub use context::ServerContext;
pub use sse::{forward_events, ServerEvent, ServerSentEvents};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

/// Large enough for an embedded thumbnail, which may be 5 MB before base64
const BODY_LIMIT: usize = 8 * 1024 * 1024;

pub type Router = axum::Router<ServerContext>;

/// Builds every route of the server, ready to be served
pub fn app(context: ServerContext) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/navigate", navigation::router())
        .nest("/courses", courses::router())
        .nest("/student", student::router())
        .nest("/instructor", instructor::router())
        .nest("/admin", admin::router())
        .nest("/events", sse::router());

    Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .with_state(context)
}

/// Starts the classroom server
pub async fn run_server(context: ServerContext, port: u16) -> io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on {}", addr);
    axum::serve(listener, app(context).into_make_service()).await
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use classroom_collab::{Collab, CollabConfig, MemoryDatabase, MemorySessionStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{app, ServerContext};

    fn test_app() -> Router {
        let collab = Collab::new(
            MemoryDatabase::new(),
            MemorySessionStore::new(),
            CollabConfig::default(),
        );

        app(ServerContext::new(Arc::new(collab)))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    async fn register(app: &Router, name: &str, role: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "password": "secret1",
                "confirmPassword": "secret1",
                "role": role,
            })),
        )
        .await
    }

    #[tokio::test]
    async fn register_then_fetch_user() {
        let app = test_app();

        let (status, body) = register(&app, "Ada", "student").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], 1);
        assert_eq!(body["redirect"], "/my-courses");

        let token = body["token"].as_str().unwrap().to_string();
        let (status, user) = send(&app, Method::GET, "/v1/auth/user", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["name"], "Ada");
        assert!(user.get("password").is_none());

        let (status, _) = register(&app, "Ada", "student").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = register(&app, "Eve", "admin").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn role_gate_on_routes() {
        let app = test_app();

        let (_, body) = register(&app, "Grace", "instructor").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(&app, Method::GET, "/v1/admin/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::GET, "/v1/admin/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::GET,
            "/v1/instructor/courses",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, navigation) = send(
            &app,
            Method::GET,
            "/v1/navigate?path=/admin/users",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(navigation["redirect"], "/");

        let (_, navigation) =
            send(&app, Method::GET, "/v1/navigate?path=/my-courses", None, None).await;
        assert_eq!(navigation["redirect"], "/login");
    }

    #[tokio::test]
    async fn course_lifecycle() {
        let app = test_app();

        let (_, grace) = register(&app, "Grace", "instructor").await;
        let grace = grace["token"].as_str().unwrap().to_string();
        let (_, ada) = register(&app, "Ada", "student").await;
        let ada = ada["token"].as_str().unwrap().to_string();

        let (status, course) = send(
            &app,
            Method::POST,
            "/v1/instructor/courses",
            Some(&grace),
            Some(json!({
                "title": "Compilers",
                "description": "Lexing and parsing",
                "category": "Programming",
                "duration": "4 weeks",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(course["instructorName"], "Grace");

        let (status, lesson) = send(
            &app,
            Method::POST,
            "/v1/instructor/courses/1/lessons",
            Some(&grace),
            Some(json!({ "title": "Lexing", "type": "text", "content": "Tokens" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lesson["order"], 1);

        let (status, _) = send(&app, Method::POST, "/v1/courses/1/enroll", Some(&ada), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::POST, "/v1/courses/1/enroll", Some(&ada), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, progress) = send(
            &app,
            Method::POST,
            "/v1/courses/1/lessons/1/complete",
            Some(&ada),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(progress["progressPercentage"], 100.0);

        let (status, found) = send(&app, Method::GET, "/v1/courses?search=LEX", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().map(|c| c.len()), Some(1));

        let (status, _) = send(&app, Method::GET, "/v1/courses/99", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
