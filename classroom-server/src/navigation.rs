use axum::{extract::Query, routing::get, Json};
use classroom_collab::navigation::navigate;

use crate::{
    auth::Session,
    schemas::NavigateQuery,
    serialized::{Navigation, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/navigate",
    tag = "navigation",
    params(NavigateQuery),
    security(
        (),
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Navigation, description = "The page to render, or where to redirect")
    )
)]
async fn resolve(session: Option<Session>, Query(query): Query<NavigateQuery>) -> Json<Navigation> {
    let session = session.map(|s| s.0);
    let navigation = navigate(&query.path, session.as_ref());

    Json(navigation.to_serialized())
}

pub fn router() -> Router {
    Router::new().route("/", get(resolve))
}
