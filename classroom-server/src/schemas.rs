use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::{DateTime, Utc};
use classroom_collab::{LessonKind, PrimaryKey, Role, Status};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 254))]
    pub email: String,
    #[validate(length(max = 128))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(max = 128))]
    pub name: String,
    #[validate(length(max = 254))]
    pub email: String,
    #[validate(length(max = 128))]
    pub password: String,
    #[validate(length(max = 128))]
    pub confirm_password: String,
    /// Either student or instructor
    #[schema(value_type = String, example = "student")]
    pub role: Role,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCourseSchema {
    #[validate(length(max = 256))]
    pub title: String,
    #[validate(length(max = 8192))]
    pub description: String,
    #[validate(length(max = 128))]
    pub category: String,
    #[validate(length(max = 64))]
    pub duration: String,
    /// A URL or a `data:` image, a placeholder is used if omitted
    pub thumbnail: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCourseSchema {
    #[validate(length(max = 256))]
    pub title: String,
    #[validate(length(max = 8192))]
    pub description: String,
    #[validate(length(max = 128))]
    pub category: String,
    #[validate(length(max = 64))]
    pub duration: String,
    pub thumbnail: String,
    #[schema(value_type = String, example = "active")]
    pub status: Status,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewLessonSchema {
    #[validate(length(max = 256))]
    pub title: String,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "video")]
    pub kind: LessonKind,
    pub content: String,
    #[validate(length(max = 64))]
    pub duration: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAssignmentSchema {
    pub course_id: PrimaryKey,
    #[validate(length(max = 256))]
    pub title: String,
    #[validate(length(max = 8192))]
    pub description: String,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmissionSchema {
    #[validate(length(max = 65536))]
    pub response: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradeSchema {
    #[validate(length(max = 64))]
    pub grade: String,
    #[validate(length(max = 8192))]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Matched against title and description
    pub search: Option<String>,
    /// `All` matches every category
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NavigateQuery {
    pub path: String,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ServerError::Validation(e.body_text()))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| ServerError::Validation(format!("Request body is invalid: {e}")))?;

        Ok(Self(extracted_json.0))
    }
}
