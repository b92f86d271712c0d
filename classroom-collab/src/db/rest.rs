use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use super::{
    next_id, record_id, Collection, Database, DatabaseError, IntoDatabaseError, PrimaryKey, Query,
    Result,
};

/// A client for a generic REST data store, where every collection lives at `/<name>`.
///
/// Lists are filtered with query string parameters, records are created with POST,
/// replaced with PUT, and removed with DELETE.
pub struct RestDatabase {
    base_url: Url,
    client: Client,
    /// Serializes id assignment, one lock per collection
    create_locks: [Mutex<()>; Collection::ALL.len()],
}

impl RestDatabase {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| e.any())?;

        if base_url.cannot_be_a_base() {
            return Err(DatabaseError::Malformed {
                resource: "store url",
                reason: format!("{} cannot be used as a base url", base_url),
            });
        }

        Ok(Self {
            base_url,
            client: Client::new(),
            create_locks: Default::default(),
        })
    }

    /// The URL of a collection, or of one record in it
    pub fn url(&self, collection: Collection, id: Option<PrimaryKey>) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection.name());

            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }

        url
    }

    async fn execute(&self, collection: Collection, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| e.any())?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DatabaseError::NotFound {
                resource: collection.resource(),
                identifier: "id",
            });
        }

        response.error_for_status().map_err(|e| e.any())
    }

    async fn send(&self, collection: Collection, request: RequestBuilder) -> Result<Value> {
        let response = self.execute(collection, request).await?;
        let body = response.json::<Value>().await.map_err(|e| e.any())?;

        Ok(normalize_id(body))
    }

    async fn send_all(&self, collection: Collection, query: &Query) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.url(collection, None))
            .query(&query.to_pairs());

        match self.send(collection, request).await? {
            Value::Array(records) => Ok(records.into_iter().map(normalize_id).collect()),
            _ => Err(DatabaseError::Malformed {
                resource: collection.resource(),
                reason: "expected a list of records".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Database for RestDatabase {
    async fn list(&self, collection: Collection, query: &Query) -> Result<Vec<Value>> {
        debug!("GET /{} {:?}", collection.name(), query.to_pairs());
        self.send_all(collection, query).await
    }

    async fn get(&self, collection: Collection, id: PrimaryKey) -> Result<Value> {
        let request = self.client.get(self.url(collection, Some(id)));
        self.send(collection, request).await
    }

    async fn create(&self, collection: Collection, mut record: Value) -> Result<Value> {
        let _guard = self.create_locks[collection as usize].lock().await;

        let existing = self.send_all(collection, &Query::new()).await?;
        let id = next_id(&existing);

        match record.as_object_mut() {
            Some(fields) => fields.insert("id".to_string(), id.into()),
            None => {
                return Err(DatabaseError::Malformed {
                    resource: collection.resource(),
                    reason: "record is not an object".to_string(),
                })
            }
        };

        debug!("POST /{} with id {}", collection.name(), id);

        let request = self.client.post(self.url(collection, None)).json(&record);
        self.send(collection, request).await
    }

    async fn replace(
        &self,
        collection: Collection,
        id: PrimaryKey,
        record: Value,
    ) -> Result<Value> {
        let request = self.client.put(self.url(collection, Some(id))).json(&record);
        self.send(collection, request).await
    }

    async fn delete(&self, collection: Collection, id: PrimaryKey) -> Result<()> {
        let request = self.client.delete(self.url(collection, Some(id)));
        self.execute(collection, request).await.map(|_| ())
    }
}

/// Some stores hand out ids as strings, records here always use numbers
fn normalize_id(mut record: Value) -> Value {
    let id = record_id(&record);

    if let (Some(id), Some(fields)) = (id, record.as_object_mut()) {
        fields.insert("id".to_string(), id.into());
    }

    record
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{normalize_id, RestDatabase};
    use crate::Collection;

    #[test]
    fn builds_collection_and_record_urls() {
        let db = RestDatabase::new("http://localhost:3001").unwrap();

        assert_eq!(
            db.url(Collection::Progress, None).as_str(),
            "http://localhost:3001/progress"
        );
        assert_eq!(
            db.url(Collection::Users, Some(12)).as_str(),
            "http://localhost:3001/users/12"
        );
    }

    #[test]
    fn keeps_base_path() {
        let db = RestDatabase::new("http://store.local/api/").unwrap();

        assert_eq!(
            db.url(Collection::Courses, Some(3)).as_str(),
            "http://store.local/api/courses/3"
        );
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(RestDatabase::new("not a url").is_err());
        assert!(RestDatabase::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn string_ids_become_numbers() {
        assert_eq!(normalize_id(json!({ "id": "5" })), json!({ "id": 5 }));
        assert_eq!(normalize_id(json!({ "id": "x" })), json!({ "id": "x" }));
    }
}
