use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod query;
pub use query::*;

mod rest;
pub use rest::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type ArcedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    /// The store returned something that isn't a valid record
    #[error("Malformed {resource} record: {reason}")]
    Malformed {
        resource: &'static str,
        reason: String,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn any(self) -> DatabaseError;
}

impl<E> IntoDatabaseError for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it contains something
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<Option<T>> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self? {
            Some(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// The collections exposed by the data store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Courses,
    Lessons,
    Enrollments,
    Assignments,
    Submissions,
    Progress,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Self::Users,
        Self::Courses,
        Self::Lessons,
        Self::Enrollments,
        Self::Assignments,
        Self::Submissions,
        Self::Progress,
    ];

    /// The name used in the store's URL paths
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Courses => "courses",
            Self::Lessons => "lessons",
            Self::Enrollments => "enrollments",
            Self::Assignments => "assignments",
            Self::Submissions => "submissions",
            Self::Progress => "progress",
        }
    }

    /// The singular name of a record, used in errors
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Courses => "course",
            Self::Lessons => "lesson",
            Self::Enrollments => "enrollment",
            Self::Assignments => "assignment",
            Self::Submissions => "submission",
            Self::Progress => "progress",
        }
    }
}

/// Represents a store that holds collections of JSON records.
///
/// Implementors assign the `id` of created records themselves. Callers never do.
#[async_trait]
pub trait Database: Send + Sync {
    async fn list(&self, collection: Collection, query: &Query) -> Result<Vec<Value>>;
    async fn get(&self, collection: Collection, id: PrimaryKey) -> Result<Value>;
    async fn create(&self, collection: Collection, record: Value) -> Result<Value>;
    async fn replace(&self, collection: Collection, id: PrimaryKey, record: Value)
        -> Result<Value>;
    async fn delete(&self, collection: Collection, id: PrimaryKey) -> Result<()>;
}

/// A record type stored in a [Collection]
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> PrimaryKey;
}

/// A typed view over one collection of a [Database]
pub struct Table<'a, R> {
    db: &'a dyn Database,
    record: PhantomData<R>,
}

impl<'a, R> Table<'a, R>
where
    R: Record,
{
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            record: PhantomData,
        }
    }

    pub async fn all(&self) -> Result<Vec<R>> {
        self.find(&Query::new()).await
    }

    pub async fn find(&self, query: &Query) -> Result<Vec<R>> {
        self.db
            .list(R::COLLECTION, query)
            .await?
            .into_iter()
            .map(decode::<R>)
            .collect()
    }

    /// Returns the first record matching the query, if any
    pub async fn first(&self, query: &Query) -> Result<Option<R>> {
        Ok(self.find(query).await?.into_iter().next())
    }

    pub async fn get(&self, id: PrimaryKey) -> Result<R> {
        self.db.get(R::COLLECTION, id).await.and_then(decode::<R>)
    }

    /// Like [Table::get], but a missing record is `None` instead of an error
    pub async fn get_optional(&self, id: PrimaryKey) -> Result<Option<R>> {
        match self.get(id).await {
            Ok(record) => Ok(Some(record)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create<N>(&self, new_record: &N) -> Result<R>
    where
        N: Serialize + Sync,
    {
        let value = encode::<R, _>(new_record)?;
        self.db.create(R::COLLECTION, value).await.and_then(decode::<R>)
    }

    /// Replaces the whole record with the same id
    pub async fn replace(&self, record: &R) -> Result<R> {
        let value = encode::<R, _>(record)?;

        self.db
            .replace(R::COLLECTION, record.id(), value)
            .await
            .and_then(decode::<R>)
    }

    pub async fn delete(&self, id: PrimaryKey) -> Result<()> {
        self.db.delete(R::COLLECTION, id).await
    }
}

fn encode<R: Record, T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| DatabaseError::Malformed {
        resource: R::COLLECTION.resource(),
        reason: e.to_string(),
    })
}

fn decode<R: Record>(value: Value) -> Result<R> {
    serde_json::from_value(value).map_err(|e| DatabaseError::Malformed {
        resource: R::COLLECTION.resource(),
        reason: e.to_string(),
    })
}

/// Reads the numeric id of a stored record.
/// Numeric strings are accepted since some stores keep ids as strings.
pub fn record_id(record: &Value) -> Option<PrimaryKey> {
    match record.get("id")? {
        Value::Number(n) => n.as_u64().and_then(|n| PrimaryKey::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Returns the id the next record of a collection should get
pub fn next_id(records: &[Value]) -> PrimaryKey {
    records.iter().filter_map(record_id).max().unwrap_or(0) + 1
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{next_id, record_id};

    #[test]
    fn next_id_is_one_past_the_highest() {
        assert_eq!(next_id(&[]), 1);

        let records = vec![json!({ "id": 3 }), json!({ "id": "7" }), json!({ "id": 5 })];
        assert_eq!(next_id(&records), 8);
    }

    #[test]
    fn record_id_ignores_garbage() {
        assert_eq!(record_id(&json!({ "id": "abc" })), None);
        assert_eq!(record_id(&json!({ "name": "x" })), None);
        assert_eq!(record_id(&json!({ "id": 12 })), Some(12));
    }
}
