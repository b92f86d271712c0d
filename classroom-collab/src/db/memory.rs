use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::{record_id, Collection, Database, DatabaseError, PrimaryKey, Query, Result};

type Records = BTreeMap<PrimaryKey, Value>;

/// An in-process store with the same semantics as the REST store
#[derive(Default)]
pub struct MemoryDatabase {
    collections: RwLock<HashMap<Collection, Records>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with records, which must carry their own ids
    pub fn with_records(records: impl IntoIterator<Item = (Collection, Value)>) -> Result<Self> {
        let database = Self::new();

        {
            let mut collections = database.collections.write();

            for (collection, record) in records {
                let id = record_id(&record).ok_or_else(|| DatabaseError::Malformed {
                    resource: collection.resource(),
                    reason: "seeded record has no id".to_string(),
                })?;

                collections.entry(collection).or_default().insert(id, record);
            }
        }

        Ok(database)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn list(&self, collection: Collection, query: &Query) -> Result<Vec<Value>> {
        let collections = self.collections.read();

        let records: Vec<Value> = collections
            .get(&collection)
            .map(|records| {
                records
                    .values()
                    .filter(|r| query.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(records)
    }

    async fn get(&self, collection: Collection, id: PrimaryKey) -> Result<Value> {
        self.collections
            .read()
            .get(&collection)
            .and_then(|records| records.get(&id))
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: collection.resource(),
                identifier: "id",
            })
    }

    async fn create(&self, collection: Collection, mut record: Value) -> Result<Value> {
        let mut collections = self.collections.write();
        let records = collections.entry(collection).or_default();

        let id = records.keys().next_back().copied().unwrap_or(0) + 1;
        set_id(collection, &mut record, id)?;

        records.insert(id, record.clone());
        Ok(record)
    }

    async fn replace(
        &self,
        collection: Collection,
        id: PrimaryKey,
        mut record: Value,
    ) -> Result<Value> {
        let mut collections = self.collections.write();

        let existing = collections
            .get_mut(&collection)
            .and_then(|records| records.get_mut(&id))
            .ok_or(DatabaseError::NotFound {
                resource: collection.resource(),
                identifier: "id",
            })?;

        set_id(collection, &mut record, id)?;
        *existing = record.clone();

        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: PrimaryKey) -> Result<()> {
        self.collections
            .write()
            .get_mut(&collection)
            .and_then(|records| records.remove(&id))
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: collection.resource(),
                identifier: "id",
            })
    }
}

fn set_id(collection: Collection, record: &mut Value, id: PrimaryKey) -> Result<()> {
    record
        .as_object_mut()
        .map(|fields| {
            fields.insert("id".to_string(), id.into());
        })
        .ok_or(DatabaseError::Malformed {
            resource: collection.resource(),
            reason: "record is not an object".to_string(),
        })
}
