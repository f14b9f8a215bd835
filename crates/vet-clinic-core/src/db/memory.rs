//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    matches_all, merge_fields, new_document_id, validate_all, Document, DocumentStore, Fields,
    GuardedWrite, Predicate, StoreError, StoreResult,
};

type Collection = BTreeMap<String, Fields>;

/// Document store backed by in-memory maps.
///
/// A single lock guards all collections, so the guarded writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> StoreResult<usize> {
        let collections = self.collections.lock()?;
        Ok(collections.get(collection).map_or(0, |c| c.len()))
    }

    pub fn is_empty(&self, collection: &str) -> StoreResult<bool> {
        Ok(self.len(collection)? == 0)
    }
}

fn find(collection: Option<&Collection>, predicates: &[Predicate]) -> Vec<Document> {
    collection
        .into_iter()
        .flat_map(|c| c.iter())
        .filter(|(_, fields)| matches_all(predicates, fields))
        .map(|(id, fields)| Document {
            id: id.clone(),
            fields: fields.clone(),
        })
        .collect()
}

fn merge_into(collection: &mut Collection, id: &str, fields: Fields) -> StoreResult<()> {
    let existing = collection
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    merge_fields(existing, fields);
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn query(&self, collection: &str, predicates: &[Predicate]) -> StoreResult<Vec<Document>> {
        validate_all(predicates)?;
        let collections = self.collections.lock()?;
        Ok(find(collections.get(collection), predicates))
    }

    async fn insert_document(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let id = new_document_id();
        let mut collections = self.collections.lock()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn update_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let mut collections = self.collections.lock()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        merge_into(target, id, fields)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.lock()?;
        if let Some(target) = collections.get_mut(collection) {
            target.remove(id);
        }
        Ok(())
    }

    async fn insert_unique(
        &self,
        collection: &str,
        fields: Fields,
        unique: &[Predicate],
    ) -> StoreResult<GuardedWrite<String>> {
        validate_all(unique)?;
        let mut collections = self.collections.lock()?;
        let target = collections.entry(collection.to_string()).or_default();

        if target.values().any(|existing| matches_all(unique, existing)) {
            return Ok(GuardedWrite::Conflict);
        }

        let id = new_document_id();
        target.insert(id.clone(), fields);
        Ok(GuardedWrite::Applied(id))
    }

    async fn update_unique(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        unique: &[Predicate],
        exclude_self: bool,
    ) -> StoreResult<GuardedWrite<()>> {
        validate_all(unique)?;
        let mut collections = self.collections.lock()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let conflict = target
            .iter()
            .filter(|(existing_id, _)| !(exclude_self && existing_id.as_str() == id))
            .any(|(_, existing)| matches_all(unique, existing));
        if conflict {
            return Ok(GuardedWrite::Conflict);
        }

        merge_into(target, id, fields)?;
        Ok(GuardedWrite::Applied(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Operator;
    use serde_json::{json, Value};

    fn body(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let id = store
            .insert_document("Consultas", body(json!({"veterinario": "Ana"})))
            .await
            .unwrap();

        let doc = store.get_document("Consultas", &id).await.unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.fields["veterinario"], "Ana");
        assert!(store.get_document("Pets", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_filters_conjunctively() {
        let store = MemoryStore::new();
        store
            .insert_document("Consultas", body(json!({"veterinario": "Ana", "data": 10})))
            .await
            .unwrap();
        store
            .insert_document("Consultas", body(json!({"veterinario": "Ana", "data": 20})))
            .await
            .unwrap();
        store
            .insert_document("Consultas", body(json!({"veterinario": "Bia", "data": 10})))
            .await
            .unwrap();

        let preds = vec![
            Predicate::eq("veterinario", "Ana"),
            Predicate::new("data", Operator::Lt, 15),
        ];
        let docs = store.query("Consultas", &preds).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields["data"], 10);

        assert_eq!(store.query("Consultas", &[]).await.unwrap().len(), 3);
        assert!(store.query("Racas", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_requires_existing() {
        let store = MemoryStore::new();
        let id = store
            .insert_document("Pets", body(json!({"nome": "Rex", "raca": "Vira-lata"})))
            .await
            .unwrap();

        store
            .update_document("Pets", &id, body(json!({"raca": "Poodle"})))
            .await
            .unwrap();
        let doc = store.get_document("Pets", &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["nome"], "Rex");
        assert_eq!(doc.fields["raca"], "Poodle");

        let missing = store
            .update_document("Pets", "nope", body(json!({"raca": "Poodle"})))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let id = store.insert_document("Pets", Fields::new()).await.unwrap();

        store.delete_document("Pets", &id).await.unwrap();
        store.delete_document("Pets", &id).await.unwrap();
        store.delete_document("Unknown", "x").await.unwrap();
        assert!(store.is_empty("Pets").unwrap());
    }

    #[tokio::test]
    async fn test_insert_unique_blocks_duplicates() {
        let store = MemoryStore::new();
        let unique = vec![Predicate::eq("veterinario", "Ana"), Predicate::eq("data", 10)];
        let fields = body(json!({"veterinario": "Ana", "data": 10}));

        let first = store
            .insert_unique("Consultas", fields.clone(), &unique)
            .await
            .unwrap();
        assert!(matches!(first, GuardedWrite::Applied(_)));

        let second = store.insert_unique("Consultas", fields, &unique).await.unwrap();
        assert_eq!(second, GuardedWrite::Conflict);
        assert_eq!(store.len("Consultas").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_unique_self_scope() {
        let store = MemoryStore::new();
        let fields = body(json!({"veterinario": "Ana", "data": 10}));
        let id = store.insert_document("Consultas", fields.clone()).await.unwrap();
        let unique = vec![Predicate::eq("veterinario", "Ana"), Predicate::eq("data", 10)];

        let including = store
            .update_unique("Consultas", &id, fields.clone(), &unique, false)
            .await
            .unwrap();
        assert_eq!(including, GuardedWrite::Conflict);

        let excluding = store
            .update_unique("Consultas", &id, fields, &unique, true)
            .await
            .unwrap();
        assert_eq!(excluding, GuardedWrite::Applied(()));
    }

    #[tokio::test]
    async fn test_update_unique_missing_collection_left_absent() {
        let store = MemoryStore::new();
        let unique = vec![Predicate::eq("veterinario", "Ana")];

        let result = store
            .update_unique("Consultas", "nope", body(json!({"veterinario": "Ana"})), &unique, true)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(!store.collections.lock().unwrap().contains_key("Consultas"));
    }
}
