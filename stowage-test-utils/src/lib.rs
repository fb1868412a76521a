//! STOWAGE Test Utilities
//!
//! Shared test infrastructure for the STOWAGE workspace:
//! - A behavioural conformance suite every backend must pass
//! - Proptest generators for payloads
//! - Test fixtures for common records
//! - Custom assertions for storage results

pub use stowage_core::{
    Document, Filter, Payload, Record, RecordId, Storage, StorageError, StorageResult, ID_FIELD,
};

use serde_json::{json, Value};

// ============================================================================
// CONFORMANCE SUITE
// ============================================================================

pub mod conformance {
    //! Behaviour shared by every [`Storage`] implementation.
    //!
    //! Each check takes an empty storage and panics on the first violation.
    //! [`run_suite`] runs all of them, asking the factory for a fresh
    //! storage each time.

    use super::*;
    use std::future::Future;

    /// Run every conformance check against fresh storages from `factory`.
    pub async fn run_suite<S, F, Fut>(mut factory: F)
    where
        S: Storage<Value>,
        F: FnMut() -> Fut,
        Fut: Future<Output = S>,
    {
        create_then_read(&factory().await).await;
        update_replaces_payload(&factory().await).await;
        get_all_keeps_insertion_order(&factory().await).await;
        empty_storage(&factory().await).await;
        update_is_idempotent(&factory().await).await;
        remove_then_read_is_absent(&factory().await).await;
        update_unknown_id_upserts(&factory().await).await;
        read_unknown_id_is_absent(&factory().await).await;
        find_matches_exactly(&factory().await).await;
        list_agrees_with_get_all(&factory().await).await;
        set_creates_or_updates(&factory().await).await;
        id_field_is_not_stored(&factory().await).await;
    }

    /// `create({x:"100"})` then `read` returns the payload with its id.
    pub async fn create_then_read<S: Storage<Value>>(storage: &S) {
        let k = storage.create(json!({"x": "100"})).await.expect("create");
        let record = storage.read(&k).await.expect("read").expect("record exists");
        assert_eq!(flatten(&record), json!({"id": k.as_str(), "x": "100"}));
    }

    /// `update` replaces the payload stored under an existing id.
    pub async fn update_replaces_payload<S: Storage<Value>>(storage: &S) {
        let k = storage.create(json!({"x": "100"})).await.expect("create");
        storage.update(&k, json!({"x": "200"})).await.expect("update");
        let record = storage.read(&k).await.expect("read").expect("record exists");
        assert_eq!(flatten(&record), json!({"id": k.as_str(), "x": "200"}));
    }

    /// Three creates enumerate in order, and removal keeps the order.
    pub async fn get_all_keeps_insertion_order<S: Storage<Value>>(storage: &S) {
        let k1 = storage.create(json!({"x": "x1"})).await.expect("create");
        let k2 = storage.create(json!({"x": "x2"})).await.expect("create");
        let k3 = storage.create(json!({"x": "x3"})).await.expect("create");

        let ids: Vec<RecordId> = storage
            .get_all()
            .await
            .expect("get_all")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![k1.clone(), k2.clone(), k3.clone()]);

        storage.remove(&k1).await.expect("remove");
        let all: Vec<Value> = storage
            .get_all()
            .await
            .expect("get_all")
            .iter()
            .map(flatten)
            .collect();
        assert_eq!(
            all,
            vec![
                json!({"id": k2.as_str(), "x": "x2"}),
                json!({"id": k3.as_str(), "x": "x3"}),
            ]
        );
    }

    /// An empty storage counts zero and enumerates nothing.
    pub async fn empty_storage<S: Storage<Value>>(storage: &S) {
        assert_eq!(storage.count().await.expect("count"), 0);
        assert!(storage.get_all().await.expect("get_all").is_empty());
        assert!(storage.list().await.expect("list").is_empty());
    }

    pub async fn update_is_idempotent<S: Storage<Value>>(storage: &S) {
        let k = storage.create(json!({"x": "1"})).await.expect("create");
        storage.update(&k, json!({"x": "2"})).await.expect("update");
        let once = storage.read(&k).await.expect("read");
        storage.update(&k, json!({"x": "2"})).await.expect("update");
        let twice = storage.read(&k).await.expect("read");
        assert_eq!(once, twice);
        assert_eq!(storage.count().await.expect("count"), 1);
    }

    /// Removal works the same for existing and never-created ids.
    pub async fn remove_then_read_is_absent<S: Storage<Value>>(storage: &S) {
        let k = storage.create(json!({"x": "1"})).await.expect("create");
        storage.remove(&k).await.expect("remove");
        assert!(storage.read(&k).await.expect("read").is_none());

        let ghost = RecordId::from("never-created");
        storage.remove(&ghost).await.expect("remove of unknown id");
        assert!(storage.read(&ghost).await.expect("read").is_none());
        assert_eq!(storage.count().await.expect("count"), 0);
    }

    pub async fn update_unknown_id_upserts<S: Storage<Value>>(storage: &S) {
        let id = RecordId::from("caller-chosen");
        storage.update(&id, json!({"x": "new"})).await.expect("upsert");

        let record = storage.read(&id).await.expect("read").expect("record exists");
        assert_eq!(flatten(&record), json!({"id": "caller-chosen", "x": "new"}));
        assert_eq!(storage.count().await.expect("count"), 1);
        assert_eq!(storage.list().await.expect("list"), vec![id]);
    }

    pub async fn read_unknown_id_is_absent<S: Storage<Value>>(storage: &S) {
        storage.create(json!({"x": "1"})).await.expect("create");
        assert!(storage
            .read(&RecordId::from("missing"))
            .await
            .expect("read")
            .is_none());
    }

    pub async fn find_matches_exactly<S: Storage<Value>>(storage: &S) {
        let a = storage
            .create(json!({"kind": "cat", "age": 3}))
            .await
            .expect("create");
        storage
            .create(json!({"kind": "dog", "age": 3}))
            .await
            .expect("create");
        let c = storage
            .create(json!({"kind": "cat", "age": 5}))
            .await
            .expect("create");

        let cats = storage
            .find(&Filter::all().eq("kind", "cat"))
            .await
            .expect("find");
        assert_eq!(ids(&cats), vec![a.clone(), c]);

        let young_cats = storage
            .find(&Filter::all().eq("kind", "cat").eq("age", 3))
            .await
            .expect("find");
        assert_eq!(ids(&young_cats), vec![a]);

        let none = storage
            .find(&Filter::all().eq("kind", "bird"))
            .await
            .expect("find");
        assert!(none.is_empty());

        let everything = storage.find(&Filter::all()).await.expect("find");
        assert_eq!(everything.len(), 3);
    }

    pub async fn list_agrees_with_get_all<S: Storage<Value>>(storage: &S) {
        for n in 0..4 {
            storage.create(json!({"n": n})).await.expect("create");
        }
        let listed = storage.list().await.expect("list");
        let all = storage.get_all().await.expect("get_all");
        assert_eq!(listed, ids(&all));
        assert_eq!(storage.count().await.expect("count"), 4);
    }

    pub async fn set_creates_or_updates<S: Storage<Value>>(storage: &S) {
        let created = storage.set(None, json!({"x": "1"})).await.expect("set");
        let kept = storage
            .set(Some(created.clone()), json!({"x": "2"}))
            .await
            .expect("set");
        assert_eq!(created, kept);

        let record = storage.read(&created).await.expect("read").expect("record exists");
        assert_eq!(record.data, json!({"x": "2"}));
        assert_eq!(storage.count().await.expect("count"), 1);
    }

    /// An `id` inside the payload never overrides the record id.
    pub async fn id_field_is_not_stored<S: Storage<Value>>(storage: &S) {
        let k = storage
            .create(json!({"id": "spoofed", "x": "1"}))
            .await
            .expect("create");
        assert_ne!(k.as_str(), "spoofed");

        let record = storage.read(&k).await.expect("read").expect("record exists");
        assert_eq!(record.data, json!({"x": "1"}));
        assert_eq!(flatten(&record)[ID_FIELD], json!(k.as_str()));
    }

    /// Serialize a record the way it travels on the wire.
    pub fn flatten(record: &Record<Value>) -> Value {
        serde_json::to_value(record).expect("record serializes")
    }

    pub fn ids(records: &[Record<Value>]) -> Vec<RecordId> {
        records.iter().map(|r| r.id.clone()).collect()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating payloads.

    use super::*;
    use proptest::prelude::*;

    /// Generate a scalar JSON value.
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
            Just(Value::Null),
        ]
    }

    /// Generate a field name that is never the reserved id field.
    pub fn arb_field_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,8}".prop_filter("reserved field", |name| name != ID_FIELD)
    }

    /// Generate a flat JSON object payload.
    pub fn arb_payload() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(arb_field_name(), arb_scalar(), 0..8).prop_map(|fields| {
            Value::Object(fields.into_iter().collect())
        })
    }

    /// Generate a payload with one level of nesting.
    pub fn arb_nested_payload() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(
            arb_field_name(),
            prop_oneof![arb_scalar(), arb_payload()],
            0..6,
        )
        .prop_map(|fields| Value::Object(fields.into_iter().collect()))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common testing scenarios.

    use super::*;
    use serde::{Deserialize, Serialize};

    /// Typed record used to exercise non-`Value` documents.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Point {
        pub x: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label: Option<String>,
    }

    impl Point {
        pub fn new(x: impl Into<String>) -> Self {
            Self {
                x: x.into(),
                label: None,
            }
        }

        pub fn labelled(mut self, label: impl Into<String>) -> Self {
            self.label = Some(label.into());
            self
        }
    }

    /// Three small documents, in creation order.
    pub fn three_points() -> Vec<Value> {
        vec![json!({"x": "x1"}), json!({"x": "x2"}), json!({"x": "x3"})]
    }

    /// A document bigger than `bytes` once serialized.
    pub fn oversized_document(bytes: usize) -> Value {
        json!({"blob": "a".repeat(bytes + 1)})
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for storage results.

    use super::*;

    /// Assert that a StorageResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &StorageResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a StorageResult is a backend failure for the named medium.
    #[track_caller]
    pub fn assert_backend_error<T: std::fmt::Debug>(result: &StorageResult<T>, medium: &str) {
        match result {
            Err(StorageError::Backend { backend, .. }) if backend == medium => {}
            other => panic!("Expected {medium} backend error, got: {:?}", other),
        }
    }

    /// Assert that a StorageResult is a transport failure with `status`.
    #[track_caller]
    pub fn assert_transport_status<T: std::fmt::Debug>(result: &StorageResult<T>, status: u16) {
        match result {
            Err(StorageError::Transport { status: Some(s), .. }) if *s == status => {}
            other => panic!("Expected transport error with status {status}, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::Point;
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_point_skips_missing_label() {
        let value = serde_json::to_value(Point::new("100")).unwrap();
        assert_eq!(value, json!({"x": "100"}));

        let labelled = serde_json::to_value(Point::new("1").labelled("a")).unwrap();
        assert_eq!(labelled, json!({"x": "1", "label": "a"}));
    }

    proptest! {
        #[test]
        fn prop_generated_payloads_are_objects_without_id(payload in arb_nested_payload()) {
            let object = payload.as_object().expect("object payload");
            prop_assert!(!object.contains_key(ID_FIELD));
        }
    }
}
