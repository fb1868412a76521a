//! PostgreSQL conformance. Needs a reachable database, see
//! `DocumentStoreConfig::from_env` for the connection variables.
#![cfg(feature = "db-tests")]

use serde_json::Value;
use stowage_storage::{DocumentStorage, DocumentStoreConfig, RecordId};
use stowage_test_utils::conformance::run_suite;

fn unique_collection() -> String {
    format!("conformance_{}", RecordId::generate().as_str().replace('-', "_"))
}

#[tokio::test]
async fn document_storage_conforms() {
    let pool = DocumentStoreConfig::from_env()
        .create_pool()
        .expect("pool creation should succeed");

    let mut collections = Vec::new();
    run_suite(|| {
        let name = unique_collection();
        collections.push(name.clone());
        let pool = pool.clone();
        async move {
            DocumentStorage::<Value>::connect(pool, &name)
                .await
                .expect("connect should succeed")
        }
    })
    .await;

    for name in collections {
        let storage = DocumentStorage::<Value>::connect(pool.clone(), &name)
            .await
            .expect("connect should succeed");
        storage.drop_collection().await.expect("drop should succeed");
    }
}
