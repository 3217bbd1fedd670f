//! Global version listing and local version resolution

mod helpers;

use cmt_common::DetectorGeneration;
use cmt_resolver::{Error, GlobalVersionResolver};
use helpers::*;
use serde_json::json;
use std::sync::Arc;

fn resolver(pool: &sqlx::SqlitePool) -> (Arc<CountingStore>, GlobalVersionResolver) {
    let store = Arc::new(CountingStore::new(pool.clone()));
    let resolver = GlobalVersionResolver::new(store.clone(), DetectorGeneration::Xenonnt);
    (store, resolver)
}

async fn seed_versions(pool: &sqlx::SqlitePool, labels: &[&str]) {
    let extra: Vec<(&str, serde_json::Value)> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let elife = format!("v{}", i + 1);
            (*label, global_mapping(&[("elife", elife.as_str())]))
        })
        .collect();
    seed_global(pool, &[("pmt", 3)], &extra).await;
}

#[tokio::test]
async fn test_global_versions_in_append_order() {
    let pool = create_test_db().await;
    seed_versions(&pool, &["global_v1", "global_v2"]).await;
    let (_, resolver) = resolver(&pool);

    let versions = resolver.global_versions().await.unwrap();
    assert_eq!(versions, vec!["global_ONLINE", "global_v1", "global_v2"]);
}

#[tokio::test]
async fn test_latest_is_last_column() {
    for count in [1usize, 2, 5] {
        let pool = create_test_db().await;
        let labels: Vec<String> = (1..=count).map(|i| format!("global_v{}", i)).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        seed_versions(&pool, &refs).await;
        let (_, resolver) = resolver(&pool);

        let latest = resolver.local_versions("latest").await.unwrap();
        let explicit = resolver
            .local_versions(&format!("global_v{}", count))
            .await
            .unwrap();

        assert_eq!(latest, explicit);
        assert_eq!(latest["elife"], format!("v{}", count));
    }
}

#[tokio::test]
async fn test_unknown_label_lists_available() {
    let pool = create_test_db().await;
    seed_versions(&pool, &["global_v1"]).await;
    let (_, resolver) = resolver(&pool);

    match resolver.local_versions("global_v9").await {
        Err(Error::UnknownGlobalVersion { label, available }) => {
            assert_eq!(label, "global_v9");
            assert_eq!(available, vec!["global_ONLINE", "global_v1"]);
        }
        other => panic!("expected UnknownGlobalVersion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_per_channel_gain_keys_are_pruned() {
    let pool = create_test_db().await;
    let mut mapping = global_mapping(&[("elife", "v3"), ("fdc_map_mlp", "v2")]);
    mapping["pmt_000_gain_xenonnt"] = json!("v7");
    mapping["n_veto_000_gain_xenonnt"] = json!("v8");
    mapping["mu_veto_000_gain_xenonnt"] = json!("v9");
    seed_global(&pool, &[("pmt", 3)], &[("global_v4", mapping)]).await;
    let (_, resolver) = resolver(&pool);

    let versions = resolver.local_versions("global_v4").await.unwrap();

    assert!(versions.keys().all(|k| !k.contains("_gain_xenonnt")));
    assert_eq!(versions["to_pe_model"], "v7");
    assert_eq!(versions["to_pe_model_nv"], "v8");
    assert_eq!(versions["to_pe_model_mv"], "v9");
    assert_eq!(versions["elife"], "v3");
    assert_eq!(versions["fdc_map_mlp"], "v2");
    assert_eq!(versions.len(), 5);
}

#[tokio::test]
async fn test_missing_global_table() {
    let pool = create_test_db().await;
    let (store, resolver) = resolver(&pool);

    let err = resolver.global_versions().await.unwrap_err();
    assert!(matches!(err, Error::CorrectionNotFound(_)), "got {:?}", err);
    assert_eq!(store.reads_of("global_xenonnt"), 1);
}
