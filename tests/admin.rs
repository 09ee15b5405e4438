//! Admin Integration Tests
//!
//! Tests for global type and source mapping administration, referential
//! integrity, and index coherence after every write.

use tempfile::TempDir;
use vodmap::error::MappingError;
use vodmap::{ConfigStore, GlobalType, MappingRegistry, SourceMapping, SourceType};

async fn registry_with_alpha(temp: &TempDir) -> MappingRegistry {
    let store = ConfigStore::new(temp.path().join("type_mapping.json"));
    let registry = MappingRegistry::open(store).await.unwrap();

    registry
        .create_source_mapping(
            "alpha",
            SourceMapping::new("Alpha")
                .with_type(SourceType::new(1, "电影").mapped_to("movie"))
                .with_type(SourceType::new(6, "动作片").mapped_to("movie"))
                .with_type(SourceType::new(2, "连续剧").mapped_to("tv"))
                .with_type(SourceType::new(9, "其他")),
        )
        .await
        .unwrap();

    registry
}

#[tokio::test]
async fn test_forward_and_reverse_views_agree() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;
    let index = registry.index();

    let doc = registry.snapshot().await;
    for (code, mapping) in &doc.source_mappings {
        for source_type in mapping.type_list.iter().filter(|t| t.is_mapped()) {
            let forward = index.lookup_global_type(code, source_type.id).await;
            assert_eq!(forward.as_deref(), Some(source_type.global_type.as_str()));

            let reverse = index
                .lookup_source_type_ids(code, &source_type.global_type)
                .await
                .unwrap();
            assert!(reverse.contains(&source_type.id));
        }
    }

    assert_eq!(index.lookup_source_type_ids("alpha", "movie").await, Some(vec![1, 6]));
    assert_eq!(
        index.lookup_source_types("alpha", "movie").await,
        Some(vec![(1, "电影".to_string()), (6, "动作片".to_string())])
    );
    assert_eq!(index.lookup_source_type_ids("alpha", "anime").await, None);
    assert_eq!(index.lookup_name("alpha", 9).await, Some("其他".to_string()));
    assert_eq!(index.lookup_global_type("alpha", 9).await, None);
    assert_eq!(index.lookup_global_type("nobody", 1).await, None);
}

#[tokio::test]
async fn test_index_follows_update_and_delete() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;
    let index = registry.index();

    registry.assign_source_type("alpha", 6, "tv").await.unwrap();
    assert_eq!(index.lookup_source_type_ids("alpha", "movie").await, Some(vec![1]));
    assert_eq!(index.lookup_source_type_ids("alpha", "tv").await, Some(vec![6, 2]));

    registry
        .update_source_mapping(
            "alpha",
            SourceMapping::new("Alpha").with_type(SourceType::new(3, "综艺").mapped_to("variety")),
        )
        .await
        .unwrap();
    assert_eq!(index.lookup_global_type("alpha", 1).await, None);
    assert_eq!(index.lookup_global_type("alpha", 3).await, Some("variety".to_string()));

    registry.delete_source_mapping("alpha").await.unwrap();
    assert_eq!(index.lookup_global_type("alpha", 3).await, None);
    assert_eq!(index.lookup_name("alpha", 3).await, None);
    assert_eq!(registry.stats().await.total_sources, 0);
}

#[tokio::test]
async fn test_delete_referenced_global_type_is_rejected() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;
    let before = registry.snapshot().await;

    let err = registry.delete_global_type("movie").await.unwrap_err();
    match &err {
        MappingError::GlobalTypeInUse { id, sources } => {
            assert_eq!(id, "movie");
            assert_eq!(sources, &vec!["alpha".to_string()]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_referential_integrity());

    assert_eq!(*registry.snapshot().await, *before);
    assert_eq!(
        registry.index().lookup_global_type("alpha", 1).await,
        Some("movie".to_string())
    );

    // The file on disk is unchanged as well
    let on_disk = registry.store().load().await.unwrap();
    assert!(on_disk.global_types.contains_key("movie"));
}

#[tokio::test]
async fn test_delete_unreferenced_global_type() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;

    let removed = registry.delete_global_type("adult").await.unwrap();
    assert_eq!(removed.id, "adult");
    assert!(registry.global_type("adult").await.unwrap_err().is_not_found());

    let on_disk = registry.store().load().await.unwrap();
    assert!(!on_disk.global_types.contains_key("adult"));
}

#[tokio::test]
async fn test_mapping_to_unknown_global_type_is_rejected() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;

    let err = registry
        .create_source_mapping(
            "beta",
            SourceMapping::new("Beta").with_type(SourceType::new(1, "Films").mapped_to("cinema")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MappingError::UnknownGlobalType { .. }));
    assert!(registry.source_mapping("beta").await.is_err());

    let err = registry.assign_source_type("alpha", 9, "cinema").await.unwrap_err();
    assert!(err.is_referential_integrity());
    assert_eq!(registry.index().lookup_global_type("alpha", 9).await, None);
}

#[tokio::test]
async fn test_global_types_listed_by_priority() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;

    registry
        .create_global_type(GlobalType::new("short", "短片").with_priority(0))
        .await
        .unwrap();

    let ids: Vec<_> = registry.global_types().await.into_iter().map(|g| g.id).collect();
    assert_eq!(ids.first().map(String::as_str), Some("short"));
    assert_eq!(ids.last().map(String::as_str), Some("adult"));
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn test_reopen_reads_committed_state() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;
    registry.assign_source_type("alpha", 9, "variety").await.unwrap();

    let reopened = MappingRegistry::open(ConfigStore::new(temp.path().join("type_mapping.json")))
        .await
        .unwrap();
    assert_eq!(*reopened.snapshot().await, *registry.snapshot().await);
    assert_eq!(
        reopened.index().lookup_global_type("alpha", 9).await,
        Some("variety".to_string())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_admit_exactly_one() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_alpha(&temp).await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .create_global_type(GlobalType::new("music", format!("音乐 {}", i)))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(MappingError::AlreadyExists { kind, key }) => {
                assert_eq!(kind, "Global type");
                assert_eq!(key, "music");
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(rejected, 15);
    assert_eq!(registry.global_types().await.len(), 8);

    let on_disk = registry.store().load().await.unwrap();
    assert_eq!(on_disk.global_types["music"], registry.global_type("music").await.unwrap());
}
