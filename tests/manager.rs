mod common;

#[cfg(test)]
mod tests {
    use super::*;

    use common::*;
    use sesman::store::{BackendRegistry, FileStore, StoreBackend};
    use sesman::{Error, Id, MAX_ID_ATTEMPTS, SessionConfig, SessionManager, SessionRecord};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_store_find_remove_scenario() {
        let (manager, _) = memory_manager(SessionConfig::build().lifetime(3600));

        let mut record = SessionRecord::new("abc");
        record.payload_mut().insert("x", &1_i32).unwrap();
        assert!(manager.store(&record).await);

        let found = manager.find(&Id::from("abc")).await.unwrap();
        assert_eq!(found.payload().get::<i32>("x").unwrap(), Some(1));
        assert_eq!(found.created_at(), record.created_at());

        assert!(manager.remove(&Id::from("abc")).await);
        assert!(manager.find(&Id::from("abc")).await.is_none());
        assert!(!manager.remove(&Id::from("abc")).await);
    }

    #[tokio::test]
    async fn test_store_updates_existing_session() {
        let (manager, store) = memory_manager(SessionConfig::build());

        let mut record = SessionRecord::new("abc");
        record.payload_mut().insert("user", &create_test_user()).unwrap();
        assert!(manager.store(&record).await);

        let mut renamed = create_test_user();
        renamed.name = "Updated User".to_string();
        record.payload_mut().insert("user", &renamed).unwrap();
        assert!(manager.store(&record).await);

        let found = manager.find(record.id()).await.unwrap();
        assert_eq!(found.payload().get::<TestUser>("user").unwrap(), Some(renamed));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_hidden_but_kept() {
        let (manager, store) = memory_manager(SessionConfig::build().lifetime(60));

        let record = record_aged("old", 120);
        assert!(manager.store(&record).await);

        assert!(manager.find(record.id()).await.is_none());
        assert!(store.contains(record.id()));

        let fresh = record_aged("fresh", 30);
        assert!(manager.store(&fresh).await);
        assert!(manager.find(fresh.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_lifetime_never_expires() {
        let (manager, _) = memory_manager(SessionConfig::build().lifetime(0));

        let ten_years = 10 * 365 * 24 * 60 * 60;
        let record = record_aged("ancient", ten_years);
        assert!(manager.store(&record).await);
        assert!(manager.find(record.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_empty_ids_never_reach_the_backend() {
        let (manager, calls) = counting_manager(SessionConfig::build());

        assert!(manager.find(&Id::default()).await.is_none());
        assert!(!manager.remove(&Id::from("")).await);
        assert!(!manager.store(&SessionRecord::new("")).await);

        assert_eq!(calls.created.load(Ordering::SeqCst), 0);
        assert_eq!(calls.total_operations(), 0);
    }

    #[tokio::test]
    async fn test_each_operation_gets_its_own_backend() {
        let (manager, calls) = counting_manager(SessionConfig::build().gc_probability(1));

        manager.find(&Id::from("a")).await;
        manager.store(&SessionRecord::new("a")).await;
        manager.remove(&Id::from("a")).await;
        manager.collect_garbage().await;

        assert_eq!(calls.created.load(Ordering::SeqCst), 4);
        assert_eq!(calls.total_operations(), 4);
    }

    #[tokio::test]
    async fn test_unknown_store_type_fails_softly() {
        let manager = SessionManager::new(
            SessionConfig::build().store_type("mongodb").gc_probability(1),
            BackendRegistry::new(),
        );

        assert!(manager.find(&Id::from("abc")).await.is_none());
        assert!(!manager.store(&SessionRecord::new("abc")).await);
        assert!(!manager.remove(&Id::from("abc")).await);
        assert!(manager.purge().await.is_none());
        manager.collect_garbage().await;
    }

    #[tokio::test]
    async fn test_backend_errors_fail_softly() {
        let registry = BackendRegistry::new();
        registry.register("broken", || FailingStore);
        let manager = SessionManager::new(
            SessionConfig::build().store_type("broken").gc_probability(1),
            registry,
        );

        assert!(manager.find(&Id::from("abc")).await.is_none());
        assert!(!manager.store(&SessionRecord::new("abc")).await);
        assert!(!manager.remove(&Id::from("abc")).await);
        assert!(manager.purge().await.is_none());
        manager.collect_garbage().await;

        // A failing lookup reads as "no collision".
        assert!(manager.generate_id().await.is_ok());
    }

    #[tokio::test]
    async fn test_generate_id_is_unique_and_unused() {
        let (manager, _) = memory_manager(SessionConfig::build());

        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = manager.generate_id().await.unwrap();
            assert_eq!(id.as_str().len(), 64);
            assert!(manager.find(&id).await.is_none());
            assert!(manager.store(&SessionRecord::new(id.clone())).await);
            assert!(ids.insert(id));
        }
    }

    #[tokio::test]
    async fn test_generate_id_retries_past_live_sessions() {
        let (manager, calls) = counting_manager(SessionConfig::build());
        calls.live_finds.store(MAX_ID_ATTEMPTS - 1, Ordering::SeqCst);

        let id = manager.generate_id().await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(calls.finds.load(Ordering::SeqCst), MAX_ID_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_generate_id_fails_fatally_after_three_collisions() {
        let (manager, calls) = counting_manager(SessionConfig::build());
        calls.live_finds.store(usize::MAX, Ordering::SeqCst);

        let err = manager.generate_id().await.unwrap_err();
        assert!(matches!(err, Error::IdExhausted { attempts: 3 }));
        assert!(err.is_fatal());
        assert_eq!(calls.finds.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gc_disabled() {
        for probability in [0, -1, -1000] {
            let (manager, calls) = counting_manager(SessionConfig::build().gc_probability(probability));
            for _ in 0..1000 {
                manager.collect_garbage().await;
            }
            assert_eq!(calls.purges.load(Ordering::SeqCst), 0);
            assert_eq!(calls.created.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_gc_always_runs_with_probability_one() {
        let (manager, calls) = counting_manager(SessionConfig::build().gc_probability(1));
        for _ in 0..50 {
            manager.collect_garbage().await;
        }
        assert_eq!(calls.purges.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_gc_rate_converges() {
        let probability = 10;
        let rounds = 20_000;
        let (manager, calls) = counting_manager(SessionConfig::build().gc_probability(probability));

        for _ in 0..rounds {
            manager.collect_garbage().await;
        }

        // Expected 2000 purges with a standard deviation of about 42.
        let purges = calls.purges.load(Ordering::SeqCst) as f64;
        let expected = rounds as f64 / probability as f64;
        assert!(
            (purges - expected).abs() < expected * 0.15,
            "purged {purges} times, expected about {expected}"
        );
    }

    #[tokio::test]
    async fn test_purge_removes_only_stale_sessions() {
        let (manager, store) =
            memory_manager(SessionConfig::build().gc_probability(1).gc_max_lifetime(600));

        manager.store(&record_aged("fresh", 60)).await;
        manager.store(&record_aged("stale", 1200)).await;

        manager.collect_garbage().await;

        assert!(store.contains(&Id::from("fresh")));
        assert!(!store.contains(&Id::from("stale")));
        assert_eq!(manager.purge().await, Some(0));
    }

    #[tokio::test]
    async fn test_huge_windows_do_not_overflow() {
        let (manager, store) = memory_manager(
            SessionConfig::build()
                .lifetime(1_000_000_000_000)
                .gc_probability(1)
                .gc_max_lifetime(i64::MAX),
        );

        let id = manager.generate_id().await.unwrap();
        let old = record_aged(id.as_str(), 86_400 * 365 * 30);
        assert!(manager.store(&old).await);
        assert!(manager.find(&id).await.is_some());

        assert_eq!(manager.purge().await, Some(0));
        manager.collect_garbage().await;
        assert!(store.contains(&id));
    }

    #[tokio::test]
    async fn test_negative_gc_max_lifetime_never_purges() {
        let (manager, calls) =
            counting_manager(SessionConfig::build().gc_probability(1).gc_max_lifetime(-10));

        assert_eq!(manager.purge().await, None);
        manager.collect_garbage().await;

        assert_eq!(calls.purges.load(Ordering::SeqCst), 0);
        assert_eq!(calls.created.load(Ordering::SeqCst), 0);

        let (manager, store) =
            memory_manager(SessionConfig::build().gc_probability(1).gc_max_lifetime(-10));
        manager.store(&record_aged("fresh", 1)).await;
        manager.collect_garbage().await;
        assert!(store.contains(&Id::from("fresh")));
    }

    #[tokio::test]
    async fn test_file_store_through_manager() {
        let dir = tempfile::tempdir().unwrap();
        let registry = BackendRegistry::new();
        registry.register_file(FileStore::new(dir.path()));
        let manager = SessionManager::new(
            SessionConfig::build()
                .store_type("File")
                .lifetime(60)
                .gc_probability(1)
                .gc_max_lifetime(300),
            registry,
        );

        let id = manager.generate_id().await.unwrap();
        let mut record = SessionRecord::new(id.clone());
        record.payload_mut().insert("user", &create_test_user()).unwrap();
        assert!(manager.store(&record).await);

        let found = manager.find(&id).await.unwrap();
        assert_eq!(found.payload().get::<TestUser>("user").unwrap(), Some(create_test_user()));

        let expired = record_aged("expired", 120);
        let stale = record_aged("stale", 600);
        assert!(manager.store(&expired).await);
        assert!(manager.store(&stale).await);
        assert!(manager.find(expired.id()).await.is_none());

        manager.collect_garbage().await;

        let store = FileStore::new(dir.path());
        let epoch = sesman::time::OffsetDateTime::UNIX_EPOCH;
        assert!(store.find(expired.id(), epoch).await.unwrap().is_some());
        assert!(store.find(stale.id(), epoch).await.unwrap().is_none());
        assert!(manager.find(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_generation_and_storage() {
        let (manager, store) = memory_manager(SessionConfig::build().gc_probability(5));
        let manager = Arc::new(manager);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..25 {
                    let id = manager.generate_id().await.unwrap();
                    assert!(manager.store(&SessionRecord::new(id.clone())).await);
                    manager.collect_garbage().await;
                    ids.push(id);
                }
                ids
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 32 * 25);
        assert_eq!(store.len(), 32 * 25);
    }
}
