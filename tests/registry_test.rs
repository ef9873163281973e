use std::sync::{Arc, Barrier};
use std::thread;

use medtrack::engine::{EngineConfig, EngineHandle, ExecutionContext};
use medtrack::entry::mock::MockEntryPoint;
use medtrack::error::{BootstrapError, RegistryError};
use medtrack::registry::EngineRegistry;

const ID: &str = "background_engine";

fn bound(name: &str) -> EngineHandle {
    ExecutionContext::new(EngineConfig::default())
        .bind(Arc::new(MockEntryPoint::new(name)))
        .unwrap()
}

#[test]
fn miss_is_not_failure() {
    let registry = EngineRegistry::new();
    assert!(registry.get("nonexistent").unwrap().is_none());
    assert!(!registry.contains("nonexistent").unwrap());
}

#[test]
fn empty_identifier_rejected_on_put_and_get() {
    let registry = EngineRegistry::new();
    assert!(matches!(
        registry.put("", Arc::new(bound("main"))),
        Err(RegistryError::InvalidIdentifier { .. })
    ));
    assert!(matches!(
        registry.get(""),
        Err(RegistryError::InvalidIdentifier { .. })
    ));
}

#[test]
fn put_remove_get() {
    let registry = EngineRegistry::new();
    registry.put("x", Arc::new(bound("main"))).unwrap();
    registry.remove("x").unwrap();
    assert!(registry.get("x").unwrap().is_none());
}

#[test]
fn retrieved_handle_outlives_removal() {
    let registry = EngineRegistry::new();
    registry.put("x", Arc::new(bound("main"))).unwrap();

    let held = registry.get("x").unwrap().unwrap();
    registry.remove("x").unwrap();

    assert_eq!(held.entry_point(), "main");
    assert!(!held.is_released());
}

#[test]
fn readers_never_observe_partial_handle() {
    const READERS: usize = 8;
    const READS: usize = 2_000;

    let registry = Arc::new(EngineRegistry::new());
    let barrier = Arc::new(Barrier::new(READERS + 1));
    let handle = Arc::new(bound("main"));
    let expected = handle.instance();

    thread::scope(|s| {
        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    let mut stored = false;
                    for _ in 0..READS {
                        match registry.get(ID).unwrap() {
                            Some(seen) => {
                                assert_eq!(seen.instance(), expected);
                                assert_eq!(seen.entry_point(), "main");
                                stored = true;
                            }
                            // Nothing removes the entry, so once seen it stays.
                            None => assert!(!stored, "stored engine disappeared"),
                        }
                    }
                })
            })
            .collect();

        barrier.wait();
        registry.put(ID, Arc::clone(&handle)).unwrap();

        for reader in readers {
            reader.join().unwrap();
        }
    });

    assert!(Arc::ptr_eq(&registry.get(ID).unwrap().unwrap(), &handle));
}

#[test]
fn concurrent_inserts_build_one_engine() {
    const THREADS: usize = 16;

    let registry = Arc::new(EngineRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let results: Vec<(u64, bool)> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    let (handle, created) = registry
                        .get_or_try_insert_with::<BootstrapError, _>(ID, || Ok(bound("main")))
                        .unwrap();
                    (handle.instance(), created)
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let created = results.iter().filter(|(_, created)| *created).count();
    assert_eq!(created, 1);
    let first = results[0].0;
    assert!(results.iter().all(|(instance, _)| *instance == first));
    assert_eq!(registry.len(), 1);
}

#[test]
fn concurrent_puts_on_distinct_ids() {
    let registry = Arc::new(EngineRegistry::new());

    thread::scope(|s| {
        for i in 0..10 {
            let registry = Arc::clone(&registry);
            s.spawn(move || {
                registry
                    .put(&format!("engine-{i}"), Arc::new(bound("main")))
                    .unwrap();
            });
        }
    });

    assert_eq!(registry.len(), 10);
}
