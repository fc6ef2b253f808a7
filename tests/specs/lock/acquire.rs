//! Acquisition specs

use crate::prelude::*;
use lockedb_core::{MemoryBackend, TokioSpawner};

#[tokio::test(start_paused = true)]
async fn free_key_is_acquired_within_timeout() {
    let world = World::new();
    let lock = world.lock(config());

    let start = Instant::now();
    assert_eq!(lock.acquire().await.unwrap(), AcquireOutcome::Acquired);
    assert!(start.elapsed() < lock.timeout());
    assert!(lock.is_locked().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn empty_key_is_rejected_before_backend() {
    let world = World::new();
    let result = Lock::with_id_gen(
        LockConfig::new("   "),
        world.backend.clone(),
        world.spawner.clone(),
        SequentialIdGen::default(),
    );

    assert!(matches!(result, Err(LockError::Config(_))));
    assert!(world.backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn each_attempt_claims_with_a_fresh_token() {
    let world = World::new();
    let lock = world.lock(config());

    lock.acquire().await.unwrap();
    lock.release().await.unwrap();
    lock.acquire().await.unwrap();

    let claims: Vec<_> = world
        .backend
        .calls_to(BackendOp::TryClaim)
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::TryClaim { holder, .. } => Some(holder),
            _ => None,
        })
        .collect();
    assert_eq!(claims.len(), 2);
    assert_ne!(claims[0], claims[1]);
    assert!(claims.iter().all(|token| token.as_str() != lock.id()));
}

#[tokio::test(start_paused = true)]
async fn is_acquirable_reflects_current_holder() {
    let world = World::new();
    let holder = world.lock(config());
    let other = world.lock(config());

    assert!(other.is_acquirable().await.unwrap());
    holder.acquire().await.unwrap();
    assert!(!other.is_acquirable().await.unwrap());
    holder.release().await.unwrap();
    assert!(other.is_acquirable().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn acquire_while_held_is_rejected() {
    let world = World::new();
    let lock = world.lock(config());
    lock.acquire().await.unwrap();

    let again = lock.acquire().await;
    assert!(matches!(again, Err(LockError::AlreadyHeld { .. })));
    assert!(lock.phase().is_held());
}

#[tokio::test(start_paused = true)]
async fn config_loaded_from_toml_drives_the_lock() {
    let config = LockConfig::from_toml_str(
        r#"
        key = "inventory"
        password = "batch-7"
        expires_after = "50ms"
        timeout = "1s"
        "#,
    )
    .unwrap();
    let world = World::new();
    let lock = world.lock(config);

    assert_eq!(lock.password(), Some("batch-7"));
    assert_eq!(lock.acquire().await.unwrap(), AcquireOutcome::Acquired);
    sleep(ms(100)).await;
    assert!(!lock.is_locked().await.unwrap());
}

#[tokio::test]
async fn spawn_acquire_on_the_shared_pool() {
    let lock = Lock::new(config(), MemoryBackend::new(), TokioSpawner::shared().unwrap()).unwrap();

    let outcome = lock.spawn_acquire().join().await.unwrap().unwrap();
    assert!(outcome.is_acquired());
    assert!(lock.release().await.unwrap());
}
