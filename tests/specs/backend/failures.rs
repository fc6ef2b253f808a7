//! Backend failures and late grants

use crate::prelude::*;

fn unavailable() -> BackendError {
    BackendError::Unavailable("connection refused".to_string())
}

#[tokio::test(start_paused = true)]
async fn claim_failure_is_an_error_not_a_timeout() {
    let world = World::new();
    let lock = world.lock(config());
    world.backend.fail_next(BackendOp::TryClaim, unavailable());

    let result = lock.acquire().await;
    assert!(matches!(
        result,
        Err(LockError::Backend(BackendError::Unavailable(_)))
    ));
    assert_eq!(lock.phase(), Phase::Idle);

    // The instance stays usable
    assert_eq!(lock.acquire().await.unwrap(), AcquireOutcome::Acquired);
}

#[tokio::test(start_paused = true)]
async fn subscribe_failure_fails_the_acquire() {
    let world = World::new();
    let lock = world.lock(config());
    world.backend.fail_next(BackendOp::Subscribe, unavailable());

    assert!(matches!(lock.acquire().await, Err(LockError::Backend(_))));
    assert!(world.backend.calls_to(BackendOp::TryClaim).is_empty());
}

#[tokio::test(start_paused = true)]
async fn query_failures_propagate() {
    let world = World::new();
    let lock = world.lock(config());
    world.backend.fail_next(BackendOp::IsHeld, unavailable());
    world.backend.fail_next(BackendOp::IsClaimable, unavailable());

    assert!(matches!(lock.is_locked().await, Err(LockError::Backend(_))));
    assert!(matches!(lock.is_acquirable().await, Err(LockError::Backend(_))));
}

#[tokio::test(start_paused = true)]
async fn release_failure_keeps_the_hold() {
    let world = World::new();
    let lock = world.lock(config());
    lock.acquire().await.unwrap();
    world.backend.fail_next(BackendOp::Release, unavailable());

    assert!(matches!(lock.release().await, Err(LockError::Backend(_))));
    assert_eq!(lock.phase(), Phase::Held { attempt: 1 });
    assert!(lock.is_locked().await.unwrap());

    assert!(lock.release().await.unwrap());
    assert!(!lock.is_locked().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn expiration_failure_is_contained() {
    let world = World::new();
    let lock = world.lock(config().with_expires_after(ms(50)));
    lock.acquire().await.unwrap();
    world.backend.fail_next(BackendOp::Release, unavailable());

    sleep(ms(100)).await;
    assert_eq!(lock.phase(), Phase::Held { attempt: 1 });
    assert!(lock.is_locked().await.unwrap());

    assert!(lock.release().await.unwrap());
    assert!(!lock.is_locked().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn grant_arriving_after_timeout_is_revoked() {
    let world = World::new();
    let lock = world.lock(config().with_timeout(ms(100)));
    world.backend.set_grant_delay(Some(ms(500)));

    assert_eq!(lock.acquire().await.unwrap(), AcquireOutcome::TimedOut);
    assert!(world.backend.holders(KEY).is_empty());

    let Some(BackendCall::Release { holder, .. }) =
        world.backend.calls_to(BackendOp::Release).pop()
    else {
        panic!("late grant was not revoked");
    };
    let Some(BackendCall::TryClaim { holder: claimed, .. }) =
        world.backend.calls_to(BackendOp::TryClaim).pop()
    else {
        panic!("no claim recorded");
    };
    assert_eq!(holder, claimed);
}

#[tokio::test(start_paused = true)]
async fn dropped_acquire_revokes_its_claim() {
    let world = World::new();
    let lock = world.lock(config());
    world.backend.set_grant_delay(Some(ms(500)));

    let pending = lock.spawn_acquire();
    sleep(ms(10)).await;
    assert_eq!(world.backend.holders(KEY).len(), 1);

    pending.abort();
    assert!(pending.join().await.is_err());
    assert_eq!(lock.phase(), Phase::Idle);

    sleep(ms(1)).await;
    assert_eq!(world.spawner.count("lock.revoke"), 1);
    assert!(world.backend.holders(KEY).is_empty());
}
