//! Release specs

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn release_without_acquire_is_a_noop() {
    let world = World::new();
    let lock = world.lock(config());

    assert!(lock.release().await.unwrap());
    assert_eq!(world.releases(), 0);
}

#[tokio::test(start_paused = true)]
async fn is_locked_follows_acquire_and_release() {
    let world = World::new();
    let lock = world.lock(config());

    lock.acquire().await.unwrap();
    assert!(lock.is_locked().await.unwrap());
    assert!(lock.release().await.unwrap());
    assert!(!lock.is_locked().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn second_release_is_an_already_free_noop() {
    let world = World::new();
    let lock = world.lock(config());
    lock.acquire().await.unwrap();

    assert!(lock.release().await.unwrap());
    assert!(lock.release().await.unwrap());
    assert_eq!(world.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn release_after_timeout_leaves_holder_alone() {
    let world = World::new();
    let holder = world.lock(config());
    let loser = world.lock(config());
    holder.acquire().await.unwrap();
    assert_eq!(loser.acquire().await.unwrap(), AcquireOutcome::TimedOut);

    assert!(loser.release().await.unwrap());
    assert!(holder.is_locked().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn concurrent_releases_collapse_into_one() {
    let world = World::new();
    let lock = world.lock(config());
    lock.acquire().await.unwrap();

    let (first, second) = tokio::join!(lock.release(), lock.release());
    assert!(first.unwrap());
    assert!(second.unwrap());
    assert_eq!(world.releases(), 1);
    assert_eq!(lock.phase(), Phase::Released { attempt: 1 });
}

#[tokio::test(start_paused = true)]
async fn release_denied_after_takeover_reports_false() {
    let world = World::new();
    let original = world.lock(config());
    let successor = world.lock(config());
    original.acquire().await.unwrap();

    world.backend.force_release(KEY);
    successor.acquire().await.unwrap();

    assert!(!original.release().await.unwrap());
    assert_eq!(original.phase(), Phase::Idle);
    assert!(successor.is_locked().await.unwrap());
}
