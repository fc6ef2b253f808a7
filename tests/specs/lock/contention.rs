//! Contention between lock instances on the same key

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn matching_password_shares_the_key() {
    let world = World::new();
    let first = world.lock(config().with_password("batch-7"));
    let second = world.lock(config().with_password("batch-7"));

    assert_eq!(first.acquire().await.unwrap(), AcquireOutcome::Acquired);
    assert_eq!(second.acquire().await.unwrap(), AcquireOutcome::Acquired);
    assert_eq!(world.backend.holders(KEY).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn mismatched_or_missing_password_times_out() {
    for password in [Some("other"), None] {
        let world = World::new();
        let holder = world.lock(config().with_password("batch-7"));
        let contender = match password {
            Some(p) => world.lock(config().with_password(p)),
            None => world.lock(config()),
        };
        holder.acquire().await.unwrap();

        let start = Instant::now();
        assert_eq!(
            contender.acquire().await.unwrap(),
            AcquireOutcome::TimedOut
        );
        assert!(start.elapsed() >= contender.timeout());
        assert!(holder.is_locked().await.unwrap());
    }
}

#[tokio::test(start_paused = true)]
async fn waiter_sees_third_party_release_as_released_elsewhere() {
    let world = World::new();
    let holder = world.lock(config());
    let waiter = world.lock(config());
    holder.acquire().await.unwrap();

    let pending = waiter.spawn_acquire();
    sleep(ms(250)).await;
    holder.release().await.unwrap();

    let outcome = pending.join().await.unwrap().unwrap();
    assert_eq!(outcome, AcquireOutcome::ReleasedElsewhere);
    assert_ne!(outcome, AcquireOutcome::TimedOut);
    assert_eq!(waiter.phase(), Phase::Preempted { attempt: 1 });
}

#[tokio::test(start_paused = true)]
async fn administrative_release_preempts_waiter() {
    let world = World::new();
    let holder = world.lock(config());
    let waiter = world.lock(config());
    holder.acquire().await.unwrap();

    let pending = waiter.spawn_acquire();
    sleep(ms(10)).await;
    assert!(world.backend.force_release(KEY));

    assert_eq!(
        pending.join().await.unwrap().unwrap(),
        AcquireOutcome::ReleasedElsewhere
    );
}

#[tokio::test(start_paused = true)]
async fn every_waiter_is_preempted_by_one_release() {
    let world = World::new();
    let holder = world.lock(config());
    holder.acquire().await.unwrap();

    let waiters: Vec<_> = (0..5).map(|_| world.lock(config())).collect();
    let pending: Vec<_> = waiters.iter().map(|w| w.spawn_acquire()).collect();
    sleep(ms(10)).await;
    holder.release().await.unwrap();

    for handle in pending {
        assert_eq!(
            handle.join().await.unwrap().unwrap(),
            AcquireOutcome::ReleasedElsewhere
        );
    }
    assert!(!holder.is_locked().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn second_acquire_on_same_instance_is_rejected_while_pending() {
    let world = World::new();
    let holder = world.lock(config());
    let waiter = world.lock(config());
    holder.acquire().await.unwrap();

    let pending = waiter.spawn_acquire();
    sleep(ms(10)).await;

    let rejected = waiter.acquire().await;
    assert!(matches!(rejected, Err(LockError::AcquireInProgress { .. })));
    assert_eq!(
        pending.join().await.unwrap().unwrap(),
        AcquireOutcome::TimedOut
    );
    assert_eq!(world.spawner.count("lock.acquire"), 1);
}

#[tokio::test(start_paused = true)]
async fn new_attempt_after_timeout_can_win() {
    let world = World::new();
    let holder = world.lock(config());
    let waiter = world.lock(config());
    holder.acquire().await.unwrap();
    assert_eq!(waiter.acquire().await.unwrap(), AcquireOutcome::TimedOut);

    holder.release().await.unwrap();
    assert_eq!(waiter.acquire().await.unwrap(), AcquireOutcome::Acquired);
    assert_eq!(waiter.phase(), Phase::Held { attempt: 2 });
}
