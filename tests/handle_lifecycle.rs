//! E2E: handle lifecycle. Explicit init/destroy cycles, lazy binding on
//! first lock, the unlock error contract, and cross-thread visibility of a
//! held lock.
//!
//! Run with: `cargo test --test handle_lifecycle`

mod common;

use bindlock::{
    AttrError, Mutex, MutexAttr, MutexKind, ProcessShared, Protocol, TryLockError, UnlockError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn init_test(name: &str) {
    common::init_test_logging();
    test_phase!(name);
}

// Touched by exactly one test; the unbound precondition would not survive
// sharing it.
static LAZY_HANDLE: Mutex = Mutex::new();

#[test]
fn static_handle_binds_on_first_lock() {
    init_test("static_handle_binds_on_first_lock");

    let before = LAZY_HANDLE.is_bound();
    assert_with_log!(!before, "static handle starts unbound", false, before);

    LAZY_HANDLE.lock().expect("first lock should bind and acquire");
    let after = LAZY_HANDLE.is_bound();
    assert_with_log!(after, "static handle bound after first lock", true, after);
    LAZY_HANDLE.unlock().expect("unlock should succeed");

    let metrics = LAZY_HANDLE.metrics();
    assert_with_log!(
        metrics.records_created == 1,
        "single record for an uncontended bind",
        1,
        metrics.records_created
    );

    test_complete!("static_handle_binds_on_first_lock");
}

#[test]
fn held_lock_excludes_other_threads() {
    init_test("held_lock_excludes_other_threads");

    let m = Mutex::new();
    m.lock().expect("lock should succeed");

    thread::scope(|s| {
        s.spawn(|| {
            let busy = m.try_lock();
            assert_with_log!(
                busy == Err(TryLockError::WouldBlock),
                "other thread sees the lock as held",
                Err::<(), TryLockError>(TryLockError::WouldBlock),
                busy
            );
        })
        .join()
        .expect("prober panicked");

        m.unlock().expect("unlock should succeed");

        s.spawn(|| {
            m.try_lock().expect("lock free after unlock");
            m.unlock().expect("unlock from acquiring thread");
        })
        .join()
        .expect("second locker panicked");
    });

    test_complete!("held_lock_excludes_other_threads");
}

#[test]
fn blocked_locker_proceeds_after_unlock() {
    init_test("blocked_locker_proceeds_after_unlock");

    let m = Mutex::new();
    let entered = AtomicBool::new(false);
    m.lock().expect("lock should succeed");

    thread::scope(|s| {
        let waiter = s.spawn(|| {
            m.lock().expect("blocking lock should succeed");
            entered.store(true, Ordering::Release);
            m.unlock().expect("unlock should succeed");
        });

        // Give the waiter time to reach the blocking acquire.
        thread::sleep(Duration::from_millis(50));
        let during = entered.load(Ordering::Acquire);
        assert_with_log!(!during, "waiter stays out while the lock is held", false, during);

        m.unlock().expect("unlock should succeed");
        waiter.join().expect("waiter panicked");
    });

    let after = entered.load(Ordering::Acquire);
    assert_with_log!(after, "waiter entered after release", true, after);

    test_complete!("blocked_locker_proceeds_after_unlock");
}

#[test]
fn init_destroy_reinit_round_trip() {
    init_test("init_destroy_reinit_round_trip");

    let mut m = Mutex::new();
    m.init(None).expect("first init should succeed");
    m.lock().expect("lock should succeed");
    m.unlock().expect("unlock should succeed");
    m.destroy();

    let unbound = m.unlock();
    assert_with_log!(
        unbound == Err(UnlockError::Unbound),
        "unlock fails once destroyed",
        Err::<(), UnlockError>(UnlockError::Unbound),
        unbound
    );

    m.init(None).expect("reinit should succeed");
    m.lock().expect("lock after reinit should succeed");
    m.unlock().expect("unlock after reinit should succeed");
    m.destroy();

    let metrics = m.metrics();
    assert_with_log!(
        metrics.records_created == 2,
        "one record per cycle",
        2,
        metrics.records_created
    );
    assert_with_log!(
        metrics.records_destroyed == 2,
        "each cycle released its record",
        2,
        metrics.records_destroyed
    );
    assert_with_log!(metrics.outstanding() == 0, "nothing outstanding", 0, metrics.outstanding());

    test_complete!("init_destroy_reinit_round_trip");
}

#[test]
fn destroy_is_a_noop_on_unbound_handles() {
    init_test("destroy_is_a_noop_on_unbound_handles");

    let mut m = Mutex::new();
    m.destroy();
    m.destroy();
    let fresh = m.metrics().records_destroyed;
    assert_with_log!(fresh == 0, "nothing to release on a fresh handle", 0, fresh);

    m.init(None).expect("init should succeed");
    m.destroy();
    m.destroy();
    let after = m.metrics().records_destroyed;
    assert_with_log!(after == 1, "second destroy released nothing", 1, after);

    test_complete!("destroy_is_a_noop_on_unbound_handles");
}

#[test]
fn attr_configured_handle_locks_normally() {
    init_test("attr_configured_handle_locks_normally");

    let mut attr = MutexAttr::new();
    attr.set_kind(MutexKind::Recursive);
    attr.set_protocol(Protocol::Inherit);
    attr.set_priority_ceiling(5);
    attr.set_process_shared(ProcessShared::Private)
        .expect("private visibility is accepted");

    let rejected = attr.set_process_shared(ProcessShared::Shared);
    assert_with_log!(
        rejected == Err(AttrError::SharedUnsupported),
        "shared visibility is refused",
        Err::<(), AttrError>(AttrError::SharedUnsupported),
        rejected
    );

    // The rejected setter left the record usable.
    let mut m = Mutex::new();
    m.init(Some(&attr)).expect("init with attributes should succeed");
    m.lock().expect("lock should succeed");
    m.unlock().expect("unlock should succeed");
    m.destroy();

    test_complete!("attr_configured_handle_locks_normally");
}

#[test]
fn scoped_guard_excludes_until_dropped() {
    init_test("scoped_guard_excludes_until_dropped");

    let m = Mutex::new();
    let guard = m.lock_scoped().expect("lock_scoped should succeed");

    thread::scope(|s| {
        s.spawn(|| {
            let busy = m.try_lock();
            assert_with_log!(
                busy == Err(TryLockError::WouldBlock),
                "guard holds the lock",
                Err::<(), TryLockError>(TryLockError::WouldBlock),
                busy
            );
        })
        .join()
        .expect("prober panicked");

        drop(guard);

        s.spawn(|| {
            m.try_lock().expect("lock free after guard drop");
            m.unlock().expect("unlock should succeed");
        })
        .join()
        .expect("second locker panicked");
    });

    test_complete!("scoped_guard_excludes_until_dropped");
}
