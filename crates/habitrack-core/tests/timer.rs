#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::panic;

use habitrack_core::metrics::{LatencyObserver, Registry};
use habitrack_core::{HabitError, Result};

fn observer(reg: &Registry) -> LatencyObserver {
    let h = reg
        .histogram("db_query_latency_seconds", "DB latency", &["operation"])
        .unwrap();
    LatencyObserver::new(h, "operation")
}

fn insert_duplicate() -> Result<u32> {
    Err(HabitError::Conflict("email taken".into()))
}

fn failing_write(obs: &LatencyObserver) -> Result<u32> {
    let _scope = obs.observe("write");
    let id = insert_duplicate()?;
    Ok(id)
}

#[test]
fn success_records_exactly_once() {
    let reg = Registry::new();
    let obs = observer(&reg);

    let v = obs.time("read", || 7);
    assert_eq!(v, 7);

    let (count, sum) = obs.histogram().get(&[("operation", "read")]).unwrap();
    assert_eq!(count, 1);
    assert!(sum >= 0.0);
    assert!(obs.histogram().get(&[("operation", "write")]).is_none());
}

#[test]
fn error_path_still_records_and_propagates() {
    let reg = Registry::new();
    let obs = observer(&reg);

    let err = failing_write(&obs).expect_err("must fail");
    assert!(matches!(err, HabitError::Conflict(_)));

    let (count, sum) = obs.histogram().get(&[("operation", "write")]).unwrap();
    assert_eq!(count, 1);
    assert!(sum >= 0.0);
}

#[test]
fn panic_unwinding_still_records() {
    let reg = Registry::new();
    let obs = observer(&reg);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let _scope = obs.observe("read");
        panic!("boom");
    }));
    assert!(res.is_err());
    assert_eq!(obs.histogram().get(&[("operation", "read")]).unwrap().0, 1);
}

#[test]
fn explicit_stop_does_not_double_count() {
    let reg = Registry::new();
    let obs = observer(&reg);

    let scope = obs.observe("read");
    let secs = scope.stop();
    assert!(secs >= 0.0);
    assert_eq!(obs.histogram().get(&[("operation", "read")]).unwrap().0, 1);
}
