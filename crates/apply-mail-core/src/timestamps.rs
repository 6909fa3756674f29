//! Timestamp utilities with clock skew detection.
//!
//! Stored timestamps are `i64` microseconds since the Unix epoch. This module
//! provides conversion to chrono types, monotonic protection against
//! wall-clock jumps (NTP corrections, VM migration, etc.), and the strictly
//! increasing creation clock used by the message repository.
//!
//! # Clock Skew Protection
//!
//! [`now_micros`] tracks the last observed wall-clock value. On a backward
//! jump (>1 s), it returns `max(current, last_seen)` so stored timestamps
//! never regress.
//!
//! # Creation Clock
//!
//! [`next_created_micros`] returns `max(now, last + 1)`: two appends in the
//! same process can never receive the same `created_at`, which gives the
//! repository its total per-application order without tie-breaking at read
//! time.

#![allow(clippy::missing_const_for_fn)]

use chrono::{NaiveDateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Microseconds per second
const MICROS_PER_SECOND: i64 = 1_000_000;

/// Backward jump threshold: 1 second in microseconds.
const BACKWARD_JUMP_THRESHOLD_US: i64 = 1_000_000;

/// Last observed wall-clock value (microseconds since epoch).
static LAST_SYSTEM_TIME_US: AtomicI64 = AtomicI64::new(0);

/// Last value handed out by [`next_created_micros`].
static LAST_CREATED_US: AtomicI64 = AtomicI64::new(0);

/// Convert microseconds since Unix epoch to chrono `NaiveDateTime`.
///
/// For extreme values outside chrono's representable range, saturates to
/// chrono's MIN/MAX instead of panicking.
#[inline]
#[must_use]
pub fn micros_to_naive(micros: i64) -> NaiveDateTime {
    let secs = micros.div_euclid(MICROS_PER_SECOND);
    let sub_micros = micros.rem_euclid(MICROS_PER_SECOND);
    let nsecs = u32::try_from(sub_micros * 1000).unwrap_or(0);
    Utc.timestamp_opt(secs, nsecs)
        .single()
        .unwrap_or(if micros < 0 {
            chrono::DateTime::<Utc>::MIN_UTC
        } else {
            chrono::DateTime::<Utc>::MAX_UTC
        })
        .naive_utc()
}

/// Get current time as microseconds since Unix epoch, with clock skew
/// protection.
///
/// If the wall clock jumped backward by more than 1 second, returns the
/// last observed value (monotonic guarantee for stored timestamps).
#[inline]
#[must_use]
pub fn now_micros() -> i64 {
    let current = Utc::now().timestamp_micros();
    let last = LAST_SYSTEM_TIME_US.load(Ordering::Relaxed);

    if last != 0 && current - last < -BACKWARD_JUMP_THRESHOLD_US {
        tracing::warn!(
            current_us = current,
            last_us = last,
            "system clock jumped backward; holding high-water mark"
        );
        return last;
    }

    LAST_SYSTEM_TIME_US.store(current.max(last), Ordering::Relaxed);
    current.max(last)
}

/// Strictly increasing creation timestamp.
///
/// Returns `max(now_micros(), last_returned + 1)`. Successive calls never
/// return equal values, so `created_at` defines a total order over messages
/// appended by this process even when the wall clock stalls.
#[inline]
#[must_use]
pub fn next_created_micros() -> i64 {
    let now = now_micros();
    let mut prev = LAST_CREATED_US.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST_CREATED_US.compare_exchange_weak(
            prev,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(observed) => prev = observed,
        }
    }
}
