// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Requeue delay jitter.
//!
//! Reconciles for many objects tend to fail together when Pi-hole goes away.
//! Spreading their requeue delays by a random factor keeps them from all
//! hitting Pi-hole again in the same instant when it comes back.

use crate::constants::REQUEUE_JITTER_FACTOR;
use rand::Rng;
use std::time::Duration;

/// Randomize `delay` by ±[`REQUEUE_JITTER_FACTOR`].
///
/// A zero delay stays zero.
#[must_use]
pub fn jittered(delay: Duration) -> Duration {
    apply_jitter(delay, REQUEUE_JITTER_FACTOR)
}

fn apply_jitter(interval: Duration, randomization_factor: f64) -> Duration {
    if randomization_factor == 0.0 || interval.is_zero() {
        return interval;
    }

    let secs = interval.as_secs_f64();
    let delta = secs * randomization_factor;
    let min = secs - delta;
    let max = secs + delta;

    let mut rng = rand::thread_rng();
    let jittered = rng.gen_range(min..=max);

    Duration::from_secs_f64(jittered.max(0.0))
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
