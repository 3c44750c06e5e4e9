// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-client fixed-window rate limiter
//!
//! Counters live in process memory, so limits are per instance. Expired
//! windows are purged when the table is full, and the table never holds more
//! than `capacity` clients: when purging frees nothing, the client whose
//! window started first is dropped.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request accepted, `remaining` more are allowed in this window.
    Allowed { remaining: u32 },
    /// Limit reached; the window reopens after `retry_after_secs`.
    Exceeded { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, capacity: usize) -> Self {
        Self {
            max_requests,
            window,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now())
    }

    /// Same as [`RateLimiter::check`] at an explicit instant.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        // A poisoned table only holds counters; keep using it
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(window) = entries.get_mut(key) {
            let elapsed = now.saturating_duration_since(window.started);
            if elapsed < self.window {
                if window.count >= self.max_requests {
                    let left = self.window - elapsed;
                    // Round up so clients never retry early
                    let retry_after_secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
                    return RateLimitResult::Exceeded { retry_after_secs };
                }
                window.count += 1;
                return RateLimitResult::Allowed {
                    remaining: self.max_requests - window.count,
                };
            }
            *window = Window {
                started: now,
                count: 1,
            };
            return RateLimitResult::Allowed {
                remaining: self.max_requests.saturating_sub(1),
            };
        }

        if entries.len() >= self.capacity {
            self.evict(&mut entries, now);
        }
        entries.insert(
            key.to_string(),
            Window {
                started: now,
                count: 1,
            },
        );
        RateLimitResult::Allowed {
            remaining: self.max_requests.saturating_sub(1),
        }
    }

    fn evict(&self, entries: &mut HashMap<String, Window>, now: Instant) {
        entries.retain(|_, window| now.saturating_duration_since(window.started) < self.window);
        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, window)| window.started)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
