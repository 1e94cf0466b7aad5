//! Deferred retry queue
//!
//! A few regions wait for host elements that render late. Instead of
//! free-running timers, waits are entries in a queue driven by a virtual
//! clock. Every entry carries a child of the queue's cancellation token and
//! every key has an attempt cap, so a wait cannot outlive a halt or a
//! refresh and cannot retry forever.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::constants::retry;
use crate::error::EngineError;

#[derive(Debug)]
struct Scheduled {
    key: String,
    due_ms: u64,
    token: CancellationToken,
}

#[derive(Debug)]
pub struct TaskQueue {
    now_ms: u64,
    delay_ms: u64,
    max_attempts: u32,
    /// Parent of every entry token; replaced after `cancel_all`
    root: CancellationToken,
    pending: Vec<Scheduled>,
    attempts: HashMap<String, u32>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(retry::DELAY_MS, retry::MAX_ATTEMPTS)
    }
}

impl TaskQueue {
    pub fn new(delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            now_ms: 0,
            delay_ms,
            max_attempts,
            root: CancellationToken::new(),
            pending: Vec::new(),
            attempts: HashMap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Schedule another attempt for `key` after the fixed delay.
    /// A key already waiting keeps its slot.
    pub fn schedule_retry(&mut self, key: &str) -> Result<(), EngineError> {
        if self.live(key).is_some() {
            return Ok(());
        }

        let attempts = self.attempts.entry(key.to_string()).or_insert(0);
        if *attempts >= self.max_attempts {
            let attempts = *attempts;
            self.attempts.remove(key);
            return Err(EngineError::RetryExhausted {
                name: key.to_string(),
                attempts,
            });
        }
        *attempts += 1;

        let token = self.root.child_token();
        let due_ms = self.now_ms + self.delay_ms;
        trace!(key = %key, attempt = *attempts, due_ms = due_ms, "Scheduled retry");
        self.pending.push(Scheduled {
            key: key.to_string(),
            due_ms,
            token,
        });
        Ok(())
    }

    /// Drop the pending wait for `key`, keeping its attempt count
    pub fn cancel(&mut self, key: &str) {
        if let Some(entry) = self.live(key) {
            trace!(key = %key, "Cancelled retry");
            entry.token.cancel();
        }
    }

    /// The awaited element showed up; start counting from zero next time
    pub fn clear_attempts(&mut self, key: &str) {
        self.attempts.remove(key);
    }

    pub fn attempts(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn has_pending(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|s| !s.token.is_cancelled()).count()
    }

    fn live(&self, key: &str) -> Option<&Scheduled> {
        self.pending
            .iter()
            .find(|s| s.key == key && !s.token.is_cancelled())
    }

    /// Pop the earliest live entry due no later than `until`, moving the
    /// clock to its due time. Cancelled entries are dropped on the way.
    pub fn pop_due(&mut self, until: u64) -> Option<String> {
        self.pending.retain(|s| !s.token.is_cancelled());
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ms <= until)
            .min_by_key(|(_, s)| s.due_ms)
            .map(|(i, _)| i)?;
        let entry = self.pending.remove(index);
        self.now_ms = self.now_ms.max(entry.due_ms);
        Some(entry.key)
    }

    /// Move the clock forward once everything due has run
    pub fn settle(&mut self, until: u64) {
        self.now_ms = self.now_ms.max(until);
    }

    /// Cancel every outstanding retry and forget all attempt counts
    pub fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            debug!(count = self.pending.len(), "Cancelling pending retries");
        }
        self.root.cancel();
        self.root = CancellationToken::new();
        self.pending.clear();
        self.attempts.clear();
    }
}
