//! Bounded alert log.
//!
//! Fixed-capacity, insertion-ordered (oldest first, newest last).  When the
//! log is full, `add` evicts the oldest entry regardless of severity or
//! acknowledgement.  Ids increase monotonically and are never reused, even
//! across [`AlertLog::clear`].
//!
//! Alerts are volatile: they live in RAM only and are lost on restart.

use heapless::{Deque, String, Vec};
use serde::Serialize;

/// Default number of alerts retained.
pub const ALERT_LOG_CAPACITY: usize = 32;

const MESSAGE_LEN: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Subsystem an alert originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Level,
    Pump,
    Runtime,
    Maintenance,
    Mode,
    Test,
    System,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: u32,
    pub severity: Severity,
    pub category: AlertCategory,
    pub title: &'static str,
    pub message: String<MESSAGE_LEN>,
    /// Uptime in milliseconds when the alert was raised.
    pub timestamp_ms: u64,
    pub acknowledged: bool,
}

impl Alert {
    fn new(
        id: u32,
        severity: Severity,
        category: AlertCategory,
        title: &'static str,
        message: &str,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            id,
            severity,
            category,
            title,
            message: truncated(message),
            timestamp_ms,
            acknowledged: false,
        }
    }
}

/// Copy `s` into a fixed string, cutting at a char boundary if too long.
fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// Fixed-capacity FIFO of [`Alert`]s.
pub struct AlertLog<const N: usize = ALERT_LOG_CAPACITY> {
    entries: Deque<Alert, N>,
    next_id: u32,
}

impl<const N: usize> Default for AlertLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AlertLog<N> {
    pub fn new() -> Self {
        Self {
            entries: Deque::new(),
            next_id: 1,
        }
    }

    /// Append an alert, evicting the oldest when full.  Returns its id.
    pub fn add(
        &mut self,
        severity: Severity,
        category: AlertCategory,
        title: &'static str,
        message: &str,
        timestamp_ms: u64,
    ) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        if self.entries.is_full() {
            self.entries.pop_front();
        }
        let alert = Alert::new(id, severity, category, title, message, timestamp_ms);
        // Cannot fail: a slot was freed above when full.
        let _ = self.entries.push_back(alert);
        id
    }

    /// Oldest first, newest last.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.entries.iter()
    }

    pub fn list(&self) -> Vec<Alert, N> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&Alert> {
        self.entries.back()
    }

    pub fn get(&self, id: u32) -> Option<&Alert> {
        self.entries.iter().find(|a| a.id == id)
    }

    /// Mark an alert acknowledged.  Returns `false` if no such id is held.
    pub fn acknowledge(&mut self, id: u32) -> bool {
        match self.entries.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn count_titled(&self, title: &str) -> usize {
        self.entries.iter().filter(|a| a.title == title).count()
    }
}
