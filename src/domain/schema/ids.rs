//! Per-type tag id counters

use std::collections::HashMap;

/// Monotonic id counters, one per tag type.
///
/// A counter always sits one above the highest numeric suffix seen for its
/// prefix, so ids of deleted tags are never handed out again.
#[derive(Debug, Clone, Default)]
pub struct IdCounters {
    next: HashMap<String, u64>,
}

impl IdCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `prefix + counter` and advance the counter
    pub fn next(&mut self, type_name: &str, prefix: &str) -> String {
        let counter = self.next.entry(type_name.to_string()).or_insert(0);
        let id = format!("{}{}", prefix, counter);
        *counter = counter.saturating_add(1);
        id
    }

    /// Raise the counter past the numeric suffix of an existing id.
    ///
    /// Ids that do not start with the prefix, carry a non-numeric suffix or
    /// sit at the top of the counter range are ignored.
    pub fn observe(&mut self, type_name: &str, prefix: &str, tid: &str) {
        let Some(suffix) = tid.strip_prefix(prefix) else {
            return;
        };
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return;
        }
        let Ok(number) = suffix.parse::<u64>() else {
            return;
        };

        let Some(next) = number.checked_add(1) else {
            log::warn!("Id '{}' cannot be followed by a larger number; ignored", tid);
            return;
        };

        let counter = self.next.entry(type_name.to_string()).or_insert(0);
        if next > *counter {
            *counter = next;
        }
    }

    /// The value the next id for this type will carry
    pub fn peek(&self, type_name: &str) -> u64 {
        self.next.get(type_name).copied().unwrap_or(0)
    }
}
