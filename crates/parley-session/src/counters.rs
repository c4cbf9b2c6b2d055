//! Process-wide activity counters.
//!
//! One `Counters` value is created by the server and shared by `Arc`
//! with every task that records activity. Counts only go up, except for
//! an explicit [`reset`](Counters::reset).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// What is being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Accepted connections, admitted or not.
    Connections,
    /// Successful logins.
    Logins,
    /// Sessions that ended, for any reason, including those that never
    /// got past login. Rejected connections are not sessions and only
    /// count as [`Rejections`](Counter::Rejections).
    Disconnects,
    /// Sessions ended by the server.
    Kicks,
    /// Logins turned away because the server was full, whether at accept
    /// time or when the name was registered.
    Rejections,
    GroupMessages,
    /// Private messages handled, delivered or not.
    PrivateMessages,
    /// Private messages whose receiver was not online.
    PrivateMessagesFailed,
    /// Transport failures and undecodable frames.
    Exceptions,
}

impl Counter {
    pub const ALL: [Counter; 9] = [
        Counter::Connections,
        Counter::Logins,
        Counter::Disconnects,
        Counter::Kicks,
        Counter::Rejections,
        Counter::GroupMessages,
        Counter::PrivateMessages,
        Counter::PrivateMessagesFailed,
        Counter::Exceptions,
    ];

    /// Short name used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Connections => "connections",
            Self::Logins => "logins",
            Self::Disconnects => "disconnects",
            Self::Kicks => "kicks",
            Self::Rejections => "rejections",
            Self::GroupMessages => "group_messages",
            Self::PrivateMessages => "private_messages",
            Self::PrivateMessagesFailed => "private_messages_failed",
            Self::Exceptions => "exceptions",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Monotonic counters, safe to bump from any task.
#[derive(Debug)]
pub struct Counters {
    values: [AtomicU64; Counter::ALL.len()],
}

impl Counters {
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn increment(&self, counter: Counter) {
        self.add(counter, 1);
    }

    pub fn add(&self, counter: Counter, n: u64) {
        self.values[counter.index()].fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter.index()].load(Ordering::Relaxed)
    }

    /// Copies every value at once, for logging or assertions.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            values: std::array::from_fn(|i| self.values[i].load(Ordering::Relaxed)),
        }
    }

    /// Sets every counter back to zero.
    pub fn reset(&self) {
        for value in &self.values {
            value.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    values: [u64; Counter::ALL.len()],
}

impl CounterSnapshot {
    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter.index()]
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, counter) in Counter::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", counter.label(), self.get(*counter))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_only_touches_one_counter() {
        let counters = Counters::new();
        counters.increment(Counter::GroupMessages);
        counters.increment(Counter::GroupMessages);

        assert_eq!(counters.get(Counter::GroupMessages), 2);
        assert_eq!(counters.get(Counter::PrivateMessages), 0);
    }

    #[test]
    fn test_all_lists_each_counter_at_its_index() {
        for (i, counter) in Counter::ALL.iter().enumerate() {
            assert_eq!(counter.index(), i);
        }
    }

    #[test]
    fn test_snapshot_is_detached_from_later_updates() {
        let counters = Counters::new();
        counters.add(Counter::Disconnects, 3);
        let snap = counters.snapshot();
        counters.increment(Counter::Disconnects);

        assert_eq!(snap.get(Counter::Disconnects), 3);
        assert_eq!(counters.get(Counter::Disconnects), 4);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let counters = Counters::new();
        for counter in Counter::ALL {
            counters.increment(counter);
        }
        counters.reset();
        assert!(Counter::ALL.iter().all(|c| counters.get(*c) == 0));
    }

    #[test]
    fn test_snapshot_display_lists_labels() {
        let counters = Counters::new();
        counters.increment(Counter::Logins);
        let text = counters.snapshot().to_string();

        assert!(text.starts_with("connections=0 logins=1 "));
        assert!(text.ends_with("exceptions=0"));
    }
}
