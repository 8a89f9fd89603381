//! Trib record, its total order, and user-facing limits.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Maximum length of a username in bytes.
pub const MAX_USERNAME_LEN: usize = 15;

/// Maximum length of a trib message in bytes.
pub const MAX_TRIB_LEN: usize = 140;

/// Maximum number of tribs kept per user and returned by a single fetch.
pub const MAX_TRIB_FETCH: usize = 100;

/// Number of users at which the cached user list stops being refreshed.
pub const MIN_LIST_USER: usize = 20;

/// Maximum number of users one user may follow.
pub const MAX_FOLLOWING: usize = 2000;

/// Returns true if `user` is a valid username: a lowercase letter followed by
/// lowercase letters or digits, at most `MAX_USERNAME_LEN` bytes in total.
pub fn is_valid_username(user: &str) -> bool {
    if user.is_empty() || user.len() > MAX_USERNAME_LEN {
        return false;
    }
    let mut chars = user.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// A single post.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Trib {
    /// Author.
    pub user: String,

    /// Text of the post.
    pub message: String,

    /// Wall-clock posting time, microseconds since the unix epoch.
    pub time: u64,

    /// Logical clock value stamped at posting.
    pub clock: u64,
}

impl Trib {
    /// Creates a trib stamped with the current wall time.
    pub fn new(
        user: impl Into<String>,
        message: impl Into<String>,
        clock: u64,
    ) -> Self {
        Trib {
            user: user.into(),
            message: message.into(),
            time: now_micros(),
            clock,
        }
    }
}

/// Current wall time in microseconds since the unix epoch; zero if the
/// system clock reads before the epoch.
fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_micros() as u64)
}

// tribs order by clock, then time, then user, then message
impl Ord for Trib {
    fn cmp(&self, other: &Self) -> Ordering {
        self.clock
            .cmp(&other.clock)
            .then_with(|| self.time.cmp(&other.time))
            .then_with(|| self.user.cmp(&other.user))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl PartialOrd for Trib {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
