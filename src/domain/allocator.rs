//! Snowflake-style identifier allocation.
//!
//! Identifiers are 64-bit integers composed of a millisecond timestamp
//! relative to a configured epoch, a statically assigned node id, and a
//! per-millisecond sequence counter:
//!
//! ```text
//! id = millis_since_epoch << 22 | node_id << 12 | sequence
//! ```
//!
//! Uniqueness across processes comes from the node id partitioning the
//! identifier space; uniqueness within a process comes from the sequence
//! counter behind a mutex. The lock is held only while one identifier is
//! computed, never across I/O.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use thiserror::Error;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_SHIFT: u32 = NODE_BITS + SEQUENCE_BITS;

/// Largest node id that fits the layout (1023).
pub const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;

const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;

const EPOCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from allocator construction and allocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocatorError {
    #[error("node id {node_id} exceeds maximum {max}")]
    InvalidNodeId { node_id: u16, max: u16 },

    #[error("invalid epoch date {date:?}, expected YYYY-MM-DD")]
    InvalidEpochDate { date: String },

    #[error("epoch date {date} is in the future")]
    EpochInFuture { date: String },

    #[error("system clock reads before the configured epoch")]
    ClockBeforeEpoch,

    #[error("system clock moved backwards: last allocation at {last_millis} ms, now {now_millis} ms")]
    ClockRegression { last_millis: u64, now_millis: u64 },
}

#[derive(Debug, Default)]
struct AllocatorState {
    last_timestamp: u64,
    sequence: u16,
}

/// Mint of time-ordered, collision-free 64-bit identifiers.
///
/// Safe for concurrent callers within one process. If more than 4096
/// identifiers are requested within one millisecond the allocator spins
/// until the clock advances rather than overflowing into the timestamp
/// field. A clock observed to run backwards fails the allocation instead
/// of risking a duplicate.
#[derive(Debug)]
pub struct IdAllocator {
    node_id: u16,
    epoch_millis: u64,
    state: Mutex<AllocatorState>,
}

impl IdAllocator {
    /// Creates an allocator for the given node with an epoch date in
    /// `YYYY-MM-DD` form (midnight UTC).
    ///
    /// # Errors
    ///
    /// Fails when the node id does not fit its 10 bits, the date does not
    /// parse, or the epoch lies in the future.
    pub fn new(node_id: u16, epoch_date: &str) -> Result<Self, AllocatorError> {
        if node_id > MAX_NODE_ID {
            return Err(AllocatorError::InvalidNodeId {
                node_id,
                max: MAX_NODE_ID,
            });
        }

        let date = NaiveDate::parse_from_str(epoch_date, EPOCH_DATE_FORMAT).map_err(|_| {
            AllocatorError::InvalidEpochDate {
                date: epoch_date.to_string(),
            }
        })?;

        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AllocatorError::InvalidEpochDate {
                date: epoch_date.to_string(),
            })?;
        let epoch_millis = u64::try_from(midnight.and_utc().timestamp_millis()).map_err(|_| {
            AllocatorError::InvalidEpochDate {
                date: epoch_date.to_string(),
            }
        })?;

        let allocator = Self {
            node_id,
            epoch_millis,
            state: Mutex::new(AllocatorState::default()),
        };

        if allocator.now_millis().is_err() {
            return Err(AllocatorError::EpochInFuture {
                date: epoch_date.to_string(),
            });
        }

        Ok(allocator)
    }

    /// The node id this allocator stamps into every identifier.
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Allocates the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::ClockRegression`] when the clock reads
    /// earlier than the last allocation. The failure is scoped to this
    /// call; later calls succeed once the clock catches up.
    pub fn allocate(&self) -> Result<u64, AllocatorError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let mut now = self.now_millis()?;
        if now < state.last_timestamp {
            return Err(AllocatorError::ClockRegression {
                last_millis: state.last_timestamp,
                now_millis: now,
            });
        }

        if now == state.last_timestamp {
            if state.sequence >= MAX_SEQUENCE {
                now = self.spin_until_after(state.last_timestamp)?;
                state.sequence = 0;
            } else {
                state.sequence += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        Ok(compose(now, self.node_id, state.sequence))
    }

    /// Milliseconds of wall-clock time elapsed since the configured epoch.
    fn now_millis(&self) -> Result<u64, AllocatorError> {
        let unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AllocatorError::ClockBeforeEpoch)?
            .as_millis() as u64;

        unix_millis
            .checked_sub(self.epoch_millis)
            .ok_or(AllocatorError::ClockBeforeEpoch)
    }

    /// Busy-waits until the clock passes `last`, detecting regressions.
    fn spin_until_after(&self, last: u64) -> Result<u64, AllocatorError> {
        loop {
            let now = self.now_millis()?;
            if now > last {
                return Ok(now);
            }
            if now < last {
                return Err(AllocatorError::ClockRegression {
                    last_millis: last,
                    now_millis: now,
                });
            }
            std::hint::spin_loop();
        }
    }

    /// The timestamp component of an identifier, in millis since the epoch.
    pub fn timestamp_of(id: u64) -> u64 {
        id >> TIMESTAMP_SHIFT
    }

    /// The node component of an identifier.
    pub fn node_of(id: u64) -> u16 {
        ((id >> SEQUENCE_BITS) & MAX_NODE_ID as u64) as u16
    }

    /// The sequence component of an identifier.
    pub fn sequence_of(id: u64) -> u16 {
        (id & MAX_SEQUENCE as u64) as u16
    }

    #[cfg(test)]
    fn force_last_timestamp(&self, last_timestamp: u64) {
        let mut state = self.state.lock().unwrap();
        state.last_timestamp = last_timestamp;
        state.sequence = 0;
    }
}

fn compose(timestamp: u64, node_id: u16, sequence: u16) -> u64 {
    (timestamp << TIMESTAMP_SHIFT) | ((node_id as u64) << SEQUENCE_BITS) | sequence as u64
}
