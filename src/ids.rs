//! Message id generation.
//!
//! Ids are millisecond timestamps, bumped so every id handed out is strictly
//! greater than every id generated or observed before it.  Two ids generated
//! within the same millisecond therefore never collide.  If an observed id
//! leaves no room above it, generation restarts from the clock and callers
//! skip ids that are already in use.

use time::OffsetDateTime;

use crate::types::MessageId;

/// Strictly monotonic, clock-seeded message id source.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    /// Creates a generator that has not issued any ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id, distinct from every id issued or observed so far.
    pub fn next_id(&mut self) -> MessageId {
        self.next_after(now_millis())
    }

    /// Records an id that entered the conversation from elsewhere (for
    /// example a server-assigned id) so it is never generated later.
    pub fn observe(&mut self, id: MessageId) {
        self.last = self.last.max(id.get());
    }

    fn next_after(&mut self, clock: u64) -> MessageId {
        let id = match self.last.checked_add(1) {
            Some(next) => clock.max(next),
            None => {
                tracing::warn!("message id space exhausted; restarting from the clock");
                clock
            }
        };
        self.last = id;
        MessageId(id)
    }
}

fn now_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}
