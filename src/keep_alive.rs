use std::{collections::VecDeque, time::Instant};

/// Milliseconds of timeout per ledger slot.
const MS_PER_ENTRY: i64 = 50;

/// A keep-alive the backend sent that the client has not answered yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PendingKeepAlive {
    pub id: i64,
    pub sent_at: Instant,
}

/// Keep-alives awaiting acknowledgement, oldest first.
///
/// With a positive timeout the ledger holds at most `timeout_ms / 50`
/// entries and keep-alives beyond that are not recorded. A timeout of zero
/// or less leaves it unbounded.
#[derive(Debug)]
pub struct KeepAliveLedger {
    entries: VecDeque<PendingKeepAlive>,
    capacity: Option<usize>,
}

impl KeepAliveLedger {
    pub fn with_timeout_ms(timeout_ms: i64) -> Self {
        let capacity = (timeout_ms > 0)
            .then(|| usize::try_from(timeout_ms / MS_PER_ENTRY).unwrap_or(usize::MAX));
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Records a keep-alive sent now. Returns whether it was recorded.
    pub fn record(&mut self, id: i64) -> bool {
        self.record_at(id, Instant::now())
    }

    pub fn record_at(&mut self, id: i64, sent_at: Instant) -> bool {
        if self.capacity.is_some_and(|capacity| self.entries.len() >= capacity) {
            return false;
        }
        self.entries.push_back(PendingKeepAlive { id, sent_at });
        true
    }

    /// Removes the entry the client answered, if any.
    pub fn acknowledge(&mut self, id: i64) -> Option<PendingKeepAlive> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        self.entries.remove(index)
    }

    pub fn oldest(&self) -> Option<&PendingKeepAlive> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
