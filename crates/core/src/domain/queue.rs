use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadId;
use crate::domain::worker::WorkerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadQueueEntryId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadQueueEntry {
    pub id: LeadQueueEntryId,
    pub worker_id: WorkerId,
    pub lead_id: LeadId,
    /// 1-based; dense per worker.
    pub position: u32,
    pub created_at: DateTime<Utc>,
}

/// Position for the next entry appended behind `positions`.
pub fn next_position<I>(positions: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    positions.into_iter().max().map(|max| max + 1).unwrap_or(1)
}

/// Closes the gap left by removing `removed` from one worker's entries.
pub fn compact_after(entries: &mut [LeadQueueEntry], removed: u32) {
    for entry in entries.iter_mut().filter(|entry| entry.position > removed) {
        entry.position -= 1;
    }
}

/// True when `positions` is exactly `1..=N` once sorted.
pub fn is_dense<I>(positions: I) -> bool
where
    I: IntoIterator<Item = u32>,
{
    let mut sorted: Vec<u32> = positions.into_iter().collect();
    sorted.sort_unstable();
    sorted.iter().enumerate().all(|(index, position)| *position as usize == index + 1)
}
