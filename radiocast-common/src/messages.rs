//! Push-channel message types
//!
//! Serialized as JSON with a `type` tag. The same string is used as the SSE
//! `event:` name so browser clients can subscribe per type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Asset, BroadcastState, ScheduleItem};

/// Message delivered to every connected listener channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RadioMessage {
    /// Full snapshot of current reality, sent once on connect
    State { state: BroadcastState },

    /// A schedule item was created or modified
    ///
    /// `asset` is present when the item's asset reference resolves. `state`
    /// is the snapshot recomputed right after the mutation.
    ScheduleUpdate {
        item: ScheduleItem,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<Asset>,
        state: BroadcastState,
    },

    /// A schedule item was deleted
    ScheduleDeleted { id: Uuid },
}

impl RadioMessage {
    /// SSE event name for this message
    pub fn event_name(&self) -> &'static str {
        match self {
            RadioMessage::State { .. } => "state",
            RadioMessage::ScheduleUpdate { .. } => "schedule_update",
            RadioMessage::ScheduleDeleted { .. } => "schedule_deleted",
        }
    }

    /// Broadcast snapshot carried by the message, if any
    pub fn state(&self) -> Option<&BroadcastState> {
        match self {
            RadioMessage::State { state } | RadioMessage::ScheduleUpdate { state, .. } => Some(state),
            RadioMessage::ScheduleDeleted { .. } => None,
        }
    }
}
