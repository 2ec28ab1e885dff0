// bbox_sync/server/src/network/messages.rs
use crate::core::types::{BoundingBox, DimensionId, MemberSet, WorldData};

/// Everything the synchronization core ever sends to one observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Initialize(WorldData),
    AddBoundingBox {
        dimension: DimensionId,
        owner: BoundingBox,
        members: MemberSet,
    },
    RemoveBoundingBox {
        dimension: DimensionId,
        owner: BoundingBox,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Initialize(_) => "initialize",
            ClientMessage::AddBoundingBox { .. } => "add_bounding_box",
            ClientMessage::RemoveBoundingBox { .. } => "remove_bounding_box",
        }
    }

    pub fn owner(&self) -> Option<&BoundingBox> {
        match self {
            ClientMessage::Initialize(_) => None,
            ClientMessage::AddBoundingBox { owner, .. } | ClientMessage::RemoveBoundingBox { owner, .. } => Some(owner),
        }
    }
}
