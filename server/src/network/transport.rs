// bbox_sync/server/src/network/transport.rs
use crate::core::types::{BoundingBox, DimensionId, MemberSet, ObserverId, WorldData};
use ahash::AHashSet;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::messages::ClientMessage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("observer {0} is not connected")]
    Disconnected(String),

    #[error("send to {observer} failed: {reason}")]
    SendFailed { observer: String, reason: String },
}

/// Outbound seam. Every call reports synchronously whether the hand-off
/// worked; implementations must not retry on their own.
pub trait DeltaTransport: Send + Sync {
    fn send_initialize(&self, observer: &ObserverId, world: &WorldData) -> Result<(), TransportError>;

    fn send_add(
        &self,
        observer: &ObserverId,
        dimension: &DimensionId,
        owner: &BoundingBox,
        members: &MemberSet,
    ) -> Result<(), TransportError>;

    fn send_remove(
        &self,
        observer: &ObserverId,
        dimension: &DimensionId,
        owner: &BoundingBox,
    ) -> Result<(), TransportError>;
}

pub fn log_send_error(error: &TransportError, observer: &ObserverId, message_type: &str) {
    match error {
        TransportError::Disconnected(_) => {
            debug!("[{}]: Dropped {} for disconnected observer", observer, message_type);
        }
        TransportError::SendFailed { .. } => {
            warn!("[{}]: Error sending {}: {}", observer, message_type, error);
        }
    }
}

/// Keeps every successfully handed-off message in order. Observers can be
/// marked as failing to exercise the failure paths.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ObserverId, ClientMessage)>>,
    failing: Mutex<AHashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, observer: &str) {
        self.failing.lock().insert(observer.to_string());
    }

    pub fn recover(&self, observer: &str) {
        self.failing.lock().remove(observer);
    }

    pub fn messages(&self) -> Vec<(ObserverId, ClientMessage)> {
        self.sent.lock().clone()
    }

    pub fn take_messages(&self) -> Vec<(ObserverId, ClientMessage)> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn messages_for(&self, observer: &str) -> Vec<ClientMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| id.as_str() == observer)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn count_for(&self, observer: &str, message_kind: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|(id, message)| id.as_str() == observer && message.kind() == message_kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn deliver(&self, observer: &ObserverId, message: ClientMessage) -> Result<(), TransportError> {
        if self.failing.lock().contains(observer.as_str()) {
            return Err(TransportError::SendFailed {
                observer: observer.to_string(),
                reason: format!("{} rejected", message.kind()),
            });
        }
        self.sent.lock().push((observer.clone(), message));
        Ok(())
    }
}

impl DeltaTransport for RecordingTransport {
    fn send_initialize(&self, observer: &ObserverId, world: &WorldData) -> Result<(), TransportError> {
        self.deliver(observer, ClientMessage::Initialize(*world))
    }

    fn send_add(
        &self,
        observer: &ObserverId,
        dimension: &DimensionId,
        owner: &BoundingBox,
        members: &MemberSet,
    ) -> Result<(), TransportError> {
        self.deliver(
            observer,
            ClientMessage::AddBoundingBox {
                dimension: dimension.clone(),
                owner: *owner,
                members: members.clone(),
            },
        )
    }

    fn send_remove(
        &self,
        observer: &ObserverId,
        dimension: &DimensionId,
        owner: &BoundingBox,
    ) -> Result<(), TransportError> {
        self.deliver(
            observer,
            ClientMessage::RemoveBoundingBox { dimension: dimension.clone(), owner: *owner },
        )
    }
}

/// Writes every delta to the log instead of a wire. Used by the headless
/// binary when no engine connection is attached.
#[derive(Default)]
pub struct TracingTransport;

impl DeltaTransport for TracingTransport {
    fn send_initialize(&self, observer: &ObserverId, world: &WorldData) -> Result<(), TransportError> {
        info!("[{}] initialize seed={} spawn=({}, {})", observer, world.seed, world.spawn_x, world.spawn_z);
        Ok(())
    }

    fn send_add(
        &self,
        observer: &ObserverId,
        dimension: &DimensionId,
        owner: &BoundingBox,
        members: &MemberSet,
    ) -> Result<(), TransportError> {
        info!("[{}] add {} in {} ({} members)", observer, owner, dimension, members.len());
        Ok(())
    }

    fn send_remove(
        &self,
        observer: &ObserverId,
        dimension: &DimensionId,
        owner: &BoundingBox,
    ) -> Result<(), TransportError> {
        info!("[{}] remove {} in {}", observer, owner, dimension);
        Ok(())
    }
}
