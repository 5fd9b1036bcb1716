use bitflags::bitflags;

use crate::description::SkeletonDescription;
use crate::transform::Transform;

/// Identifies one bone's transform slot inside a store.
///
/// Channel ids are only meaningful to the store that issued them; a released
/// channel stays invalid until the store hands it out again.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ChannelId(pub(crate) usize);

impl ChannelId {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> usize {
        self.0
    }
}

bitflags! {
    /// Which parts of a [Transform] a write should touch.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct TransformComponents: u32 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const SCALE = 1 << 2;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown channel: {0:?}")]
    UnknownChannel(ChannelId),

    #[error("Store is detached from the live process")]
    Detached,

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read/write access to the transforms of a live, externally owned skeleton.
///
/// Transforms are in model space. Implementations are shared across a write
/// loop and a snapshot loop, so every method takes `&self`.
pub trait TransformStore: Send + Sync {
    /// Current model-space transform of `channel`.
    fn read(&self, channel: ChannelId) -> Result<Transform, StoreError>;

    /// Writes the components selected by `components`; the rest keep their
    /// stored values.
    fn write(
        &self,
        channel: ChannelId,
        transform: &Transform,
        components: TransformComponents,
    ) -> Result<(), StoreError>;

    /// Controls whether external changes on `channel` are reflected by
    /// subsequent reads. Writers disable read-back around their own writes so
    /// the written value does not come back disguised as an external change.
    fn set_readback(&self, channel: ChannelId, enabled: bool);

    /// Bulk form of [TransformStore::set_readback] over every channel, used
    /// while taking a snapshot.
    fn set_readback_all(&self, enabled: bool);

    /// Returns the channel to the store. Reads and writes on a released
    /// channel fail with [StoreError::UnknownChannel].
    fn release(&self, channel: ChannelId);

    /// Describes the skeleton currently backing this store, or `None` when no
    /// model is loaded.
    fn describe(&self) -> Option<SkeletonDescription>;
}
