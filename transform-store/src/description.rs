use crate::store::ChannelId;

/// One independently indexed bone group from the external model.
///
/// The three vectors are parallel: entry `i` names a bone, gives the index of
/// its parent within this same group (`-1` for none), and carries the store
/// channel for its transform.
#[derive(Clone, Debug, Default)]
pub struct PartialSkeleton {
    pub bone_names: Vec<String>,
    pub parent_indices: Vec<i16>,
    pub channels: Vec<ChannelId>,
}

impl PartialSkeleton {
    pub fn len(&self) -> usize {
        self.bone_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bone_names.is_empty()
    }
}

/// Everything the store knows about the skeleton backing the current actor:
/// the body groups (body, head, hair, met, top) plus the optional weapon
/// groups, each of which is its own complete tree with its own root.
#[derive(Clone, Debug, Default)]
pub struct SkeletonDescription {
    pub body: Vec<PartialSkeleton>,
    pub main_hand: Option<PartialSkeleton>,
    pub off_hand: Option<PartialSkeleton>,
}
