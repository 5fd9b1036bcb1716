use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::HashMap;
use parking_lot::RwLock;

use crate::description::{PartialSkeleton, SkeletonDescription};
use crate::store::{ChannelId, StoreError, TransformComponents, TransformStore};
use crate::transform::Transform;

struct Slot {
    /// What the external process currently holds.
    live: Transform,
    /// What readers observe. Trails `live` until a refresh.
    mirror: Transform,
    readback: bool,
}

impl Slot {
    fn new(transform: Transform) -> Self {
        Self {
            live: transform,
            mirror: transform,
            readback: true,
        }
    }
}

/// In-memory [TransformStore] with the read-back behavior of a live process
/// binding: reads observe a mirror copy that only picks up external changes
/// on [MirrorStore::refresh], and only for channels with read-back enabled.
///
/// Hosts use it for dry-run posing; the test suites drive all engine
/// behavior through it.
pub struct MirrorStore {
    slots: RwLock<HashMap<usize, Slot>>,
    description: Option<SkeletonDescription>,
    write_count: AtomicUsize,
}

impl MirrorStore {
    /// A store with no skeleton behind it; [TransformStore::describe] returns
    /// `None` and no channels exist.
    pub fn empty() -> Self {
        Self {
            slots: RwLock::default(),
            description: None,
            write_count: AtomicUsize::new(0),
        }
    }

    pub fn builder() -> MirrorStoreBuilder {
        MirrorStoreBuilder::default()
    }

    /// Simulates the external process changing a bone, e.g. an animation
    /// step. Reads will not observe the change until [MirrorStore::refresh].
    pub fn poke(&self, channel: ChannelId, transform: Transform) {
        if let Some(slot) = self.slots.write().get_mut(&channel.0) {
            slot.live = transform;
        }
    }

    /// Propagates live values into the readable mirror for every channel with
    /// read-back enabled, like the periodic memory tick of a process binding.
    pub fn refresh(&self) {
        for slot in self.slots.write().values_mut() {
            if slot.readback {
                slot.mirror = slot.live;
            }
        }
    }

    /// The transform the external process currently holds for `channel`.
    pub fn live(&self, channel: ChannelId) -> Option<Transform> {
        self.slots.read().get(&channel.0).map(|slot| slot.live)
    }

    /// Number of store writes issued so far, across all channels.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::Relaxed)
    }

    /// First channel whose described bone name equals `name`, searching body
    /// groups first, then main hand, then off hand.
    pub fn channel(&self, name: &str) -> Option<ChannelId> {
        let description = self.description.as_ref()?;
        let groups = description
            .body
            .iter()
            .chain(description.main_hand.iter())
            .chain(description.off_hand.iter());
        for group in groups {
            for (index, bone_name) in group.bone_names.iter().enumerate() {
                if bone_name == name {
                    return Some(group.channels[index]);
                }
            }
        }
        None
    }
}

impl TransformStore for MirrorStore {
    fn read(&self, channel: ChannelId) -> Result<Transform, StoreError> {
        self.slots
            .read()
            .get(&channel.0)
            .map(|slot| slot.mirror)
            .ok_or(StoreError::UnknownChannel(channel))
    }

    fn write(
        &self,
        channel: ChannelId,
        transform: &Transform,
        components: TransformComponents,
    ) -> Result<(), StoreError> {
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(&channel.0)
            .ok_or(StoreError::UnknownChannel(channel))?;

        if components.contains(TransformComponents::POSITION) {
            slot.live.position = transform.position;
            slot.mirror.position = transform.position;
        }
        if components.contains(TransformComponents::ROTATION) {
            slot.live.rotation = transform.rotation;
            slot.mirror.rotation = transform.rotation;
        }
        if components.contains(TransformComponents::SCALE) {
            slot.live.scale = transform.scale;
            slot.mirror.scale = transform.scale;
        }

        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn set_readback(&self, channel: ChannelId, enabled: bool) {
        if let Some(slot) = self.slots.write().get_mut(&channel.0) {
            slot.readback = enabled;
        }
    }

    fn set_readback_all(&self, enabled: bool) {
        for slot in self.slots.write().values_mut() {
            slot.readback = enabled;
        }
    }

    fn release(&self, channel: ChannelId) {
        self.slots.write().remove(&channel.0);
    }

    fn describe(&self) -> Option<SkeletonDescription> {
        self.description.clone()
    }
}

/// Assembles a [MirrorStore] from named bone groups. Every bone starts at
/// the identity transform; tests that need a posed skeleton write or poke
/// the channels afterwards.
#[derive(Default)]
pub struct MirrorStoreBuilder {
    slots: HashMap<usize, Slot>,
    next_id: usize,
    body: Vec<PartialSkeleton>,
    main_hand: Option<PartialSkeleton>,
    off_hand: Option<PartialSkeleton>,
}

impl MirrorStoreBuilder {
    fn partial(&mut self, bones: &[(&str, i16)]) -> PartialSkeleton {
        let mut partial = PartialSkeleton::default();
        for (name, parent_index) in bones {
            let id = self.next_id;
            self.next_id += 1;
            self.slots.insert(id, Slot::new(Transform::IDENTITY));

            partial.bone_names.push((*name).to_string());
            partial.parent_indices.push(*parent_index);
            partial.channels.push(ChannelId(id));
        }
        partial
    }

    /// Adds one body group (body, head, hair, ...). Groups keep the order
    /// they are added in.
    pub fn body(mut self, bones: &[(&str, i16)]) -> Self {
        let partial = self.partial(bones);
        self.body.push(partial);
        self
    }

    pub fn main_hand(mut self, bones: &[(&str, i16)]) -> Self {
        let partial = self.partial(bones);
        self.main_hand = Some(partial);
        self
    }

    pub fn off_hand(mut self, bones: &[(&str, i16)]) -> Self {
        let partial = self.partial(bones);
        self.off_hand = Some(partial);
        self
    }

    pub fn build(self) -> MirrorStore {
        MirrorStore {
            slots: RwLock::new(self.slots),
            description: Some(SkeletonDescription {
                body: self.body,
                main_hand: self.main_hand,
                off_hand: self.off_hand,
            }),
            write_count: AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn two_bone_store() -> MirrorStore {
        MirrorStore::builder()
            .body(&[("n_root", -1), ("j_kosi", 0)])
            .build()
    }

    #[test]
    fn describe_reports_built_groups() {
        let store = two_bone_store();
        let description = store.describe().unwrap();
        assert_eq!(description.body.len(), 1);
        assert_eq!(description.body[0].bone_names, ["n_root", "j_kosi"]);
        assert_eq!(description.body[0].parent_indices, [-1, 0]);
        assert!(store.describe().unwrap().main_hand.is_none());

        assert!(MirrorStore::empty().describe().is_none());
    }

    #[test]
    fn poke_is_invisible_until_refresh() {
        let store = two_bone_store();
        let channel = store.channel("j_kosi").unwrap();

        let moved = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));
        store.poke(channel, moved);
        assert_eq!(store.read(channel).unwrap(), Transform::IDENTITY);

        store.refresh();
        assert_eq!(store.read(channel).unwrap(), moved);
    }

    #[test]
    fn refresh_skips_channels_with_readback_disabled() {
        let store = two_bone_store();
        let channel = store.channel("j_kosi").unwrap();

        store.set_readback(channel, false);
        store.poke(channel, Transform::from_position(Vec3::ONE));
        store.refresh();
        assert_eq!(store.read(channel).unwrap(), Transform::IDENTITY);

        store.set_readback(channel, true);
        store.refresh();
        assert_eq!(
            store.read(channel).unwrap().position,
            Vec3::ONE,
            "re-enabling read-back lets the next refresh through"
        );
    }

    #[test]
    fn write_respects_component_mask() {
        let store = two_bone_store();
        let channel = store.channel("n_root").unwrap();

        let transform = Transform::new(Vec3::ONE, glam::Quat::from_rotation_y(1.0), Vec3::ZERO);
        store
            .write(channel, &transform, TransformComponents::POSITION)
            .unwrap();

        let read = store.read(channel).unwrap();
        assert_eq!(read.position, Vec3::ONE);
        assert_eq!(read.rotation, glam::Quat::IDENTITY);
        assert_eq!(read.scale, Vec3::ONE);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn released_channel_turns_unknown() {
        let store = two_bone_store();
        let channel = store.channel("j_kosi").unwrap();

        store.release(channel);
        assert!(matches!(
            store.read(channel),
            Err(StoreError::UnknownChannel(_))
        ));
        assert!(matches!(
            store.write(channel, &Transform::IDENTITY, TransformComponents::all()),
            Err(StoreError::UnknownChannel(_))
        ));
    }
}
