//! A single joint of a posed skeleton: its store channels, its cached
//! parent-relative transform, and the conversion logic that moves values
//! between the cache and the live store.

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::HashMap;
use glam::{Quat, Vec3};
use parking_lot::RwLock;
use tracing::warn;
use transform_store::{ChannelId, StoreError, Transform, TransformComponents, TransformStore};

use crate::options::PoseOptions;
use crate::space::{local_to_model, model_to_local};

/// Differences below this threshold are numeric drift, not edits, and are
/// never written back to the store.
pub const EQUALITY_TOLERANCE: f32 = 0.00001;

/// Bones that exist to attach equipment to the body. Their scale mirrors to
/// linked bones regardless of the session-wide scale-link setting.
const ATTACHMENT_BONE_NAMES: &[&str] = &["n_buki_r", "n_buki_l", "j_buki_sebo_r", "j_buki_sebo_l"];

/// A name to model-space transform map covering the whole skeleton, taken in
/// one pass so a batched refresh does not read every channel separately.
pub type TransformSnapshot = HashMap<String, Transform>;

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Bone '{0}' has no store channels")]
    NoChannels(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// UI grouping for a bone, derived from its name prefix and the partial
/// sub-skeleton it came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoneCategory {
    Uncategorized,
    Body,
    Head,
    Hair,
    Met,
    Top,
    MainHand,
    OffHand,
}

#[derive(Clone, Copy, Debug, Default)]
struct BoneState {
    local: Transform,
    has_reading: bool,
    /// A local edit that has not been flushed to the store yet.
    dirty: bool,
}

/// One joint. Owns one store channel per duplicated sub-skeleton the joint
/// appears in; all channels are kept in lock-step on writes.
///
/// The state lock guards the cached local transform only, never the store
/// calls; concurrent readers and writers serialize per bone, not per store
/// round-trip.
pub struct Bone {
    name: String,
    partial_index: usize,
    attachment: bool,
    locked: AtomicBool,
    store: Arc<dyn TransformStore>,
    options: Arc<PoseOptions>,
    me: Weak<Bone>,
    channels: RwLock<Vec<ChannelId>>,
    parent: RwLock<Weak<Bone>>,
    children: RwLock<Vec<Weak<Bone>>>,
    links: RwLock<Vec<Weak<Bone>>>,
    state: RwLock<BoneState>,
}

impl Bone {
    pub(crate) fn new(
        name: String,
        partial_index: usize,
        channel: ChannelId,
        store: Arc<dyn TransformStore>,
        options: Arc<PoseOptions>,
    ) -> Arc<Self> {
        let attachment = ATTACHMENT_BONE_NAMES.contains(&name.as_str());
        Arc::new_cyclic(|me| Self {
            name,
            partial_index,
            attachment,
            locked: AtomicBool::new(false),
            store,
            options,
            me: me.clone(),
            channels: RwLock::new(vec![channel]),
            parent: RwLock::new(Weak::new()),
            children: RwLock::default(),
            links: RwLock::default(),
            state: RwLock::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partial_index(&self) -> usize {
        self.partial_index
    }

    pub fn is_attachment(&self) -> bool {
        self.attachment
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// A locked bone rejects every edit channel, whatever the freeze flags
    /// say. The skeleton root is locked at construction.
    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Release);
    }

    pub fn category(&self) -> BoneCategory {
        if self.name.starts_with("mh_") {
            BoneCategory::MainHand
        } else if self.name.starts_with("oh_") {
            BoneCategory::OffHand
        } else if self.name == "j_ago" || self.name == "j_kao" {
            BoneCategory::Body
        } else {
            match self.partial_index {
                0 => BoneCategory::Body,
                1 => BoneCategory::Head,
                2 => BoneCategory::Hair,
                3 => BoneCategory::Met,
                4 => BoneCategory::Top,
                _ => BoneCategory::Uncategorized,
            }
        }
    }

    pub fn channels(&self) -> Vec<ChannelId> {
        self.channels.read().clone()
    }

    pub(crate) fn add_channel(&self, channel: ChannelId) {
        self.channels.write().push(channel);
    }

    pub(crate) fn take_channels(&self) -> Vec<ChannelId> {
        std::mem::take(&mut *self.channels.write())
    }

    /// Hands every channel back to the store. After this the bone is inert
    /// and any read or write on it fails with [`PoseError::NoChannels`].
    pub(crate) fn release_channels(&self) {
        for channel in self.take_channels() {
            self.store.release(channel);
        }
    }

    fn primary_channel(&self) -> Option<ChannelId> {
        self.channels.read().first().copied()
    }

    pub fn parent(&self) -> Option<Arc<Bone>> {
        self.parent.read().upgrade()
    }

    pub fn children(&self) -> Vec<Arc<Bone>> {
        self.children
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub fn linked_bones(&self) -> Vec<Arc<Bone>> {
        self.links
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub(crate) fn add_link(&self, link: &Arc<Bone>) {
        self.links.write().push(Arc::downgrade(link));
    }

    /// Re-parents this bone, keeping both child lists consistent. Passing
    /// `None` turns the bone into a root.
    pub fn set_parent(&self, new_parent: Option<&Arc<Bone>>) {
        let old_parent = self.parent.read().upgrade();
        if let Some(old_parent) = old_parent {
            old_parent
                .children
                .write()
                .retain(|weak| weak.upgrade().is_some_and(|child| !std::ptr::eq(&*child, self)));
        }

        match new_parent {
            Some(parent) => {
                *self.parent.write() = Arc::downgrade(parent);
                parent.children.write().push(self.me.clone());
            }
            None => *self.parent.write() = Weak::new(),
        }
    }

    /// Cached parent-relative position. Relative to the skeleton root when
    /// the bone has no parent.
    pub fn position(&self) -> Vec3 {
        self.state.read().local.position
    }

    pub fn set_position(&self, position: Vec3) {
        let mut state = self.state.write();
        state.local.position = position;
        state.dirty = true;
    }

    pub fn rotation(&self) -> Quat {
        self.state.read().local.rotation
    }

    pub fn set_rotation(&self, rotation: Quat) {
        let mut state = self.state.write();
        state.local.rotation = rotation;
        state.dirty = true;
    }

    pub fn scale(&self) -> Vec3 {
        self.state.read().local.scale
    }

    pub fn set_scale(&self, scale: Vec3) {
        let mut state = self.state.write();
        state.local.scale = scale;
        state.dirty = true;
    }

    pub fn local_transform(&self) -> Transform {
        self.state.read().local
    }

    pub fn set_local_transform(&self, transform: Transform) {
        let mut state = self.state.write();
        state.local = transform;
        state.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    pub fn has_reading(&self) -> bool {
        self.state.read().has_reading
    }

    pub fn can_translate(&self) -> bool {
        self.options.freeze_positions() && !self.is_locked()
    }

    pub fn can_rotate(&self) -> bool {
        self.options.freeze_rotation() && !self.is_locked()
    }

    pub fn can_scale(&self) -> bool {
        self.options.freeze_scale() && !self.is_locked()
    }

    /// Whether this bone mirrors its scale onto linked bones.
    pub fn scale_linked(&self) -> bool {
        self.attachment || self.options.scale_linked()
    }

    /// Whether mirrored writes are on for this bone: it has links and the
    /// per-bone toggle has not been switched off.
    pub fn links_enabled(&self) -> bool {
        !self.links.read().is_empty() && self.options.bone_link_enabled(&self.name)
    }

    /// Toggles mirrored writes for this bone and all of its links, so both
    /// sides of a pair flip together.
    pub fn set_links_enabled(&self, enabled: bool) {
        self.options.set_bone_link_enabled(&self.name, enabled);
        for link in self.linked_bones() {
            self.options.set_bone_link_enabled(link.name(), enabled);
        }
    }

    /// Number of ancestors above this bone.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(bone) = current {
            depth += 1;
            current = bone.parent();
        }
        depth
    }

    /// Every bone below this one, in traversal order.
    pub fn descendants(&self) -> Vec<Arc<Bone>> {
        let mut descendants = Vec::new();
        let mut stack = self.children();
        while let Some(bone) = stack.pop() {
            stack.extend(bone.children());
            descendants.push(bone);
        }
        descendants
    }

    pub fn has_ancestor(&self, target: &Bone) -> bool {
        let mut current = self.parent();
        while let Some(bone) = current {
            if std::ptr::eq(&*bone, target) {
                return true;
            }
            current = bone.parent();
        }
        false
    }

    /// Pulls this bone's model-space transform from the snapshot or its
    /// primary channel, converts it to parent-relative space and stores it in
    /// the cache. Walks the whole subtree when `read_children` is set.
    ///
    /// During a snapshot pass a dirty bone keeps its cache: the batched
    /// refresh must not clobber an edit that has not been written out yet. A
    /// direct read always overwrites.
    pub fn read_transform(
        &self,
        read_children: bool,
        snapshot: Option<&TransformSnapshot>,
    ) -> Result<(), PoseError> {
        if self.channels.read().is_empty() {
            return Err(PoseError::NoChannels(self.name.clone()));
        }
        let Some(me) = self.me.upgrade() else {
            return Ok(());
        };

        let mut stack = vec![me];
        while let Some(bone) = stack.pop() {
            if read_children {
                stack.extend(bone.children());
            }

            if snapshot.is_some() && bone.state.read().dirty {
                continue;
            }

            let Some(model) = bone.sample_model(snapshot) else {
                continue;
            };

            let local = match bone.parent() {
                Some(parent) => match parent.sample_model(snapshot) {
                    Some(parent_model) => model_to_local(&model, &parent_model),
                    None => continue,
                },
                None => model,
            };

            let mut state = bone.state.write();
            state.local = local;
            state.has_reading = true;
            state.dirty = false;
        }

        Ok(())
    }

    /// Model-space transform of one bone, from the snapshot if it has an
    /// entry, otherwise from the primary channel. Failures are logged and
    /// yield `None` so a refresh can carry on past one bad bone.
    pub(crate) fn sample_model(&self, snapshot: Option<&TransformSnapshot>) -> Option<Transform> {
        if let Some(transform) = snapshot.and_then(|snapshot| snapshot.get(&self.name)) {
            return Some(*transform);
        }

        let Some(channel) = self.primary_channel() else {
            warn!("Bone '{}' has no store channels to read", self.name);
            return None;
        };
        match self.store.read(channel) {
            Ok(transform) => Some(transform),
            Err(error) => {
                warn!("Failed to read bone '{}': {error}", self.name);
                None
            }
        }
    }

    /// Flushes this bone's cached local transform to the store, converting to
    /// model space against its parent.
    ///
    /// Works through an explicit stack of `(bone, mirror to links, parent
    /// model transform)` items. Per item: the target model transform comes
    /// from the carried parent result when the parent was written in this
    /// same pass, otherwise from the local caches composed root-to-leaf.
    /// Read-back is off on all of the bone's channels while they are
    /// compared and written; every channel only receives the components that
    /// moved more than [EQUALITY_TOLERANCE] and that the capability flags
    /// allow. When anything changed, linked bones take over rotation (and
    /// scale, for scale-linked bones) and queue with mirroring off, and
    /// children either ride along with the new parent transform or re-read
    /// themselves when hierarchy propagation is off.
    pub fn write_transform(&self, write_children: bool, write_linked: bool) -> Result<(), PoseError> {
        if self.channels.read().is_empty() {
            return Err(PoseError::NoChannels(self.name.clone()));
        }
        let Some(me) = self.me.upgrade() else {
            return Ok(());
        };

        let mut stack: Vec<(Arc<Bone>, bool, Option<Transform>)> = vec![(me, write_linked, None)];

        while let Some((bone, mirror, parent_model)) = stack.pop() {
            let channels = bone.channels();
            if channels.is_empty() {
                warn!("Skipping write for channel-less bone '{}'", bone.name);
                continue;
            }

            if !bone.has_reading() {
                bone.read_transform(false, None)?;
            }

            let local = bone.local_transform();
            let parent_model = parent_model.or_else(|| bone.compose_parent_model());
            let target = match parent_model {
                Some(parent_model) => local_to_model(&local, &parent_model),
                None => local,
            };

            for channel in &channels {
                bone.store.set_readback(*channel, false);
            }
            let written = bone.write_channels(&channels, &target);
            for channel in &channels {
                bone.store.set_readback(*channel, true);
            }
            let changed = written?;

            bone.state.write().dirty = false;

            if !changed {
                continue;
            }

            if mirror && bone.links_enabled() {
                let mirror_scale = bone.scale_linked();
                for link in bone.linked_bones() {
                    {
                        let mut state = link.state.write();
                        state.local.rotation = local.rotation;
                        if mirror_scale {
                            state.local.scale = local.scale;
                        }
                        state.dirty = true;
                    }
                    stack.push((link, false, None));
                }
            }

            if write_children {
                if bone.options.parenting() {
                    for child in bone.children() {
                        stack.push((child, mirror, Some(target)));
                    }
                } else {
                    // The children stayed where they were in model space, so
                    // their parent-relative caches have to be recomputed.
                    for child in bone.children() {
                        if let Err(error) = child.read_transform(false, None) {
                            warn!("Failed to re-read child '{}': {error}", child.name);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Compares and writes every channel against `target`; returns whether
    /// any channel received a write.
    fn write_channels(&self, channels: &[ChannelId], target: &Transform) -> Result<bool, PoseError> {
        let can_translate = self.can_translate();
        let can_scale = self.can_scale();
        let can_rotate = self.can_rotate();

        let mut changed = false;
        for channel in channels {
            let current = self.store.read(*channel)?;

            let mut components = TransformComponents::empty();
            if can_translate && !current.position.abs_diff_eq(target.position, EQUALITY_TOLERANCE) {
                components |= TransformComponents::POSITION;
            }
            if can_scale && !current.scale.abs_diff_eq(target.scale, EQUALITY_TOLERANCE) {
                components |= TransformComponents::SCALE;
            }
            if can_rotate && !current.rotation.abs_diff_eq(target.rotation, EQUALITY_TOLERANCE) {
                components |= TransformComponents::ROTATION;
            }

            if !components.is_empty() {
                self.store.write(*channel, target, components)?;
                changed = true;
            }
        }

        Ok(changed)
    }

    /// The parent's model-space transform, composed from the cached local
    /// transforms along the ancestor chain, root first. `None` for roots.
    fn compose_parent_model(&self) -> Option<Transform> {
        let parent = self.parent()?;

        let mut chain = Vec::with_capacity(parent.depth() + 1);
        let mut current = Some(parent);
        while let Some(bone) = current {
            current = bone.parent();
            chain.push(bone);
        }

        let mut model = Transform::IDENTITY;
        for bone in chain.iter().rev() {
            model = local_to_model(&bone.local_transform(), &model);
        }
        Some(model)
    }
}

impl std::fmt::Debug for Bone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bone")
            .field("name", &self.name)
            .field("partial_index", &self.partial_index)
            .field("locked", &self.is_locked())
            .field("channels", &self.channels.read().len())
            .finish()
    }
}
