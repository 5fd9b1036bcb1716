//! The merged bone tree: one [Skeleton] per actor, assembled from the
//! store's partial sub-skeletons and kept in sync with it.

use std::sync::Arc;

use ahash::HashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};
use transform_store::{PartialSkeleton, TransformStore};

use crate::{
    bone::{Bone, TransformSnapshot},
    links::{ActorProfile, LinkSet, standard_links},
    names::{NameResolver, matches_hair_pattern},
    options::PoseOptions,
};

/// The live subject a skeleton binds to: the store its transforms move
/// through, plus what the link tables need to know about the character.
#[derive(Clone)]
pub struct Actor {
    pub store: Arc<dyn TransformStore>,
    pub profile: ActorProfile,
}

/// A name-keyed bone tree mirroring the actor's skeleton.
///
/// The map is the only strong owner of the bones; parent, child and link
/// edges between them are weak. Several trees can coexist in one skeleton
/// (each body group and weapon has its own root), so most whole-skeleton
/// operations start from [Skeleton::root_bones].
pub struct Skeleton {
    options: Arc<PoseOptions>,
    links: Vec<LinkSet>,
    names: NameResolver,
    actor: RwLock<Option<Actor>>,
    bones: RwLock<HashMap<String, Arc<Bone>>>,
    // Reused across refresh passes. Lock order: restore_gate, snapshot,
    // actor, bones.
    snapshot: Mutex<TransformSnapshot>,
    restore_gate: Mutex<()>,
}

impl Skeleton {
    pub fn new(options: Arc<PoseOptions>) -> Self {
        Self::with_links(options, standard_links())
    }

    pub fn with_links(options: Arc<PoseOptions>, links: Vec<LinkSet>) -> Self {
        Self {
            options,
            links,
            names: NameResolver::new(),
            actor: RwLock::new(None),
            bones: RwLock::default(),
            snapshot: Mutex::default(),
            restore_gate: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &Arc<PoseOptions> {
        &self.options
    }

    /// Binds the skeleton to `actor`, rebuilding the whole bone tree from
    /// the store's description. The previous tree is always dropped first
    /// and its channels released. A `None` actor, or a store with no live
    /// skeleton behind it, leaves this skeleton empty, which is a valid
    /// inert state.
    pub fn set_actor(&self, actor: Option<Actor>) {
        self.clear();
        *self.actor.write() = actor;

        let bound = {
            let actor = self.actor.read();
            actor.as_ref().and_then(|actor| {
                actor.store.describe().map(|description| {
                    (
                        Arc::clone(&actor.store),
                        actor.profile.clone(),
                        description,
                    )
                })
            })
        };
        let Some((store, profile, description)) = bound else {
            return;
        };

        {
            let mut bones = self.bones.write();

            for (index, partial) in description.body.iter().enumerate() {
                add_partial(&mut bones, partial, index, None, &store, &self.options);
                wire_partial(&bones, partial, None);
            }
            if let Some(partial) = &description.main_hand {
                add_partial(&mut bones, partial, 0, Some("mh_"), &store, &self.options);
                wire_partial(&bones, partial, Some("mh_"));
            }
            if let Some(partial) = &description.off_hand {
                add_partial(&mut bones, partial, 0, Some("oh_"), &store, &self.options);
                wire_partial(&bones, partial, Some("oh_"));
            }

            for (name, bone) in bones.iter() {
                for set in self.links.iter().filter(|set| set.applies_to(&profile)) {
                    if !set.contains(name) {
                        continue;
                    }
                    for other in set.others(name) {
                        if let Some(link) = bones.get(other) {
                            bone.add_link(link);
                        }
                    }
                }
            }

            info!("Rebuilt skeleton with {} bones", bones.len());
        }

        // Seed every cache so the first consumer sees real transforms.
        let snapshot = self.take_snapshot();
        for root in self.root_bones() {
            if let Err(error) = root.read_transform(true, Some(&*snapshot)) {
                warn!("Failed to seed bones under '{}': {error}", root.name());
            }
        }
    }

    /// Drops every bone and hands their channels back to the store. The
    /// skeleton stays usable, just empty.
    pub fn clear(&self) {
        let dropped: Vec<Arc<Bone>> = self
            .bones
            .write()
            .drain()
            .map(|(_, bone)| bone)
            .collect();
        for bone in &dropped {
            bone.release_channels();
        }
        self.snapshot.lock().clear();
    }

    /// Finds a bone by name. Legacy pose-file names resolve to their
    /// canonical equivalents, and hairstyle aliases prefer whichever
    /// generated hair bone the current model actually has before falling
    /// back to the fixed hair bones.
    pub fn get_bone(&self, name: &str) -> Option<Arc<Bone>> {
        let bones = self.bones.read();
        if bones.is_empty() {
            return None;
        }

        let name = self.names.modern(name);

        if let Some(alias) = self.names.hair_alias(name) {
            let generated = bones
                .iter()
                .find(|(bone_name, _)| matches_hair_pattern(bone_name, alias.suffix))
                .map(|(_, bone)| Arc::clone(bone));
            if generated.is_some() {
                return generated;
            }
            return alias
                .fallback
                .and_then(|fallback| bones.get(fallback).map(Arc::clone));
        }

        bones.get(name).map(Arc::clone)
    }

    /// Every bone without a parent. Each partial sub-skeleton contributes
    /// its own root.
    pub fn root_bones(&self) -> Vec<Arc<Bone>> {
        self.bones
            .read()
            .values()
            .filter(|bone| bone.parent().is_none())
            .map(Arc::clone)
            .collect()
    }

    pub fn bones(&self) -> Vec<Arc<Bone>> {
        self.bones.read().values().map(Arc::clone).collect()
    }

    pub fn bone_count(&self) -> usize {
        self.bones.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.read().is_empty()
    }

    /// Refreshes bone caches from a fresh snapshot. Does nothing while
    /// posing is disabled. Only subtrees holding at least one pending edit
    /// are walked; inside the walk the per-bone dirty check keeps each
    /// pending edit intact while every clean bone updates.
    pub fn read_transforms(&self) {
        if !self.options.is_enabled() {
            return;
        }

        // A restore in flight owns the caches until its guard drops.
        let _gate = self.restore_gate.lock();

        let snapshot = self.take_snapshot();
        for root in self.root_bones() {
            if !subtree_has_dirty(&root) {
                continue;
            }
            if let Err(error) = root.read_transform(true, Some(&*snapshot)) {
                warn!("Failed to refresh bones under '{}': {error}", root.name());
            }
        }
    }

    /// Reads every bone's model-space transform in one pass with store
    /// read-back off, so the batch sees a single consistent moment. The
    /// backing map is reused between calls; the returned guard keeps it
    /// borrowed for as long as the caller needs it.
    pub fn take_snapshot(&self) -> MutexGuard<'_, TransformSnapshot> {
        let mut snapshot = self.snapshot.lock();
        snapshot.clear();

        let Some(store) = self.store() else {
            return snapshot;
        };

        store.set_readback_all(false);
        {
            let bones = self.bones.read();
            for (name, bone) in bones.iter() {
                if let Some(model) = bone.sample_model(None) {
                    snapshot.insert(name.clone(), model);
                }
            }
        }
        store.set_readback_all(true);

        snapshot
    }

    /// Takes the restore gate. While the returned guard lives the periodic
    /// refresh stands down, so a multi-bone restore can rewrite caches
    /// without a tick clobbering it halfway through.
    pub fn lock_for_restore(&self) -> MutexGuard<'_, ()> {
        self.restore_gate.lock()
    }

    fn store(&self) -> Option<Arc<dyn TransformStore>> {
        self.actor
            .read()
            .as_ref()
            .map(|actor| Arc::clone(&actor.store))
    }
}

fn prefixed(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{name}"),
        None => name.to_string(),
    }
}

/// First construction pass over one group: create each bone, or append the
/// group's channel when another group already created a bone of that name.
fn add_partial(
    bones: &mut HashMap<String, Arc<Bone>>,
    partial: &PartialSkeleton,
    partial_index: usize,
    prefix: Option<&str>,
    store: &Arc<dyn TransformStore>,
    options: &Arc<PoseOptions>,
) {
    for (index, base_name) in partial.bone_names.iter().enumerate() {
        let Some(&channel) = partial.channels.get(index) else {
            warn!("No channel for bone '{base_name}' in group {partial_index}");
            continue;
        };

        let name = prefixed(prefix, base_name);
        let bone = match bones.get(&name) {
            Some(bone) => {
                bone.add_channel(channel);
                Arc::clone(bone)
            }
            None => {
                let bone = Bone::new(
                    name.clone(),
                    partial_index,
                    channel,
                    Arc::clone(store),
                    Arc::clone(options),
                );
                bones.insert(name, Arc::clone(&bone));
                bone
            }
        };

        // Compared before prefixing, so the weapon roots lock too.
        if base_name == "n_root" {
            bone.set_locked(true);
        }
    }
}

/// Second construction pass over one group: wire each bone to its parent.
/// Unresolvable parents are logged and skipped, leaving the bone a root.
fn wire_partial(
    bones: &HashMap<String, Arc<Bone>>,
    partial: &PartialSkeleton,
    prefix: Option<&str>,
) {
    for (index, base_name) in partial.bone_names.iter().enumerate() {
        let Some(&parent_index) = partial.parent_indices.get(index) else {
            continue;
        };
        if parent_index < 0 {
            continue;
        }

        let name = prefixed(prefix, base_name);
        let Some(bone) = bones.get(&name) else {
            continue;
        };
        // The first group to claim a shared bone keeps its parent.
        if bone.parent().is_some() {
            continue;
        }

        let parent_name = match partial.bone_names.get(parent_index as usize) {
            Some(parent_base) => prefixed(prefix, parent_base),
            None => {
                warn!("Parent index {parent_index} out of range for bone '{name}'");
                continue;
            }
        };

        match bones.get(&parent_name) {
            Some(parent) if std::ptr::eq(&**parent, &**bone) || parent.has_ancestor(bone) => {
                warn!("Skipping parent '{parent_name}' of '{name}': would close a cycle");
            }
            Some(parent) => bone.set_parent(Some(parent)),
            None => warn!("Parent bone '{parent_name}' not found for bone '{name}'"),
        }
    }
}

fn subtree_has_dirty(root: &Arc<Bone>) -> bool {
    let mut stack = vec![Arc::clone(root)];
    while let Some(bone) = stack.pop() {
        if bone.is_dirty() {
            return true;
        }
        stack.extend(bone.children());
    }
    false
}
