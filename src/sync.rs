//! Background synchronization: one loop flushing pose edits out to the
//! store, one loop pulling external changes back in.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::Mutex;
use tracing::error;

use crate::{bone::Bone, skeleton::Skeleton};

/// Cadence of both loops. One frame at 60 Hz.
const TICK: Duration = Duration::from_millis(16);

struct Shared {
    skeleton: Arc<Skeleton>,
    active: Mutex<Vec<Arc<Bone>>>,
    running: AtomicBool,
}

impl Shared {
    fn write_tick(&self) {
        if !self.skeleton.options().is_enabled() {
            return;
        }

        let targets = {
            let active = self.active.lock();
            topmost(&active)
        };
        if targets.is_empty() {
            return;
        }

        // Hold the restore gate across the whole flush so a refresh never
        // interleaves with a half-written pose.
        let _gate = self.skeleton.lock_for_restore();
        for bone in targets {
            if let Err(error) = bone.write_transform(true, true) {
                error!("Failed to write pose for '{}': {error}", bone.name());
                self.active.lock().clear();
                return;
            }
        }
    }

    fn read_tick(&self) {
        self.skeleton.read_transforms();
    }
}

/// Drives a [Skeleton] from two plain threads, or from manual ticks for
/// hosts that schedule their own frame loop.
pub struct PoseSync {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PoseSync {
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        Self {
            shared: Arc::new(Shared {
                skeleton,
                active: Mutex::default(),
                running: AtomicBool::new(false),
            }),
            workers: Mutex::default(),
        }
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.shared.skeleton
    }

    /// Replaces the set of bones being edited. Order does not matter; every
    /// write pass reduces the set to topmost ancestors itself.
    pub fn set_active(&self, bones: Vec<Arc<Bone>>) {
        *self.shared.active.lock() = bones;
    }

    pub fn clear_active(&self) {
        self.shared.active.lock().clear();
    }

    pub fn active(&self) -> Vec<Arc<Bone>> {
        self.shared.active.lock().clone()
    }

    /// One pass of the outbound loop: flushes pending edits on the active
    /// set, descendants and linked bones included.
    pub fn write_tick(&self) {
        self.shared.write_tick();
    }

    /// One pass of the inbound loop: refreshes caches from the store.
    pub fn read_tick(&self) {
        self.shared.read_tick();
    }

    /// Spawns the write and read loops. Does nothing if already running.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }

        let writer = {
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || {
                while shared.running.load(Ordering::Acquire) {
                    shared.write_tick();
                    thread::sleep(TICK);
                }
            })
        };
        let reader = {
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || {
                while shared.running.load(Ordering::Acquire) {
                    shared.read_tick();
                    thread::sleep(TICK);
                }
            })
        };

        let mut workers = self.workers.lock();
        workers.push(writer);
        workers.push(reader);
    }

    /// Flags both loops down and joins them.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.join();
        }
    }
}

impl Drop for PoseSync {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drops every bone whose ancestor is also in the set; the ancestor's
/// descending write already carries it.
fn topmost(bones: &[Arc<Bone>]) -> Vec<Arc<Bone>> {
    let mut result = Vec::with_capacity(bones.len());
    for bone in bones {
        let covered = bones
            .iter()
            .any(|other| !Arc::ptr_eq(bone, other) && bone.has_ancestor(other));
        if !covered {
            result.push(Arc::clone(bone));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use transform_store::{MirrorStore, Transform, TransformStore};

    use super::*;
    use crate::{
        links::ActorProfile,
        options::PoseOptions,
        skeleton::Actor,
    };

    fn rig() -> (Arc<MirrorStore>, Arc<Skeleton>, PoseSync) {
        let store = Arc::new(
            MirrorStore::builder()
                .body(&[("n_root", -1), ("j_sebo_a", 0), ("j_kao", 1)])
                .build(),
        );
        let options = Arc::new(PoseOptions::new());
        options.set_enabled(true);

        let skeleton = Arc::new(Skeleton::new(options));
        skeleton.set_actor(Some(Actor {
            store: Arc::clone(&store) as Arc<dyn TransformStore>,
            profile: ActorProfile::default(),
        }));

        let sync = PoseSync::new(Arc::clone(&skeleton));
        (store, skeleton, sync)
    }

    #[test]
    fn edits_flush_on_the_write_tick() {
        let (store, skeleton, sync) = rig();
        let head = skeleton.get_bone("j_kao").unwrap();

        head.set_position(Vec3::new(0.0, 1.0, 0.0));
        sync.set_active(vec![Arc::clone(&head)]);
        sync.write_tick();

        let live = store.live(store.channel("j_kao").unwrap()).unwrap();
        assert_eq!(live.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(
            store.live(store.channel("j_sebo_a").unwrap()).unwrap(),
            Transform::IDENTITY,
            "ancestors stay untouched"
        );
        assert!(!head.is_dirty());
    }

    #[test]
    fn writes_stand_down_while_posing_is_off() {
        let (store, skeleton, sync) = rig();
        let head = skeleton.get_bone("j_kao").unwrap();
        skeleton.options().set_enabled(false);

        head.set_position(Vec3::ONE);
        sync.set_active(vec![Arc::clone(&head)]);
        sync.write_tick();

        assert_eq!(store.write_count(), 0);
        assert!(head.is_dirty());
    }

    #[test]
    fn one_tick_flushes_a_nested_selection_once() {
        let (store, skeleton, sync) = rig();
        let spine = skeleton.get_bone("j_sebo_a").unwrap();
        let head = skeleton.get_bone("j_kao").unwrap();

        spine.set_position(Vec3::new(1.0, 0.0, 0.0));
        head.set_position(Vec3::new(0.0, 1.0, 0.0));
        sync.set_active(vec![Arc::clone(&head), Arc::clone(&spine)]);
        sync.write_tick();

        assert_eq!(
            store.live(store.channel("j_sebo_a").unwrap()).unwrap().position,
            Vec3::new(1.0, 0.0, 0.0)
        );
        assert_eq!(
            store.live(store.channel("j_kao").unwrap()).unwrap().position,
            Vec3::new(1.0, 1.0, 0.0),
            "the spine's write carries the head's edit with it"
        );
        assert!(!spine.is_dirty());
        assert!(!head.is_dirty());
    }

    #[test]
    fn topmost_filter_drops_covered_descendants() {
        let (_store, skeleton, _sync) = rig();
        let root = skeleton.get_bone("n_root").unwrap();
        let spine = skeleton.get_bone("j_sebo_a").unwrap();
        let head = skeleton.get_bone("j_kao").unwrap();

        let reduced = topmost(&[Arc::clone(&head), Arc::clone(&spine)]);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].name(), "j_sebo_a");

        let reduced = topmost(&[Arc::clone(&spine), Arc::clone(&root)]);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].name(), "n_root");

        let reduced = topmost(&[Arc::clone(&head)]);
        assert_eq!(reduced.len(), 1);
    }

    #[test]
    fn failed_writes_clear_the_selection() {
        let (_store, skeleton, sync) = rig();
        let head = skeleton.get_bone("j_kao").unwrap();

        head.set_position(Vec3::ONE);
        sync.set_active(vec![Arc::clone(&head)]);
        head.take_channels();

        sync.write_tick();
        assert!(sync.active().is_empty());
    }

    #[test]
    fn read_tick_pulls_external_changes() {
        let (store, skeleton, sync) = rig();
        let spine = skeleton.get_bone("j_sebo_a").unwrap();
        let head = skeleton.get_bone("j_kao").unwrap();

        head.set_position(Vec3::new(0.0, 2.0, 0.0));

        store.poke(
            store.channel("j_sebo_a").unwrap(),
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
        );
        store.refresh();

        sync.read_tick();
        assert_eq!(spine.position(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(head.position(), Vec3::new(0.0, 2.0, 0.0), "pending edit survives");
    }

    #[test]
    fn start_and_stop_join_cleanly() {
        let (_store, _skeleton, sync) = rig();
        sync.start();
        sync.start();
        sync.stop();
        sync.stop();
    }
}
