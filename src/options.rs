use std::sync::atomic::{AtomicBool, Ordering};

use ahash::HashMap;
use parking_lot::Mutex;

/// Per-session posing configuration, shared by reference between the
/// skeleton, its bones and the sync loops.
///
/// The freeze flags express what the external process is told to stop
/// re-animating; a channel can only be edited while it is frozen, since an
/// unfrozen channel would be overwritten on the next animation step. Bones
/// therefore gate their capabilities on these flags plus their own lock.
#[derive(Debug, Default)]
pub struct PoseOptions {
    enabled: AtomicBool,
    freeze_positions: AtomicBool,
    freeze_rotation: AtomicBool,
    freeze_scale: AtomicBool,
    parenting: AtomicBool,
    scale_linked: AtomicBool,
    /// Per-bone mirrored-write opt-outs, keyed by bone name. Absent means
    /// enabled.
    bone_links: Mutex<HashMap<String, bool>>,
}

impl PoseOptions {
    pub fn new() -> Self {
        Self {
            parenting: AtomicBool::new(true),
            scale_linked: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Switches posing on or off. Both directions reset the freeze flags:
    /// position and rotation freezing follow `enabled`, scale freezing goes
    /// off, and hierarchy propagation goes on. Calling with the current
    /// state changes nothing.
    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::AcqRel) == enabled {
            return;
        }

        self.freeze_rotation.store(enabled, Ordering::Release);
        self.freeze_positions.store(enabled, Ordering::Release);
        self.freeze_scale.store(false, Ordering::Release);
        self.parenting.store(true, Ordering::Release);
    }

    pub fn freeze_positions(&self) -> bool {
        self.freeze_positions.load(Ordering::Acquire)
    }

    pub fn set_freeze_positions(&self, frozen: bool) {
        self.freeze_positions.store(frozen, Ordering::Release);
    }

    pub fn freeze_rotation(&self) -> bool {
        self.freeze_rotation.load(Ordering::Acquire)
    }

    pub fn set_freeze_rotation(&self, frozen: bool) {
        self.freeze_rotation.store(frozen, Ordering::Release);
    }

    pub fn freeze_scale(&self) -> bool {
        self.freeze_scale.load(Ordering::Acquire)
    }

    pub fn set_freeze_scale(&self, frozen: bool) {
        self.freeze_scale.store(frozen, Ordering::Release);
    }

    /// Whether a written bone carries its children along (true) or leaves
    /// them where they are in model space (false).
    pub fn parenting(&self) -> bool {
        self.parenting.load(Ordering::Acquire)
    }

    pub fn set_parenting(&self, enabled: bool) {
        self.parenting.store(enabled, Ordering::Release);
    }

    /// Session-wide default for mirroring scale edits onto linked bones.
    /// On by default; attachment bones mirror regardless.
    pub fn scale_linked(&self) -> bool {
        self.scale_linked.load(Ordering::Acquire)
    }

    pub fn set_scale_linked(&self, linked: bool) {
        self.scale_linked.store(linked, Ordering::Release);
    }

    /// Whether mirrored writes are enabled for the bone named `name`.
    /// Defaults to enabled for names never toggled.
    pub fn bone_link_enabled(&self, name: &str) -> bool {
        self.bone_links.lock().get(name).copied().unwrap_or(true)
    }

    pub fn set_bone_link_enabled(&self, name: &str, enabled: bool) {
        self.bone_links.lock().insert(name.to_string(), enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabling_freezes_position_and_rotation_only() {
        let options = PoseOptions::new();
        options.set_freeze_scale(true);
        options.set_parenting(false);

        options.set_enabled(true);
        assert!(options.is_enabled());
        assert!(options.freeze_positions());
        assert!(options.freeze_rotation());
        assert!(!options.freeze_scale());
        assert!(options.parenting());
    }

    #[test]
    fn disabling_releases_the_freezes() {
        let options = PoseOptions::new();
        options.set_enabled(true);
        options.set_enabled(false);
        assert!(!options.freeze_positions());
        assert!(!options.freeze_rotation());
        assert!(!options.freeze_scale());
    }

    #[test]
    fn redundant_enable_keeps_adjusted_flags() {
        let options = PoseOptions::new();
        options.set_enabled(true);
        options.set_freeze_positions(false);

        options.set_enabled(true);
        assert!(
            !options.freeze_positions(),
            "same-state enable must not reset flags"
        );
    }

    #[test]
    fn bone_links_default_on() {
        let options = PoseOptions::new();
        assert!(options.bone_link_enabled("j_f_eye_l"));

        options.set_bone_link_enabled("j_f_eye_l", false);
        assert!(!options.bone_link_enabled("j_f_eye_l"));
        assert!(options.bone_link_enabled("j_f_eye_r"));
    }
}
