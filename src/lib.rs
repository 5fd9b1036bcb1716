//! Skeletal pose editing against a live external transform store.
//!
//! A [Skeleton](skeleton::Skeleton) mirrors an actor's bone tree, merging
//! the store's partial sub-skeletons (body groups plus prefixed weapon
//! trees) into one name-keyed map. Each [Bone](bone::Bone) caches its
//! transform in local (parent-relative) space; reads convert the store's
//! model-space transforms in, writes convert edits back out, carrying
//! descendants and mirrored link partners along. [PoseSync](sync::PoseSync)
//! runs the two directions on a fixed cadence.

pub mod bone;
pub mod links;
pub mod names;
pub mod options;
pub mod skeleton;
pub mod space;
pub mod sync;

pub mod prelude {
    pub use super::bone::{Bone, BoneCategory, PoseError, TransformSnapshot};
    pub use super::links::{ActorProfile, Gender, LinkSet};
    pub use super::options::PoseOptions;
    pub use super::skeleton::{Actor, Skeleton};
    pub use super::sync::PoseSync;
    pub use glam::{Quat, Vec3};
    pub use transform_store::{Transform, TransformStore};
}
