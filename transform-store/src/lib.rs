//! The boundary between a pose engine and the live process that owns the
//! skeleton it edits: model-space transforms, per-bone store channels with
//! read-back control, and the skeleton description used to rebuild a bone
//! tree. [MirrorStore] is an in-memory implementation for dry-run posing
//! and tests.

mod description;
mod mirror;
mod store;
mod transform;

pub use description::*;
pub use mirror::*;
pub use store::*;
pub use transform::*;
