//! Conversions between model space (root-relative, as held by the store) and
//! local space (parent-relative, as cached on each bone).
//!
//! Scale is deliberately not part of either conversion: composing scale down
//! the chain would compound into shear across generations, so every bone's
//! scale stands alone and only rides along unchanged.

use transform_store::Transform;

/// Converts a parent-relative transform into model space by applying the
/// parent's model-space rotation and translation.
pub fn local_to_model(local: &Transform, parent: &Transform) -> Transform {
    let parent_rotation = parent.rotation.normalize();
    Transform {
        position: parent.position + parent_rotation * local.position,
        rotation: (parent_rotation * local.rotation).normalize(),
        scale: local.scale,
    }
}

/// Converts a model-space transform into the parent-relative space of
/// `parent` by un-applying the parent's rotation and translation.
pub fn model_to_local(model: &Transform, parent: &Transform) -> Transform {
    let inverse = parent.rotation.normalize().inverse();
    Transform {
        position: inverse * (model.position - parent.position),
        rotation: (inverse * model.rotation.normalize()).normalize(),
        scale: model.scale,
    }
}
