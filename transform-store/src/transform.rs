use glam::{Quat, Vec3};

/// A position, rotation and scale triple for a single bone.
///
/// The store always holds these in model space (relative to the character
/// root); consumers convert to parent-relative space themselves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Component-wise comparison within `tolerance`. Quaternions are compared
    /// element by element, not by angular distance, to match the change
    /// detection done on raw store values.
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        self.position.abs_diff_eq(other.position, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && self.rotation.abs_diff_eq(other.rotation, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_default() {
        assert_eq!(Transform::default(), Transform::IDENTITY);
        assert_eq!(Transform::IDENTITY.position, Vec3::ZERO);
        assert_eq!(Transform::IDENTITY.rotation, Quat::IDENTITY);
        assert_eq!(Transform::IDENTITY.scale, Vec3::ONE);
    }

    #[test]
    fn approx_eq_respects_tolerance() {
        let a = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let b = a.with_position(Vec3::new(1.0, 2.0, 3.0 + 1.0e-6));
        assert!(a.approx_eq(&b, 1.0e-5));

        let c = a.with_position(Vec3::new(1.0, 2.0, 3.1));
        assert!(!a.approx_eq(&c, 1.0e-5));
    }

    #[test]
    fn approx_eq_sees_scale_and_rotation() {
        let a = Transform::IDENTITY;
        let rotated = Transform::from_rotation(Quat::from_rotation_z(0.5));
        let scaled = Transform::from_scale(Vec3::splat(2.0));
        assert!(!a.approx_eq(&rotated, 1.0e-5));
        assert!(!a.approx_eq(&scaled, 1.0e-5));
    }
}
