//! Poses and the grid sizing helpers shared by voxelizer and resolver
//!
//! Frames follow the convention local +X = right, +Y = up, +Z = forward.

use serde::{Deserialize, Serialize};

use crate::core::types::{Mat3, Quat, Vec3};

/// Position plus orientation, no scale
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default = "identity")]
    pub rotation: Quat,
}

fn identity() -> Quat {
    Quat::IDENTITY
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` looking along `forward` with `up` as the up hint
    pub fn looking(position: Vec3, forward: Vec3, up: Vec3) -> Self {
        Self::new(position, look_rotation(forward, up))
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local point to world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// World point into this pose's local frame
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }
}

/// Rotation mapping +Z onto `forward` and keeping +Y as close to `up` as possible.
///
/// A zero forward gives the identity. When `forward` is parallel to `up`, an
/// arbitrary perpendicular is used for the right axis.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let f = forward.normalize_or_zero();
    if f == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let r = up.cross(f);
    let r = if r.length_squared() > 1e-12 {
        r.normalize()
    } else {
        f.any_orthonormal_vector()
    };
    let u = f.cross(r);
    Quat::from_mat3(&Mat3::from_cols(r, u, f)).normalize()
}

/// Yaw-only pose: forward flattened onto the horizontal plane, world up.
pub fn facing_pose(position: Vec3, forward: Vec3) -> Pose {
    let flat = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    if flat == Vec3::ZERO {
        log::warn!("Viewer is looking straight up or down, facing pose falls back to +Z");
        return Pose::new(position, Quat::IDENTITY);
    }
    Pose::looking(position, flat, Vec3::Y)
}

/// Cells along one axis: nearest integer of `extent / cell`, at least 1.
///
/// Ties round to even so counts agree with the optimizer side.
pub fn cell_count(extent: f32, cell: f32) -> u32 {
    let n = (extent / cell).round_ties_even();
    if n >= 1.0 { n as u32 } else { 1 }
}

/// Index offset centering `count` cells on the origin:
/// `floor(count/2) - 0.5 * ((count + 1) mod 2)`
pub fn centering_offset(count: u32) -> f32 {
    (count / 2) as f32 - 0.5 * ((count + 1) % 2) as f32
}
