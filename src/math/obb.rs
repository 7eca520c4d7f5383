//! Oriented bounding box

use crate::core::types::{Mat4, Quat, Vec3};
use super::{aabb::Aabb, ray::Ray};

/// Box with a center, an orientation and half-extents along its local axes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obb {
    pub center: Vec3,
    pub rotation: Quat,
    pub half_extent: Vec3,
    /// World-to-local transform, cached for ray queries
    world_to_local: Mat4,
}

impl Obb {
    pub fn new(center: Vec3, rotation: Quat, half_extent: Vec3) -> Self {
        let world_to_local = Mat4::from_rotation_translation(rotation, center).inverse();
        Self { center, rotation, half_extent, world_to_local }
    }

    fn local_bounds(&self) -> Aabb {
        Aabb::from_center_half_extent(Vec3::ZERO, self.half_extent)
    }

    /// Distance along `ray` at which it enters the box.
    ///
    /// Rigid transforms preserve length, so the local `t` is the world `t`.
    /// A ray starting inside reports 0.
    pub fn ray_entry(&self, ray: &Ray) -> Option<f32> {
        let local = ray.transform(&self.world_to_local);
        local.intersects_aabb(&self.local_bounds()).map(|(t_near, _)| t_near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_aligned_entry() {
        let obb = Obb::new(Vec3::new(0.0, 0.0, 5.0), Quat::IDENTITY, Vec3::splat(0.5));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let t = obb.ray_entry(&ray).unwrap();
        assert!((t - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_rotated_entry() {
        // Rotated 45 degrees about Y the box presents its corner edge to the ray
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let obb = Obb::new(Vec3::new(0.0, 0.0, 5.0), rotation, Vec3::splat(0.5));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let t = obb.ray_entry(&ray).unwrap();
        assert!((t - (5.0 - 0.5 * std::f32::consts::SQRT_2)).abs() < 1e-4);
    }

    #[test]
    fn test_miss() {
        let obb = Obb::new(Vec3::new(3.0, 0.0, 5.0), Quat::IDENTITY, Vec3::splat(0.5));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(obb.ray_entry(&ray).is_none());
    }
}
