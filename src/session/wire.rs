//! Scene state to protocol records

use arplace_link::{
    CellRef, ContainerRecord, ElementRecord, Message, ObjectRecord, OcclusionRecord, UserFrame,
    VoxelRecord,
};

use crate::analysis::{ObstructionSet, Occlusion};
use crate::math::Pose;
use crate::scene::{Element, PhysicalObject};
use crate::voxel::{CellKey, VoxelGrid};

fn cell_ref(key: &CellKey) -> CellRef {
    CellRef {
        container: key.container as i32,
        index: key.index().as_ivec3().to_array(),
    }
}

/// SET_USER from a pose's position and axes
pub fn user_message(pose: &Pose) -> Message {
    Message::SetUser(UserFrame {
        position: pose.position.to_array(),
        forward: pose.forward().to_array(),
        up: pose.up().to_array(),
        right: pose.right().to_array(),
    })
}

/// SET_ELEMENTS with source positions expressed in the source viewer frame.
/// The optimizer refers back to each element by its index in this list.
pub fn elements_message(elements: &[Element], source: &Pose) -> Message {
    Message::SetElements(
        elements
            .iter()
            .map(|e| ElementRecord {
                id: e.name.clone(),
                dimension: e.dimension.as_i32(),
                visibility: e.visibility,
                touch: e.touch,
                utility: e.utility,
                position: source.inverse_transform_point(e.source_position()).to_array(),
                size: e.footprint().as_ivec3().to_array(),
            })
            .collect(),
    )
}

/// SET_VOXELS, container by container in row-major cell order
pub fn voxels_message(grid: &VoxelGrid, target: &Pose) -> Message {
    let containers = (0..grid.container_count())
        .filter_map(|c| {
            let dims = grid.container_dims(c)?;
            let cells = grid
                .container_cells(c)
                .iter()
                .map(|cell| VoxelRecord {
                    index: cell.key.index().as_ivec3().to_array(),
                    dimension: cell.dimension.as_i32(),
                    relative_position: target.inverse_transform_point(cell.position).to_array(),
                    position: cell.position.to_array(),
                    forward: cell.forward().to_array(),
                })
                .collect();
            Some(ContainerRecord {
                dims: dims.as_ivec3().to_array(),
                cells,
            })
        })
        .collect();
    Message::SetVoxels(containers)
}

/// SET_OBJECTS with the positions captured for the target session
pub fn objects_message(objects: &[PhysicalObject]) -> Message {
    Message::SetObjects(
        objects
            .iter()
            .map(|o| ObjectRecord {
                id: o.name.clone(),
                utility: o.utility,
                position: o.captured_position().to_array(),
            })
            .collect(),
    )
}

pub fn obstacles_message(obstructions: &ObstructionSet) -> Message {
    Message::SetObstacles(obstructions.iter().map(cell_ref).collect())
}

pub fn occlusions_message(occlusions: &[Occlusion]) -> Message {
    Message::SetOcclusions(
        occlusions
            .iter()
            .map(|o| OcclusionRecord {
                near: cell_ref(&o.near),
                occluded: cell_ref(&o.occluded),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Quat, Vec3};
    use crate::math::Aabb;
    use crate::scene::{Container, SurfaceDim};
    use crate::voxel::GridBuilder;

    #[test]
    fn test_element_position_relative_to_source() {
        let source = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(std::f32::consts::PI));
        let mut element = Element::new("clock", Vec3::splat(0.1), SurfaceDim::Volumetric)
            .with_pose(Pose::new(Vec3::new(1.0, 1.0, -2.0), Quat::IDENTITY));
        element.capture_source(Vec3::splat(0.1), 0.0);

        let Message::SetElements(records) = elements_message(&[element], &source) else {
            panic!("expected SET_ELEMENTS");
        };
        assert_eq!(records[0].id, "clock");
        assert_eq!(records[0].dimension, 3);
        assert_eq!(records[0].size, [1, 1, 1]);
        // Half a turn about y flips the local z axis
        let p = Vec3::from_array(records[0].position);
        assert!((p - Vec3::new(0.0, 1.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_voxels_in_arena_order() {
        let wall = Container::new("wall", Vec3::new(1.0, 0.5, 0.0), SurfaceDim::Planar, Pose::default());
        let grid = GridBuilder::new(Vec3::splat(0.5)).unwrap().build(&[wall]).unwrap();
        let target = Pose::new(Vec3::new(0.0, 0.0, -1.0), Quat::IDENTITY);

        let Message::SetVoxels(containers) = voxels_message(&grid, &target) else {
            panic!("expected SET_VOXELS");
        };
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].dims, [2, 1, 1]);
        assert_eq!(containers[0].cells[1].index, [1, 0, 0]);
        assert_eq!(containers[0].cells[1].relative_position, [0.25, 0.0, 1.0]);
        assert_eq!(containers[0].cells[1].forward, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_objects_use_captured_position() {
        let mut lamp = PhysicalObject::new("lamp", 0.3, Vec3::ONE, Aabb::new(Vec3::ZERO, Vec3::splat(2.0)));
        lamp.position = Vec3::splat(5.0);
        let Message::SetObjects(records) = objects_message(&[lamp]) else {
            panic!("expected SET_OBJECTS");
        };
        assert_eq!(records[0].position, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_user_frame_axes() {
        let Message::SetUser(frame) = user_message(&Pose::default()) else {
            panic!("expected SET_USER");
        };
        assert_eq!(frame.forward, [0.0, 0.0, 1.0]);
        assert_eq!(frame.up, [0.0, 1.0, 0.0]);
        assert_eq!(frame.right, [1.0, 0.0, 0.0]);
    }
}
