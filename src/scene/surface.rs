//! Surface dimensionality tag shared by containers, cells and elements

use serde::{Deserialize, Serialize};

/// Planar strip (2) or volumetric region (3)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum SurfaceDim {
    Planar = 2,
    Volumetric = 3,
}

impl SurfaceDim {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_planar(self) -> bool {
        self == Self::Planar
    }
}

impl TryFrom<i32> for SurfaceDim {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Planar),
            3 => Ok(Self::Volumetric),
            other => Err(format!("surface dimension must be 2 or 3, got {}", other)),
        }
    }
}

impl From<SurfaceDim> for i32 {
    fn from(dim: SurfaceDim) -> i32 {
        dim.as_i32()
    }
}
