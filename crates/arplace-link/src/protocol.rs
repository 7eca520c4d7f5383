//! Optimizer protocol - message tags, records and payload codecs
//!
//! All numeric fields are little-endian; floats are IEEE-754 `f32`,
//! integers are `i32`. Counts and identifier lengths are `i32` as well.

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// One-byte message tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    /// Frame marker, never a message type
    Header = 0,
    Close = 1,
    SetParams = 2,
    SetElements = 3,
    SetVoxels = 4,
    SetObjects = 5,
    SetOcclusions = 6,
    SetUser = 7,
    SetObstacles = 8,
    StartOptimization = 9,
    Results = 10,
}

impl TryFrom<u8> for MessageTag {
    type Error = LinkError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Header,
            1 => Self::Close,
            2 => Self::SetParams,
            3 => Self::SetElements,
            4 => Self::SetVoxels,
            5 => Self::SetObjects,
            6 => Self::SetOcclusions,
            7 => Self::SetUser,
            8 => Self::SetObstacles,
            9 => Self::StartOptimization,
            10 => Self::Results,
            other => return Err(LinkError::UnknownTag(other)),
        })
    }
}

/// Objective weights and thresholds, sent in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerParams {
    pub semantic: f32,
    pub compatibility: f32,
    pub utility: f32,
    pub consistency: f32,
    pub structure: f32,
    pub occlusion: f32,
    pub utility_spatial: f32,
    pub utility_object: f32,
    pub utility_max: f32,
    pub utility_compatibility: f32,
    pub compatibility_visibility: f32,
    pub compatibility_touch: f32,
    pub anchor_weight: f32,
    pub avoid_weight: f32,
    pub anchor_threshold: f32,
    pub avoid_threshold: f32,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            semantic: 1.0,
            compatibility: 1.0,
            utility: 1.0,
            consistency: 1.0,
            structure: 1.0,
            occlusion: 1.0,
            utility_spatial: 1.0,
            utility_object: 1.0,
            utility_max: 1.0,
            utility_compatibility: 1.0,
            compatibility_visibility: 1.0,
            compatibility_touch: 1.0,
            anchor_weight: 1.0,
            avoid_weight: 1.0,
            anchor_threshold: 0.5,
            avoid_threshold: 0.5,
        }
    }
}

impl OptimizerParams {
    pub fn to_array(&self) -> [f32; 16] {
        [
            self.semantic,
            self.compatibility,
            self.utility,
            self.consistency,
            self.structure,
            self.occlusion,
            self.utility_spatial,
            self.utility_object,
            self.utility_max,
            self.utility_compatibility,
            self.compatibility_visibility,
            self.compatibility_touch,
            self.anchor_weight,
            self.avoid_weight,
            self.anchor_threshold,
            self.avoid_threshold,
        ]
    }

    pub fn from_array(v: [f32; 16]) -> Self {
        Self {
            semantic: v[0],
            compatibility: v[1],
            utility: v[2],
            consistency: v[3],
            structure: v[4],
            occlusion: v[5],
            utility_spatial: v[6],
            utility_object: v[7],
            utility_max: v[8],
            utility_compatibility: v[9],
            compatibility_visibility: v[10],
            compatibility_touch: v[11],
            anchor_weight: v[12],
            avoid_weight: v[13],
            anchor_threshold: v[14],
            avoid_threshold: v[15],
        }
    }
}

/// Viewer frame in world space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UserFrame {
    pub position: [f32; 3],
    pub forward: [f32; 3],
    pub up: [f32; 3],
    pub right: [f32; 3],
}

/// Element awaiting placement
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub id: String,
    pub dimension: i32,
    pub visibility: f32,
    pub touch: f32,
    pub utility: f32,
    /// Position in the source-session viewer frame
    pub position: [f32; 3],
    /// Footprint in cells
    pub size: [i32; 3],
}

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRecord {
    pub index: [i32; 3],
    pub dimension: i32,
    /// Position in the target-session viewer frame
    pub relative_position: [f32; 3],
    pub position: [f32; 3],
    pub forward: [f32; 3],
}

/// Cells of one container, row-major in (x, y, z)
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    pub dims: [i32; 3],
    pub cells: Vec<VoxelRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub id: String,
    pub utility: f32,
    pub position: [f32; 3],
}

/// Reference to a cell by container and index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub container: i32,
    pub index: [i32; 3],
}

/// `occluded` lies behind `near` as seen from the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OcclusionRecord {
    pub near: CellRef,
    pub occluded: CellRef,
}

/// Anchor cell chosen by the optimizer for one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub element: i32,
    pub container: i32,
    pub index: [i32; 3],
}

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Close,
    SetParams(OptimizerParams),
    SetElements(Vec<ElementRecord>),
    SetVoxels(Vec<ContainerRecord>),
    SetObjects(Vec<ObjectRecord>),
    SetOcclusions(Vec<OcclusionRecord>),
    SetUser(UserFrame),
    SetObstacles(Vec<CellRef>),
    StartOptimization,
    Results(Vec<Assignment>),
}

impl Message {
    pub fn tag(&self) -> MessageTag {
        match self {
            Self::Close => MessageTag::Close,
            Self::SetParams(_) => MessageTag::SetParams,
            Self::SetElements(_) => MessageTag::SetElements,
            Self::SetVoxels(_) => MessageTag::SetVoxels,
            Self::SetObjects(_) => MessageTag::SetObjects,
            Self::SetOcclusions(_) => MessageTag::SetOcclusions,
            Self::SetUser(_) => MessageTag::SetUser,
            Self::SetObstacles(_) => MessageTag::SetObstacles,
            Self::StartOptimization => MessageTag::StartOptimization,
            Self::Results(_) => MessageTag::Results,
        }
    }

    /// Encode to a payload (tag byte first), ready for [`crate::encode_frame`]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::new(self.tag());
        match self {
            Self::Close | Self::StartOptimization => {}
            Self::SetParams(params) => {
                for v in params.to_array() {
                    w.f32(v);
                }
            }
            Self::SetElements(elements) => {
                w.count(elements.len());
                for e in elements {
                    w.id(&e.id);
                    w.i32(e.dimension);
                    w.f32(e.visibility);
                    w.f32(e.touch);
                    w.f32(e.utility);
                    w.vec3(e.position);
                    w.ivec3(e.size);
                }
            }
            Self::SetVoxels(containers) => {
                w.count(containers.len());
                for c in containers {
                    w.ivec3(c.dims);
                    for cell in &c.cells {
                        w.ivec3(cell.index);
                        w.i32(cell.dimension);
                        w.vec3(cell.relative_position);
                        w.vec3(cell.position);
                        w.vec3(cell.forward);
                    }
                }
            }
            Self::SetObjects(objects) => {
                w.count(objects.len());
                for o in objects {
                    w.id(&o.id);
                    w.f32(o.utility);
                    w.vec3(o.position);
                }
            }
            Self::SetOcclusions(occlusions) => {
                w.count(occlusions.len());
                for o in occlusions {
                    w.cell(o.near);
                    w.cell(o.occluded);
                }
            }
            Self::SetUser(user) => {
                w.vec3(user.position);
                w.vec3(user.forward);
                w.vec3(user.up);
                w.vec3(user.right);
            }
            Self::SetObstacles(cells) => {
                w.count(cells.len());
                for c in cells {
                    w.cell(*c);
                }
            }
            Self::Results(assignments) => {
                w.count(assignments.len());
                for a in assignments {
                    w.i32(a.element);
                    w.i32(a.container);
                    w.ivec3(a.index);
                }
            }
        }
        w.finish()
    }

    /// Decode a payload. Short or over-long payloads are rejected.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(payload);
        let tag = MessageTag::try_from(r.u8()?)?;

        let message = match tag {
            MessageTag::Header => return Err(LinkError::UnknownTag(MessageTag::Header as u8)),
            MessageTag::Close => Self::Close,
            MessageTag::StartOptimization => Self::StartOptimization,
            MessageTag::SetParams => {
                let mut v = [0.0f32; 16];
                for slot in &mut v {
                    *slot = r.f32()?;
                }
                Self::SetParams(OptimizerParams::from_array(v))
            }
            MessageTag::SetElements => {
                let n = r.count()?;
                let mut elements = Vec::with_capacity(n.min(r.remaining()));
                for _ in 0..n {
                    elements.push(ElementRecord {
                        id: r.id()?,
                        dimension: r.i32()?,
                        visibility: r.f32()?,
                        touch: r.f32()?,
                        utility: r.f32()?,
                        position: r.vec3()?,
                        size: r.ivec3()?,
                    });
                }
                Self::SetElements(elements)
            }
            MessageTag::SetVoxels => {
                let n = r.count()?;
                let mut containers = Vec::with_capacity(n.min(r.remaining()));
                for _ in 0..n {
                    let dims = r.ivec3()?;
                    let mut total = 1usize;
                    for d in dims {
                        if d < 0 {
                            return Err(LinkError::NegativeCount(d));
                        }
                        total = total.saturating_mul(d as usize);
                    }
                    let mut cells = Vec::with_capacity(total.min(r.remaining()));
                    for _ in 0..total {
                        cells.push(VoxelRecord {
                            index: r.ivec3()?,
                            dimension: r.i32()?,
                            relative_position: r.vec3()?,
                            position: r.vec3()?,
                            forward: r.vec3()?,
                        });
                    }
                    containers.push(ContainerRecord { dims, cells });
                }
                Self::SetVoxels(containers)
            }
            MessageTag::SetObjects => {
                let n = r.count()?;
                let mut objects = Vec::with_capacity(n.min(r.remaining()));
                for _ in 0..n {
                    objects.push(ObjectRecord {
                        id: r.id()?,
                        utility: r.f32()?,
                        position: r.vec3()?,
                    });
                }
                Self::SetObjects(objects)
            }
            MessageTag::SetOcclusions => {
                let n = r.count()?;
                let mut occlusions = Vec::with_capacity(n.min(r.remaining()));
                for _ in 0..n {
                    occlusions.push(OcclusionRecord {
                        near: r.cell()?,
                        occluded: r.cell()?,
                    });
                }
                Self::SetOcclusions(occlusions)
            }
            MessageTag::SetUser => Self::SetUser(UserFrame {
                position: r.vec3()?,
                forward: r.vec3()?,
                up: r.vec3()?,
                right: r.vec3()?,
            }),
            MessageTag::SetObstacles => {
                let n = r.count()?;
                let mut cells = Vec::with_capacity(n.min(r.remaining()));
                for _ in 0..n {
                    cells.push(r.cell()?);
                }
                Self::SetObstacles(cells)
            }
            MessageTag::Results => {
                let n = r.count()?;
                let mut assignments = Vec::with_capacity(n.min(r.remaining()));
                for _ in 0..n {
                    assignments.push(Assignment {
                        element: r.i32()?,
                        container: r.i32()?,
                        index: r.ivec3()?,
                    });
                }
                Self::Results(assignments)
            }
        };

        r.finish()?;
        Ok(message)
    }
}

struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    fn new(tag: MessageTag) -> Self {
        Self { buf: vec![tag as u8] }
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn count(&mut self, n: usize) {
        self.i32(n as i32);
    }

    fn vec3(&mut self, v: [f32; 3]) {
        for c in v {
            self.f32(c);
        }
    }

    fn ivec3(&mut self, v: [i32; 3]) {
        for c in v {
            self.i32(c);
        }
    }

    fn id(&mut self, id: &str) {
        self.count(id.len());
        self.buf.extend_from_slice(id.as_bytes());
    }

    fn cell(&mut self, cell: CellRef) {
        self.i32(cell.container);
        self.ivec3(cell.index);
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(LinkError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn word(&mut self) -> Result<[u8; 4]> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.take(4)?);
        Ok(word)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.word()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.word()?))
    }

    fn count(&mut self) -> Result<usize> {
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| LinkError::NegativeCount(n))
    }

    fn vec3(&mut self) -> Result<[f32; 3]> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    fn ivec3(&mut self) -> Result<[i32; 3]> {
        Ok([self.i32()?, self.i32()?, self.i32()?])
    }

    fn id(&mut self) -> Result<String> {
        let len = self.count()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| LinkError::InvalidId)
    }

    fn cell(&mut self) -> Result<CellRef> {
        Ok(CellRef {
            container: self.i32()?,
            index: self.ivec3()?,
        })
    }

    fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(LinkError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_elements() -> Vec<ElementRecord> {
        vec![
            ElementRecord {
                id: "Element-0".into(),
                dimension: 2,
                visibility: 0.8,
                touch: 0.1,
                utility: 0.5,
                position: [0.25, 1.5, -0.75],
                size: [3, 2, 1],
            },
            ElementRecord {
                id: "Element-1".into(),
                dimension: 3,
                visibility: 0.3,
                touch: 0.9,
                utility: 1.0,
                position: [1.0 / 3.0, -2.0, 0.1],
                size: [1, 1, 2],
            },
        ]
    }

    #[test]
    fn test_elements_round_trip() {
        let sent = sample_elements();
        let payload = Message::SetElements(sent.clone()).encode();
        assert_eq!(payload[0], MessageTag::SetElements as u8);

        let Message::SetElements(received) = Message::decode(&payload).unwrap() else {
            panic!("wrong message kind");
        };
        assert_eq!(received.len(), 2);
        for (a, b) in sent.iter().zip(&received) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.dimension, b.dimension);
            assert_eq!(a.size, b.size);
            for i in 0..3 {
                assert_eq!(a.position[i].to_bits(), b.position[i].to_bits());
            }
        }
    }

    #[test]
    fn test_elements_byte_layout() {
        let payload = Message::SetElements(vec![ElementRecord {
            id: "ab".into(),
            dimension: 2,
            visibility: 1.0,
            touch: 0.0,
            utility: 0.5,
            position: [0.0; 3],
            size: [1, 1, 1],
        }])
        .encode();
        // tag + count + (len + "ab") + dim + 3 floats + 3 floats + 3 ints
        assert_eq!(payload.len(), 1 + 4 + 4 + 2 + 4 + 12 + 12 + 12);
        assert_eq!(&payload[1..5], &1i32.to_le_bytes());
        assert_eq!(&payload[5..9], &2i32.to_le_bytes());
        assert_eq!(&payload[9..11], b"ab");
    }

    #[test]
    fn test_results_parse() {
        let mut payload = vec![MessageTag::Results as u8];
        payload.extend_from_slice(&2i32.to_le_bytes());
        for v in [1, 0, 2, 3, 0, 0, 1, 4, 5, 6] {
            payload.extend_from_slice(&(v as i32).to_le_bytes());
        }

        let message = Message::decode(&payload).unwrap();
        assert_eq!(
            message,
            Message::Results(vec![
                Assignment { element: 1, container: 0, index: [2, 3, 0] },
                Assignment { element: 0, container: 1, index: [4, 5, 6] },
            ])
        );
    }

    #[test]
    fn test_truncated_results_rejected() {
        let full = Message::Results(vec![
            Assignment { element: 0, container: 0, index: [0, 0, 0] },
            Assignment { element: 1, container: 0, index: [1, 0, 0] },
        ])
        .encode();
        let short = &full[..full.len() - 3];
        assert!(matches!(
            Message::decode(short),
            Err(LinkError::Truncated { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut payload = Message::StartOptimization.encode();
        payload.push(0);
        assert!(matches!(
            Message::decode(&payload),
            Err(LinkError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut payload = vec![MessageTag::SetObstacles as u8];
        payload.extend_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            Message::decode(&payload),
            Err(LinkError::NegativeCount(-1))
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(matches!(Message::decode(&[42]), Err(LinkError::UnknownTag(42))));
        assert!(matches!(Message::decode(&[0]), Err(LinkError::UnknownTag(0))));
    }

    #[test]
    fn test_params_order() {
        let params = OptimizerParams {
            semantic: 1.0,
            avoid_threshold: 16.0,
            ..Default::default()
        };
        let payload = Message::SetParams(params).encode();
        assert_eq!(payload.len(), 1 + 16 * 4);
        assert_eq!(&payload[1..5], &1.0f32.to_le_bytes());
        assert_eq!(&payload[61..65], &16.0f32.to_le_bytes());
    }

    #[test]
    fn test_voxels_cell_count_from_dims() {
        let cells = (0..2)
            .map(|x| VoxelRecord {
                index: [x, 0, 0],
                dimension: 2,
                relative_position: [x as f32, 0.0, 1.0],
                position: [x as f32, 1.0, 2.0],
                forward: [0.0, 0.0, 1.0],
            })
            .collect();
        let sent = vec![ContainerRecord { dims: [2, 1, 1], cells }];
        let payload = Message::SetVoxels(sent.clone()).encode();
        assert_eq!(payload.len(), 1 + 4 + 12 + 2 * (16 + 36));
        assert_eq!(Message::decode(&payload).unwrap(), Message::SetVoxels(sent));
    }
}
