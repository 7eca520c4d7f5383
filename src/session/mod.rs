//! Placement session: captures, analysis and the optimizer round-trip
//!
//! A [`Session`] owns all scene state. Commands mutate it synchronously; the
//! optimizer link only enqueues events, which the session drains at a point
//! the caller chooses ([`Session::apply_pending`] or
//! [`Session::await_placement`]).

pub mod config;
pub mod control;
pub mod wire;

pub use config::SessionConfig;
pub use control::{Command, ControlPanel, EdgeTrigger};

use arplace_link::{event_queue, LinkError, LinkEvent, Message, OptimizerLink};
use tokio::sync::mpsc;

use crate::analysis::{compute_obstructions, compute_occlusions, ObstructionSet, Occlusion};
use crate::core::{Error, Result};
use crate::math::{facing_pose, Pose};
use crate::placement::{OptimizerAssignment, Placement, PlacementResolver};
use crate::scene::{Element, EnvironmentLibrary, PhysicalObject, SceneDescription};
use crate::voxel::{GridBuilder, VoxelGrid};

pub struct Session {
    config: SessionConfig,
    builder: GridBuilder,
    /// Live viewer (head) pose
    viewer: Pose,
    source_pose: Pose,
    target_pose: Pose,
    elements: Vec<Element>,
    environments: EnvironmentLibrary,
    /// Objects of the active environment with their live positions
    objects: Vec<PhysicalObject>,
    grid: VoxelGrid,
    occlusions: Vec<Occlusion>,
    obstructions: ObstructionSet,
    link: Option<OptimizerLink>,
    events: Option<mpsc::Receiver<LinkEvent>>,
}

impl Session {
    pub fn new(config: SessionConfig, environments: EnvironmentLibrary, viewer: Pose, elements: Vec<Element>) -> Result<Self> {
        config.validate()?;
        let builder = GridBuilder::new(config.cell_size())?;
        let objects = environments.active().map(|e| e.objects.clone()).unwrap_or_default();
        Ok(Self {
            grid: VoxelGrid::new(builder.cell_size()),
            config,
            builder,
            viewer,
            source_pose: Pose::default(),
            target_pose: Pose::default(),
            elements,
            environments,
            objects,
            occlusions: Vec::new(),
            obstructions: ObstructionSet::new(),
            link: None,
            events: None,
        })
    }

    pub fn from_scene(config: SessionConfig, scene: SceneDescription) -> Result<Self> {
        let (environments, viewer, elements) = scene.into_parts()?;
        Self::new(config, environments, viewer, elements)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn viewer(&self) -> &Pose {
        &self.viewer
    }

    pub fn set_viewer(&mut self, pose: Pose) {
        self.viewer = pose;
    }

    pub fn source_pose(&self) -> &Pose {
        &self.source_pose
    }

    pub fn target_pose(&self) -> &Pose {
        &self.target_pose
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    pub fn objects(&self) -> &[PhysicalObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [PhysicalObject] {
        &mut self.objects
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn occlusions(&self) -> &[Occlusion] {
        &self.occlusions
    }

    pub fn obstructions(&self) -> &ObstructionSet {
        &self.obstructions
    }

    pub fn environments(&self) -> &EnvironmentLibrary {
        &self.environments
    }

    /// Switch environments. The grid is dropped until the next target capture.
    pub fn activate_environment(&mut self, name: &str) -> Result<()> {
        let env = self.environments.activate(name)?;
        self.objects = env.objects.clone();
        self.reset_grid();
        Ok(())
    }

    pub fn clear_environment(&mut self) {
        self.environments.clear();
        self.objects.clear();
        self.reset_grid();
    }

    fn reset_grid(&mut self) {
        self.grid.clear();
        self.occlusions.clear();
        self.obstructions = ObstructionSet::new();
    }

    /// Connect to the configured optimizer address
    pub async fn connect(&mut self) -> Result<()> {
        let addr = self.config.optimizer_addr.clone();
        self.connect_to(&addr).await
    }

    pub async fn connect_to(&mut self, addr: &str) -> Result<()> {
        let (tx, rx) = event_queue(self.config.event_queue_capacity);
        let link = OptimizerLink::connect(addr, Some(tx)).await?;
        self.link = Some(link);
        self.events = Some(rx);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|l| !l.is_closed())
    }

    /// Close the optimizer link, telling the peer first
    pub fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
            log::info!("Disconnected from optimizer at {}", link.peer());
        }
        self.events = None;
    }

    pub fn dispatch(&mut self, command: Command) -> Result<()> {
        log::debug!("Dispatching {:?}", command);
        match command {
            Command::CaptureSource => {
                self.capture_source();
                Ok(())
            }
            Command::CaptureTarget => self.capture_target(),
            Command::Optimize => self.request_optimization(),
        }
    }

    /// Record the source viewer frame and derive every element's footprint
    pub fn capture_source(&mut self) {
        self.source_pose = facing_pose(self.viewer.position, self.viewer.forward());
        let cell_size = self.builder.cell_size();
        for element in &mut self.elements {
            element.capture_source(cell_size, self.config.buffer);
        }
        log::info!("Captured source pose for {} elements", self.elements.len());
    }

    /// Record the target viewer frame and object positions, then rebuild the grid
    pub fn capture_target(&mut self) -> Result<()> {
        self.target_pose = facing_pose(self.viewer.position, self.viewer.forward());
        for object in &mut self.objects {
            object.capture();
        }
        self.occlusions.clear();
        self.obstructions = ObstructionSet::new();

        let containers = self
            .environments
            .active()
            .map(|e| e.containers.as_slice())
            .unwrap_or_default();
        if containers.is_empty() {
            log::warn!("No active environment containers, grid is empty");
        }
        self.builder.rebuild(&mut self.grid, containers)
    }

    /// Recompute occlusion and obstruction from the current viewer and objects
    pub fn refresh_analysis(&mut self) {
        self.occlusions = compute_occlusions(&self.grid, self.viewer.position);
        self.obstructions = compute_obstructions(&self.grid, &self.objects);
        log::debug!(
            "Analysis: {} occlusions, {} obstructed cells",
            self.occlusions.len(),
            self.obstructions.len()
        );
    }

    /// Full scene in send order, ending with START_OPTIMIZATION
    pub fn scene_messages(&self) -> Vec<Message> {
        vec![
            Message::SetParams(self.config.params),
            wire::user_message(&self.target_pose),
            wire::elements_message(&self.elements, &self.source_pose),
            wire::voxels_message(&self.grid, &self.target_pose),
            wire::objects_message(&self.objects),
            wire::obstacles_message(&self.obstructions),
            wire::occlusions_message(&self.occlusions),
            Message::StartOptimization,
        ]
    }

    /// Refresh the analysis and send the scene. Results arrive later as events.
    pub fn request_optimization(&mut self) -> Result<()> {
        match &self.link {
            None => return Err(Error::NotConnected),
            Some(link) if link.is_closed() => return Err(Error::Link(LinkError::Closed)),
            Some(_) => {}
        }
        self.refresh_analysis();

        let messages = self.scene_messages();
        if let Some(link) = &self.link {
            for message in &messages {
                link.send(message);
            }
        }
        log::info!(
            "Optimization requested: {} elements, {} cells",
            self.elements.len(),
            self.grid.len()
        );
        Ok(())
    }

    /// Resolve optimizer assignments and write the element poses
    pub fn place(&mut self, assignments: &[arplace_link::Assignment]) -> Result<Vec<Placement>> {
        let assignments = assignments
            .iter()
            .map(|a| OptimizerAssignment::try_from(*a))
            .collect::<Result<Vec<_>>>()?;
        let resolver = PlacementResolver::new(&self.grid, self.viewer.position);
        let placements = resolver.apply(&mut self.elements, &assignments)?;
        log::info!("Placed {} elements", placements.len());
        Ok(placements)
    }

    /// Drain queued link events without waiting, stopping after the first
    /// RESULTS batch so each call places at most one batch. Returns the
    /// placements made, empty when no batch was queued.
    pub fn apply_pending(&mut self) -> Result<Vec<Placement>> {
        loop {
            let Some(events) = self.events.as_mut() else {
                return Ok(Vec::new());
            };
            let event = match events.try_recv() {
                Ok(event) => event,
                Err(mpsc::error::TryRecvError::Empty) => return Ok(Vec::new()),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.drop_link();
                    return Ok(Vec::new());
                }
            };
            match event {
                LinkEvent::Results(assignments) => return self.place(&assignments),
                LinkEvent::Closed => {
                    self.drop_link();
                    return Ok(Vec::new());
                }
                LinkEvent::Failed(e) => {
                    self.drop_link();
                    return Err(e.into());
                }
            }
        }
    }

    /// Suspend until the optimizer answers, then place. No timeout.
    pub async fn await_placement(&mut self) -> Result<Vec<Placement>> {
        let events = self.events.as_mut().ok_or(Error::NotConnected)?;
        match events.recv().await {
            Some(LinkEvent::Results(assignments)) => self.place(&assignments),
            Some(LinkEvent::Failed(e)) => {
                self.drop_link();
                Err(e.into())
            }
            Some(LinkEvent::Closed) | None => {
                self.drop_link();
                Err(Error::Link(LinkError::Closed))
            }
        }
    }

    fn drop_link(&mut self) {
        if self.link.take().is_some() {
            log::info!("Optimizer link closed");
        }
        self.events = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Quat, Vec3};
    use crate::math::Aabb;
    use crate::scene::{Container, Environment, SurfaceDim};
    use arplace_link::{encode_frame, event_queue, Assignment, FrameDecoder, MessageTag, OcclusionRecord};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn office() -> EnvironmentLibrary {
        let mut env = Environment::new("office");
        env.containers.push(Container::new(
            "wall",
            Vec3::new(1.0, 1.0, 0.0),
            SurfaceDim::Planar,
            Pose::new(Vec3::new(0.0, 1.5, 2.0), Quat::IDENTITY),
        ));
        env.objects.push(PhysicalObject::new(
            "poster",
            0.2,
            Vec3::new(-0.25, 1.25, 2.0),
            Aabb::from_center_half_extent(Vec3::ZERO, Vec3::new(0.25, 0.25, 0.1)),
        ));
        let mut library = EnvironmentLibrary::new(vec![env, Environment::new("empty")]);
        library.activate("office").unwrap();
        library
    }

    fn session() -> Session {
        let config = SessionConfig {
            cell_size: [0.5; 3],
            ..Default::default()
        };
        let elements = vec![
            Element::new("panel", Vec3::new(0.5, 0.5, 0.0), SurfaceDim::Planar)
                .with_requirements(0.8, 0.1, 0.5)
                .with_pose(Pose::new(Vec3::new(0.0, 1.0, 1.0), Quat::IDENTITY)),
        ];
        Session::new(config, office(), Pose::new(Vec3::new(0.0, 1.5, 0.0), Quat::IDENTITY), elements).unwrap()
    }

    #[test]
    fn test_capture_target_rebuilds_grid() {
        let mut s = session();
        s.dispatch(Command::CaptureSource).unwrap();
        assert_eq!(s.elements()[0].footprint(), crate::core::types::UVec3::ONE);

        s.dispatch(Command::CaptureTarget).unwrap();
        assert_eq!(s.grid().len(), 4);

        s.refresh_analysis();
        // Only the cell at (-0.25, 1.25) has its center inside the poster
        assert_eq!(s.obstructions().len(), 1);
        assert!(s.occlusions().is_empty());
    }

    #[test]
    fn test_moved_object_obstructs_at_new_position() {
        let mut s = session();
        s.capture_target().unwrap();
        s.refresh_analysis();
        assert_eq!(s.obstructions().len(), 1);

        // Live moves are ignored until the next target capture
        s.objects_mut()[0].position = Vec3::new(10.0, 1.25, 2.0);
        s.refresh_analysis();
        assert_eq!(s.obstructions().len(), 1);

        s.capture_target().unwrap();
        s.refresh_analysis();
        assert!(s.obstructions().is_empty());

        s.objects_mut()[0].position = Vec3::new(0.25, 1.75, 2.0);
        s.capture_target().unwrap();
        s.refresh_analysis();
        let blocked: Vec<_> = s.obstructions().iter().copied().collect();
        assert_eq!(blocked, vec![crate::voxel::CellKey::new(0, 1, 1, 0)]);
    }

    #[test]
    fn test_apply_pending_places_one_batch_per_call() {
        let mut s = session();
        s.capture_source();
        s.capture_target().unwrap();
        let (tx, rx) = event_queue(4);
        s.events = Some(rx);

        let good = Assignment { element: 0, container: 0, index: [1, 0, 0] };
        let bad = Assignment { element: 7, ..good };
        tx.try_send(LinkEvent::Results(vec![good])).unwrap();
        tx.try_send(LinkEvent::Results(vec![bad])).unwrap();

        let placed = s.apply_pending().unwrap();
        assert_eq!(placed.len(), 1);
        let cell = *s.grid().cell_at(0, crate::core::types::IVec3::new(1, 0, 0)).unwrap();
        assert_eq!(s.elements()[0].pose.position, cell.position);

        assert!(matches!(s.apply_pending(), Err(Error::Placement(_))));
        assert_eq!(s.elements()[0].pose.position, cell.position);
        assert!(s.apply_pending().unwrap().is_empty());
    }

    #[test]
    fn test_optimize_without_link() {
        let mut s = session();
        assert!(matches!(s.dispatch(Command::Optimize), Err(Error::NotConnected)));
    }

    #[test]
    fn test_scene_messages_order() {
        let mut s = session();
        s.capture_source();
        s.capture_target().unwrap();
        let tags: Vec<MessageTag> = s.scene_messages().iter().map(Message::tag).collect();
        assert_eq!(
            tags,
            vec![
                MessageTag::SetParams,
                MessageTag::SetUser,
                MessageTag::SetElements,
                MessageTag::SetVoxels,
                MessageTag::SetObjects,
                MessageTag::SetObstacles,
                MessageTag::SetOcclusions,
                MessageTag::StartOptimization,
            ]
        );
    }

    #[test]
    fn test_switching_environment_drops_grid() {
        let mut s = session();
        s.capture_target().unwrap();
        assert!(!s.grid().is_empty());

        s.activate_environment("empty").unwrap();
        assert!(s.grid().is_empty());
        assert!(s.objects().is_empty());
        s.capture_target().unwrap();
        assert!(s.grid().is_empty());
    }

    /// Decode inbound messages through `rounds` START_OPTIMIZATION frames
    async fn read_rounds(stream: &mut TcpStream, rounds: usize) -> Vec<Message> {
        let mut decoder = FrameDecoder::new();
        let mut chunk = vec![0u8; 4096];
        let mut messages = Vec::new();
        let mut started = 0;
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "scene owner hung up early");
            decoder.push(&chunk[..n]);
            while let Some(payload) = decoder.next_frame().unwrap() {
                let message = Message::decode(&payload).unwrap();
                let done = message.tag() == MessageTag::StartOptimization;
                messages.push(message);
                if done {
                    started += 1;
                    if started == rounds {
                        return messages;
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_optimizer_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let optimizer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let tags: Vec<MessageTag> = read_rounds(&mut stream, 1).await.iter().map(Message::tag).collect();
            let reply = Message::Results(vec![Assignment { element: 0, container: 0, index: [1, 1, 0] }]);
            stream.write_all(&encode_frame(&reply.encode())).await.unwrap();
            (stream, tags)
        });

        let mut s = session();
        s.connect_to(&addr).await.unwrap();
        assert!(s.is_connected());
        s.dispatch(Command::CaptureSource).unwrap();
        s.dispatch(Command::CaptureTarget).unwrap();
        s.dispatch(Command::Optimize).unwrap();

        let placements = s.await_placement().await.unwrap();
        let (_stream, tags) = optimizer.await.unwrap();
        assert_eq!(tags.len(), 8);
        assert_eq!(tags[0], MessageTag::SetParams);

        assert_eq!(placements.len(), 1);
        assert!(placements[0].snap);
        let cell = s.grid().cell_at(0, crate::core::types::IVec3::new(1, 1, 0)).unwrap();
        assert_eq!(s.elements()[0].pose.position, cell.position);
    }

    #[tokio::test]
    async fn test_each_optimize_sends_fresh_analysis() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let optimizer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let sent: Vec<Vec<OcclusionRecord>> = read_rounds(&mut stream, 2)
                .await
                .into_iter()
                .filter_map(|m| match m {
                    Message::SetOcclusions(records) => Some(records),
                    _ => None,
                })
                .collect();
            (stream, sent)
        });

        let mut s = session();
        s.connect_to(&addr).await.unwrap();
        s.dispatch(Command::CaptureSource).unwrap();
        s.dispatch(Command::CaptureTarget).unwrap();

        // Facing the wall head on, no cell hides another
        s.dispatch(Command::Optimize).unwrap();
        assert!(s.occlusions().is_empty());

        // Looking along the wall, each near cell hides its row neighbour
        s.set_viewer(Pose::new(Vec3::new(-3.0, 1.25, 2.0), Quat::IDENTITY));
        s.dispatch(Command::Optimize).unwrap();
        assert!(!s.occlusions().is_empty());

        let (_stream, sent) = optimizer.await.unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].is_empty());
        assert_eq!(sent[1].len(), s.occlusions().len());
        assert_ne!(sent[0], sent[1]);
        let near = arplace_link::CellRef { container: 0, index: [0, 0, 0] };
        let far = arplace_link::CellRef { container: 0, index: [1, 0, 0] };
        assert!(sent[1].contains(&OcclusionRecord { near, occluded: far }));
    }

    #[tokio::test]
    async fn test_peer_close_ends_wait() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let optimizer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(&encode_frame(&Message::Close.encode())).await.unwrap();
            stream
        });

        let mut s = session();
        s.connect_to(&addr).await.unwrap();
        let _stream = optimizer.await.unwrap();

        assert!(matches!(s.await_placement().await, Err(Error::Link(LinkError::Closed))));
        assert!(!s.is_connected());
        assert!(matches!(s.dispatch(Command::Optimize), Err(Error::NotConnected)));
    }
}
