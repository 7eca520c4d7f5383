//! Scene model: containers, physical objects, elements and environments

pub mod container;
pub mod description;
pub mod element;
pub mod environment;
pub mod object;
pub mod surface;

pub use container::Container;
pub use description::SceneDescription;
pub use element::Element;
pub use environment::{Environment, EnvironmentLibrary};
pub use object::PhysicalObject;
pub use surface::SurfaceDim;
