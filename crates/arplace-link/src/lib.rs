//! Wire protocol and TCP link to the external placement optimizer
//!
//! Connect from the scene owner and drain events at a point of your choosing:
//! ```ignore
//! let (tx, mut rx) = event_queue(100);
//! let link = OptimizerLink::connect("127.0.0.1:8080", Some(tx)).await?;
//! link.send(&Message::StartOptimization);
//! while let Ok(event) = rx.try_recv() { /* ... */ }
//! ```

pub mod connection;
pub mod error;
pub mod frame;
pub mod protocol;

pub use connection::{event_queue, LinkEvent, OptimizerLink};
pub use error::{LinkError, Result};
pub use frame::{encode_frame, FrameDecoder};
pub use protocol::*;

/// Default optimizer address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default capacity of the inbound event queue
pub const DEFAULT_EVENT_CAPACITY: usize = 100;
