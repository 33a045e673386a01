//! Cross-process test communicator
//!
//! Bidirectional request/response messaging between the test-runner
//! process and the application under test, over loopback HTTP:
//!
//! ```text
//! ┌──────────── Runner ────────────┐      ┌──────────── Target ────────────┐
//! │  Communicator                  │      │  Communicator                  │
//! │    ├── MessageServer /toRunner │◄─────┤    ├── MessageSender           │
//! │    ├── MessageSender           ├─────►│    ├── MessageServer /toParent │
//! │    └── pending completions     │      │    └── pending completions     │
//! └────────────────────────────────┘      └────────────────────────────────┘
//! ```
//!
//! Every outbound `Action` carries a fresh correlation identifier; the
//! peer acknowledges with a `Completed` action wrapping the original, and
//! the awaiting caller resumes with it. Sends are strictly ordered through
//! a single serial worker. Ports are derived deterministically from the
//! parallel-run lane index so cloned simulators never collide.

pub mod action;
pub mod codec;
pub mod communicator;
pub mod config;
pub mod error;
pub mod ports;
pub mod sender;
pub mod server;

pub use action::{Action, CaptureArea, Invocation, Point, Rect};
pub use communicator::Communicator;
pub use config::{Endpoint, HttpConfiguration, Role};
pub use error::{Error, Result};
pub use ports::LaneIndex;
