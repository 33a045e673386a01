//! Runner-side test driver
//!
//! Sits on top of the communicator: subscribes to inbound commands from
//! the application under test, routes each to a collaborator (snapshot
//! sink, UI automator, purchase controller), acknowledges it, and owns the
//! outer deadline that bounds a whole scripted test.

pub mod collaborators;
pub mod driver;
pub mod error;

pub use collaborators::{PurchaseController, SnapshotSink, UiAutomator};
pub use driver::{Disposition, TestDriver, TestOutcome};
pub use error::{Error, Result};
