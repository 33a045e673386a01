//! Collaborator seams consumed by the driver
//!
//! The messaging core only guarantees ordered, correlated delivery; what a
//! command *does* is the business of these collaborators. The real
//! implementations wrap a snapshot-testing library, a platform
//! accessibility API, and a StoreKit test session, none of which belong in
//! this crate.

use uiharness_communicator::{CaptureArea, Point};

use crate::error::Result;

/// Receives screenshot and value assertions
pub trait SnapshotSink: Send + Sync {
    /// Capture the given area and compare it against the named reference
    fn assert_image(
        &self,
        test_name: &str,
        precision: f32,
        capture_area: CaptureArea,
    ) -> Result<()>;

    /// Compare a serialized value against the named reference
    fn assert_value(&self, test_name: &str, value: &str) -> Result<()>;
}

/// Executes UI actions against the application under test
pub trait UiAutomator: Send + Sync {
    fn touch(&self, point: Point) -> Result<()>;
    fn type_text(&self, text: &str) -> Result<()>;
    fn swipe_down(&self) -> Result<()>;
    fn springboard(&self) -> Result<()>;
    fn relaunch(&self) -> Result<()>;
}

/// Drives simulated purchase state
pub trait PurchaseController: Send + Sync {
    fn activate_subscription(&self, product_identifier: &str) -> Result<()>;
    fn expire_subscription(&self, product_identifier: &str) -> Result<()>;
    fn fail_transactions(&self) -> Result<()>;
}
