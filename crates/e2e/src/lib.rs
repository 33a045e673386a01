//! Test support for the integration suite
//!
//! Builds in-process Runner/Target communicator pairs on a given lane and
//! provides recording collaborator doubles for the driver.

use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use uiharness_communicator::{
    CaptureArea, Communicator, HttpConfiguration, LaneIndex, Point, Result, Role,
};
use uiharness_driver::{PurchaseController, SnapshotSink, UiAutomator};

/// Initialize tracing once per test binary
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Both sides of one test lane, started and ready
pub struct CommunicatorPair {
    pub runner: Arc<Communicator>,
    pub parent: Arc<Communicator>,
}

/// Start a Runner/Target communicator pair on the given lane.
///
/// Each test uses its own lane so concurrently running tests never share
/// ports — the same partitioning parallel simulator clones rely on.
pub async fn start_pair(lane: u16) -> Result<CommunicatorPair> {
    let config = HttpConfiguration::for_lane(LaneIndex::new(lane))?;

    let runner = Arc::new(Communicator::new(Role::Runner, config));
    let parent = Arc::new(Communicator::new(Role::Parent, config));
    runner.start().await?;
    parent.start().await?;

    Ok(CommunicatorPair { runner, parent })
}

/// Collaborator double that records every call in order
#[derive(Default)]
pub struct Recording {
    events: Mutex<Vec<String>>,
}

impl Recording {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl SnapshotSink for Recording {
    fn assert_image(
        &self,
        test_name: &str,
        precision: f32,
        capture_area: CaptureArea,
    ) -> uiharness_driver::Result<()> {
        self.record(format!("assert:{test_name}:{precision}:{capture_area:?}"));
        Ok(())
    }

    fn assert_value(&self, test_name: &str, value: &str) -> uiharness_driver::Result<()> {
        self.record(format!("assertValue:{test_name}:{value}"));
        Ok(())
    }
}

impl UiAutomator for Recording {
    fn touch(&self, point: Point) -> uiharness_driver::Result<()> {
        self.record(format!("touch:{}:{}", point.x, point.y));
        Ok(())
    }

    fn type_text(&self, text: &str) -> uiharness_driver::Result<()> {
        self.record(format!("type:{text}"));
        Ok(())
    }

    fn swipe_down(&self) -> uiharness_driver::Result<()> {
        self.record("swipeDown".into());
        Ok(())
    }

    fn springboard(&self) -> uiharness_driver::Result<()> {
        self.record("springboard".into());
        Ok(())
    }

    fn relaunch(&self) -> uiharness_driver::Result<()> {
        self.record("relaunch".into());
        Ok(())
    }
}

impl PurchaseController for Recording {
    fn activate_subscription(&self, product_identifier: &str) -> uiharness_driver::Result<()> {
        self.record(format!("activate:{product_identifier}"));
        Ok(())
    }

    fn expire_subscription(&self, product_identifier: &str) -> uiharness_driver::Result<()> {
        self.record(format!("expire:{product_identifier}"));
        Ok(())
    }

    fn fail_transactions(&self) -> uiharness_driver::Result<()> {
        self.record("failTransactions".into());
        Ok(())
    }
}

/// Snapshot sink whose assertions always fail
#[derive(Default)]
pub struct FailingSnapshots;

impl SnapshotSink for FailingSnapshots {
    fn assert_image(
        &self,
        test_name: &str,
        _precision: f32,
        _capture_area: CaptureArea,
    ) -> uiharness_driver::Result<()> {
        Err(uiharness_driver::Error::Collaborator(format!(
            "snapshot mismatch for {test_name}"
        )))
    }

    fn assert_value(&self, test_name: &str, _value: &str) -> uiharness_driver::Result<()> {
        Err(uiharness_driver::Error::Collaborator(format!(
            "value mismatch for {test_name}"
        )))
    }
}
