//! The Action message exchanged between the Runner and Target processes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit of cross-process communication.
///
/// An `Action` pairs a unique correlation identifier with the command or
/// report it carries. The identifier exists only to match a reply to the
/// request that produced it: the `Completed` invocation wraps the original
/// action so the receiving side can resume exactly one waiting caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Opaque correlation token, generated at construction.
    pub identifier: String,

    /// The command or report this action carries.
    pub invocation: Invocation,
}

impl Action {
    /// Create a new action with a fresh correlation identifier
    pub fn new(invocation: Invocation) -> Self {
        Self {
            identifier: Uuid::new_v4().to_string(),
            invocation,
        }
    }
}

// Two actions are the same logical exchange when their identifiers match,
// regardless of payload. The `Completed` variant relies on this.
impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Action {}

impl std::hash::Hash for Action {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

/// The closed set of commands and reports an action can carry.
///
/// Runner-bound and target-bound variants share one enum: the transport
/// does not care about direction, and `Completed` flows both ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Invocation {
    /// Target tells the runner to start a scripted test
    RunTest { number: u32 },

    /// Bring the app back to the foreground
    RelaunchApp,

    /// Type text into the focused element
    TypeText { text: String },

    /// Background the app to the home screen
    Springboard,

    /// Capture a screenshot and compare it against the named reference
    Assert {
        test_name: String,
        precision: f32,
        capture_area: CaptureArea,
    },

    /// Compare a serialized value against the named reference
    AssertValue { test_name: String, value: String },

    /// Skip the current test with a reason
    Skip { message: String },

    /// Fail the current test with a reason
    Fail { message: String },

    /// Tap at an absolute screen coordinate
    Touch { point: Point },

    /// Swipe down from the center of the screen
    SwipeDown,

    /// Make all subsequent purchase attempts fail
    FailTransactions,

    /// Buy the product with the given identifier
    ActivateSubscription { product_identifier: String },

    /// Expire the subscription for the given product
    ExpireSubscription { product_identifier: String },

    /// Forward a log line to the peer's output
    Log { message: String },

    /// Acknowledge that the wrapped action has been fully processed
    Completed { action: Box<Action> },
}

/// An absolute screen coordinate in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A screen rectangle in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Which region of the screenshot an assertion compares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CaptureArea {
    /// The entire screen
    FullScreen,

    /// The safe area, optionally keeping the status bar / home indicator
    SafeArea {
        #[serde(default = "default_true")]
        capture_status_bar: bool,
        #[serde(default = "default_true")]
        capture_home_indicator: bool,
    },

    /// A consistent frame for external Safari content
    Safari,

    /// An arbitrary crop
    Custom { frame: Rect },
}

fn default_true() -> bool {
    true
}
