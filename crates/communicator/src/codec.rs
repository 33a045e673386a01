//! Wire encoding for actions
//!
//! JSON over the wire. Decoding is best-effort: a malformed body yields a
//! typed error and the caller logs and drops the message. Retrying a
//! malformed message would not make it well-formed.

use crate::action::Action;
use crate::error::Result;

/// Encode an action for transport
pub fn encode(action: &Action) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(action)?)
}

/// Decode an action from a request body
pub fn decode(bytes: &[u8]) -> Result<Action> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{CaptureArea, Invocation, Point, Rect};

    fn round_trip(invocation: Invocation) {
        let action = Action::new(invocation);
        let bytes = encode(&action).unwrap();
        let decoded = decode(&bytes).unwrap();

        // Structural comparison on every field, not just the identifier.
        assert_eq!(
            serde_json::to_value(&decoded).unwrap(),
            serde_json::to_value(&action).unwrap()
        );
    }

    #[test]
    fn round_trips_every_invocation_variant() {
        round_trip(Invocation::RunTest { number: 5 });
        round_trip(Invocation::RelaunchApp);
        round_trip(Invocation::TypeText {
            text: "hello world".into(),
        });
        round_trip(Invocation::Springboard);
        round_trip(Invocation::Assert {
            test_name: "Swift-5".into(),
            precision: 0.92,
            capture_area: CaptureArea::SafeArea {
                capture_status_bar: true,
                capture_home_indicator: false,
            },
        });
        round_trip(Invocation::AssertValue {
            test_name: "Swift-6".into(),
            value: "{\"count\":3}".into(),
        });
        round_trip(Invocation::Skip {
            message: "not supported on this OS".into(),
        });
        round_trip(Invocation::Fail {
            message: "paywall never appeared".into(),
        });
        round_trip(Invocation::Touch {
            point: Point { x: 120.5, y: 301.0 },
        });
        round_trip(Invocation::SwipeDown);
        round_trip(Invocation::FailTransactions);
        round_trip(Invocation::ActivateSubscription {
            product_identifier: "com.example.annual".into(),
        });
        round_trip(Invocation::ExpireSubscription {
            product_identifier: "com.example.annual".into(),
        });
        round_trip(Invocation::Log {
            message: "checkpoint".into(),
        });
    }

    #[test]
    fn round_trips_capture_areas() {
        round_trip(Invocation::Assert {
            test_name: "full".into(),
            precision: 1.0,
            capture_area: CaptureArea::FullScreen,
        });
        round_trip(Invocation::Assert {
            test_name: "safari".into(),
            precision: 0.95,
            capture_area: CaptureArea::Safari,
        });
        round_trip(Invocation::Assert {
            test_name: "crop".into(),
            precision: 0.9,
            capture_area: CaptureArea::Custom {
                frame: Rect {
                    x: 0.0,
                    y: 0.0,
                    width: 393.0,
                    height: 655.0,
                },
            },
        });
    }

    #[test]
    fn round_trips_nested_completed() {
        let original = Action::new(Invocation::RunTest { number: 7 });
        round_trip(Invocation::Completed {
            action: Box::new(original),
        });
    }

    #[test]
    fn malformed_input_is_a_typed_error() {
        assert!(decode(b"not json").is_err());
        assert!(decode(b"{\"identifier\":\"x\"}").is_err());
        assert!(decode(b"").is_err());
    }
}
