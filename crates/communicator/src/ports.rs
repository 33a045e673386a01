//! Deterministic port assignment for parallel test lanes
//!
//! Parallel test execution spins up many simulator clones; every lane hosts
//! its own pair of loopback servers, so each lane needs its own disjoint
//! (runner, parent) port pair. Runner ports grow up from the bottom of the
//! dynamic port window and parent ports grow down from the top, so the two
//! roles never meet for any realistic lane count.

use std::collections::HashMap;

use crate::config::Role;
use crate::error::{Error, Result};

/// Bottom of the dynamic/private TCP port window
pub const PORT_WINDOW_MIN: u16 = 49152;
/// Top of the dynamic/private TCP port window
pub const PORT_WINDOW_MAX: u16 = 65535;

const RUNNER_BASE_PORT: u16 = PORT_WINDOW_MIN;
const PARENT_BASE_PORT: u16 = PORT_WINDOW_MAX;

/// Environment variable carrying the simulator device description
pub const DEVICE_NAME_VAR: &str = "SIMULATOR_DEVICE_NAME";

/// Marker preceding the clone number in the device description,
/// e.g. "Clone 2 of iPhone 14 Pro"
const CLONE_MARKER: &str = "Clone ";

/// One lane of a parallelized test run.
///
/// The messaging core only ever sees this pre-parsed index; the fragile
/// device-description string parsing lives in [`LaneIndex::from_environment`]
/// and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneIndex(u16);

impl LaneIndex {
    /// Reserved sentinel for a non-parallelized run. High enough that it
    /// never collides with a real clone number, low enough that both
    /// derived ports stay inside the window.
    pub const SOLO: LaneIndex = LaneIndex(8000);

    /// Create a lane index from an already-parsed clone number
    pub fn new(index: u16) -> Self {
        Self(index)
    }

    /// Resolve the lane index from the process environment.
    ///
    /// This is the single boundary adapter that knows the simulator's
    /// device-description format. A missing variable or a description
    /// without a clone marker means the run is not parallelized and maps
    /// to [`LaneIndex::SOLO`]; a marker followed by garbage is a malformed
    /// environment and fails.
    pub fn from_environment(environment: &HashMap<String, String>) -> Result<Self> {
        let Some(device_name) = environment.get(DEVICE_NAME_VAR) else {
            return Ok(Self::SOLO);
        };

        let Some(rest) = device_name
            .find(CLONE_MARKER)
            .map(|at| &device_name[at + CLONE_MARKER.len()..])
        else {
            return Ok(Self::SOLO);
        };

        let digits: &str = rest
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .unwrap_or("");

        digits
            .parse::<u16>()
            .map(Self)
            .map_err(|_| {
                Error::AddressResolution(format!(
                    "malformed clone descriptor in {DEVICE_NAME_VAR}: {device_name:?}"
                ))
            })
    }

    pub fn index(&self) -> u16 {
        self.0
    }
}

/// Derive the listen port for a role on the given lane.
///
/// Both are unrecoverable configuration errors when out of range: the
/// process must not proceed with an ambiguous network identity.
pub fn resolve_port(role: Role, lane: LaneIndex) -> Result<u16> {
    let port = match role {
        Role::Runner => RUNNER_BASE_PORT.checked_add(lane.0),
        Role::Parent => PARENT_BASE_PORT.checked_sub(lane.0),
    };

    match port {
        Some(p) if (PORT_WINDOW_MIN..=PORT_WINDOW_MAX).contains(&p) => Ok(p),
        _ => Err(Error::AddressResolution(format!(
            "port for {role:?} on lane {} falls outside {PORT_WINDOW_MIN}..={PORT_WINDOW_MAX}",
            lane.0
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test_case("Clone 1 of iPhone 14 Pro", 1)]
    #[test_case("Clone 2 of iPhone 14 Pro", 2)]
    #[test_case("Clone 37 of iPad mini (6th generation)", 37)]
    fn parses_clone_index_from_device_name(name: &str, expected: u16) {
        let lane =
            LaneIndex::from_environment(&env(&[(DEVICE_NAME_VAR, name)])).unwrap();
        assert_eq!(lane.index(), expected);
    }

    #[test]
    fn missing_variable_means_solo() {
        let lane = LaneIndex::from_environment(&HashMap::new()).unwrap();
        assert_eq!(lane, LaneIndex::SOLO);
    }

    #[test]
    fn unmarked_device_name_means_solo() {
        let lane =
            LaneIndex::from_environment(&env(&[(DEVICE_NAME_VAR, "iPhone 14 Pro")]))
                .unwrap();
        assert_eq!(lane, LaneIndex::SOLO);
    }

    #[test]
    fn malformed_clone_descriptor_fails() {
        let result =
            LaneIndex::from_environment(&env(&[(DEVICE_NAME_VAR, "Clone x of iPhone")]));
        assert!(matches!(result, Err(Error::AddressResolution(_))));
    }

    #[test]
    fn ports_grow_toward_each_other() {
        assert_eq!(resolve_port(Role::Runner, LaneIndex::new(0)).unwrap(), 49152);
        assert_eq!(resolve_port(Role::Runner, LaneIndex::new(3)).unwrap(), 49155);
        assert_eq!(resolve_port(Role::Parent, LaneIndex::new(0)).unwrap(), 65535);
        assert_eq!(resolve_port(Role::Parent, LaneIndex::new(3)).unwrap(), 65532);
    }

    #[test]
    fn lanes_are_disjoint_across_roles() {
        // Any runner port must differ from any parent port for all lane
        // pairs in a realistic range, and both must stay in the window.
        for i in 0..128u16 {
            let runner = resolve_port(Role::Runner, LaneIndex::new(i)).unwrap();
            assert!((PORT_WINDOW_MIN..=PORT_WINDOW_MAX).contains(&runner));
            for j in 0..128u16 {
                let parent = resolve_port(Role::Parent, LaneIndex::new(j)).unwrap();
                assert!((PORT_WINDOW_MIN..=PORT_WINDOW_MAX).contains(&parent));
                assert_ne!(runner, parent);
            }
        }
    }

    #[test]
    fn solo_lane_stays_inside_the_window() {
        let runner = resolve_port(Role::Runner, LaneIndex::SOLO).unwrap();
        let parent = resolve_port(Role::Parent, LaneIndex::SOLO).unwrap();
        assert!((PORT_WINDOW_MIN..=PORT_WINDOW_MAX).contains(&runner));
        assert!((PORT_WINDOW_MIN..=PORT_WINDOW_MAX).contains(&parent));
        assert_ne!(runner, parent);
    }
}
