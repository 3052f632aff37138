//! Best-effort "does this agent have any melee verb?" check shared by the
//! melee guards.

use tether_types::Agent;
use tracing::debug;

use crate::discovery::Discovery;
use crate::store_access;

/// Answer of [`melee_availability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeleeAvailability {
    Present,
    Absent,
    /// Neither the host roster nor the store scan could tell.  Callers
    /// treat this as present.
    Unknown,
}

/// Ask the discovered melee roster first; fall back to scanning the verb
/// store for melee attacks.
///
/// The store scan is only conclusive when the store exists and every entry
/// could be inspected.
pub fn melee_availability(agent: &dyn Agent, discovery: &Discovery) -> MeleeAvailability {
    if let Some(roster) = discovery.melee_roster() {
        match roster.has_melee_verbs(agent) {
            Ok(true) => return MeleeAvailability::Present,
            Ok(false) => return MeleeAvailability::Absent,
            Err(fault) => {
                debug!(agent = %agent.id(), %fault, "melee roster unavailable; scanning store");
            }
        }
    }

    let Some(store) = store_access::list(agent) else {
        return MeleeAvailability::Unknown;
    };
    let mut uninspectable = false;
    for verb in store_access::snapshot(store) {
        match verb.and_then(|v| v.properties()) {
            Some(props) if props.melee_attack => return MeleeAvailability::Present,
            Some(_) => {}
            None => uninspectable = true,
        }
    }
    if uninspectable {
        MeleeAvailability::Unknown
    } else {
        MeleeAvailability::Absent
    }
}
