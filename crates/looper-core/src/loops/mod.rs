pub(crate) mod phrase;
pub(crate) mod registry;
pub(crate) mod state;
pub(crate) mod take;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use phrase::{Loop, LoopSettings, ScheduledPlayback};
pub use registry::LoopRegistry;
pub use state::{LoopState, LoopTransition};
pub use take::Take;

/// Stable identifier of a loop within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoopId(pub u64);

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop_{}", self.0)
    }
}
