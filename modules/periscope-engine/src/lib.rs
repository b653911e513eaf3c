pub mod brief;
pub mod engine;
pub mod overlap;
pub mod reasoner;
pub mod score;
pub mod testutil;
pub mod traits;
pub mod validate;

pub use engine::{BatchRunReport, ConnectionEngine, OrgRunReport, RunStatus};
pub use overlap::{detect_overlaps, Overlap, OverlapKind, OverlapSet};
pub use reasoner::{ClaudeReasoner, RawConnection, ReasonError};
pub use score::significance;
pub use traits::{ConnectionReasoner, ProfileStore, SignalWriter};
pub use validate::{validate, Connection};
