//! Non-owning governance for transcoding workloads: spawn-and-own (`Run`) or
//! observe-only (`Attach`), with best-effort cgroup-based resource limits
//! layered on top. Neither path ever pokes the workload beyond what its
//! caller explicitly asked for.

pub mod attach;
pub mod cgroup;
pub mod error;
pub mod limits;
pub mod preflight;
pub mod process_group;
pub mod run;
pub mod timeout;
pub mod verdict;

pub use attach::{attach, AttachRequest};
pub use error::{Result, WrapperError};
pub use limits::ResourceLimits;
pub use run::{run, RunRequest};
pub use verdict::{PlatformSla, RunOutcome};
