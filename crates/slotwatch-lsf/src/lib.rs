//! LSF integration for slotwatch.
//!
//! Active users come from bjobs, PER_USER coverage from blimits.

pub mod bjobs;
pub mod blimits;
pub mod env;
pub mod gateway;
pub mod types;

pub use bjobs::extract_users;
pub use blimits::{parse_limit_blocks, scan_limit_blocks};
pub use env::SchedulerEnv;
pub use gateway::{GatewayError, LsfGateway, QueueGateway};
pub use types::{InvalidUserId, LimitBlock, LineSelector, UserId, UserSet};
