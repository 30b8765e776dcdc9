//! Output change detection: metadata snapshots of declared output paths and
//! the cross-run cache used for skip-if-unchanged.
mod cache;
mod stat;

pub use cache::{CacheEntry, OutputCache};
pub use stat::{changed, snapshot, snapshot_one, OutputStat};
