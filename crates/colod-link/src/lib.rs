//! Host network link monitoring: a kernel link-state subscription plus a two-stage
//! hysteresis debouncer that turns raw up/down flaps into `Yellow`/`Unyellow`
//! announcements and local commits.
mod debounce;
mod source;

pub use debounce::{YellowCommit, YellowDebouncer, DEFAULT_T1, DEFAULT_T2};
pub use source::{LinkEvent, LinkSource, ManualLinkSource, SysfsLinkSource};

#[cfg(test)]
mod tests;
