//! Filesystem actions.
//!
//! The only mutation linkdupe performs is replacing a redundant duplicate
//! with a hardlink to its set's canonical file; see [`link`].

pub mod link;

pub use link::{
    HardlinkTransaction, LinkError, LinkFailure, LinkOutcome, LinkPlan, PlannedAction, SetPlan,
    StagedLink,
};
