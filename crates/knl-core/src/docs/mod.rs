//! Documentation-drift detection and reconciliation.
//!
//! The pipeline: a [`tree::CommandNode`] describing the CLI surface feeds
//! both [`coverage`] (against command references scanned from markdown by
//! [`scan`]) and [`reference`] (the generated CLI reference). An analysis
//! backend produces a [`proposal::UpdateProposal`]; the approval UI turns it
//! into review decisions that [`apply`] writes back to documentation files.

pub mod analyzer;
pub mod apply;
pub mod coverage;
pub mod proposal;
pub mod reference;
pub mod scan;
pub mod tree;
