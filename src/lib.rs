//! Scoring and comparative-analysis engine for school performance workbooks.
//!
//! Sheets of raw rows go through [`normalize::normalize`] into scored
//! [`types::SchoolRecord`]s, which [`roster::build_roster`] ranks. From there
//! [`analysis::analyze`] compares one school against the roster and
//! [`merge::merge`] folds later uploads in.
pub mod analysis;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod output;
pub mod reports;
pub mod roster;
pub mod scoring;
pub mod source;
pub mod types;
pub mod util;

pub use error::{Result, ScorecardError};
