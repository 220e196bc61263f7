//! `graduate-core`: promote a fixed, ordered set of applications to a
//! remote environment so that either all of them cut over or none do.
//!
//! Each unit is pushed in turn; its remote side builds and then parks at a
//! barrier, announcing it with a sentinel line. Once every unit is parked
//! (or already current) and the post hooks pass, `continue` is delivered to
//! each unit from last to first. Any failure delivers `abort` instead.

pub mod config;
pub mod coordinator;
pub mod directive;
pub mod environment;
pub mod error;
pub mod history;
pub mod hook_runner;
pub mod hooks;
pub mod io;
pub mod keys;
pub mod paths;
pub mod peer;
pub mod push;
pub mod remote;
pub mod units;

pub use error::{GraduateError, Result};
