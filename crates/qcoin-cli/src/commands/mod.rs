//! CLI command implementations.

pub mod common;
pub mod compare;
pub mod control;
pub mod demo;
pub mod parallel;
pub mod version;
