//! shipwright-lib: release orchestration for a cross-compiled binary
//!
//! This crate provides the building blocks of a release run:
//! - `target`: the static target matrix
//! - `toolchain`: single-flight bootstrap of the pinned compiler toolchain
//! - `provenance`: release version and build-time constants
//! - `graph`: dependency-ordered, fail-fast task execution
//! - `license`: license listing regeneration
//! - `publish`: object store upload and artifact repository registration
//! - `pipeline`: the release tasks wired together

pub mod compile;
pub mod compress;
pub mod config;
pub mod consts;
pub mod context;
pub mod error;
pub mod exec;
pub mod graph;
pub mod license;
pub mod pipeline;
pub mod platform;
pub mod provenance;
pub mod publish;
pub mod target;
pub mod toolchain;

#[cfg(test)]
pub(crate) mod testutil;
