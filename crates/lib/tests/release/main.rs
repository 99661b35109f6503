//! End-to-end release runs against a scripted toolchain.

#![cfg(unix)]

mod bootstrap_tests;
mod common;
