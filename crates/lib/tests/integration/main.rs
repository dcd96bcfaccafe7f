//! Integration tests for kiln-lib, run against a scripted fake toolchain.

#![cfg(unix)]

mod common;
mod driver_tests;
mod pipeline_tests;
mod scheduler_tests;

#[path = "../../src/util/testutil.rs"]
mod testutil;
