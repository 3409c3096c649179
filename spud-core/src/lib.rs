//! Subsystem control layer for the sojourner-spud clawbot on no-std embedded platforms.
//!
//! For a host-side simulation, see the `spud-app/mock-brain` binary.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod utils;
