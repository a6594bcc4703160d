//! TheraLink firmware library - testable modules for the kiosk.
//!
//! This library contains the wire-level logic that can be tested on the
//! host machine. The binary (`main.rs`) uses this library and adds the
//! embedded-specific code (drivers, Wi-Fi bring-up, socket tasks).
//!
//! # Testing
//!
//! Run tests on host with:
//! ```bash
//! cargo test -p theralink-pico2w --lib
//! ```
//!
//! Tests run with `std` enabled (via `cfg_attr`), allowing use of the
//! standard test framework while the actual firmware runs as `no_std`.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]
// Crate-level lints (match common for consistency)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

// === Pure logic modules (testable on host, no ARM dependencies) ===

pub mod captive;
pub mod httpd;
pub mod joystick;
pub mod pages;
