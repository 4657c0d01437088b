//! Integration test crate for Replay.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on multiple replay crates to verify they work together.

#[cfg(test)]
mod delay;

#[cfg(test)]
mod composite;

#[cfg(test)]
mod capture;
