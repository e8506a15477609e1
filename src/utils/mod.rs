//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `pubrelay` application.
//!
//! It holds the crate's error types and the logging bootstrap.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
