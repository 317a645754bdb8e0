//! # Haqn Support
//!
//! Shared utilities for the Haqn injection crates.
//!
//! This crate provides:
//! - Type-name shortening for error messages
//! - "Did you mean?" suggestions for unknown contract and implementation names

pub mod rendering;
