//! Derive and attribute macros for Haqn.
//!
//! Use them through the `haqn` facade; the expansions refer to `::haqn`.

pub use haqn_macros::{Injectable, contract, implementation};
