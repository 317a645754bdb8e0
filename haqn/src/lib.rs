//! # Haqn: field injection for Rust
//!
//! Mark the trait-object fields of a struct with `#[inject]`, bind each
//! contract to an implementation name in a properties table, and let an
//! [`Injector`] fill them with fresh instances.
//!
//! ```rust
//! use haqn::{Injectable, Injector, PropertiesText, contract, implementation};
//!
//! #[contract(name = "shop.Greeter")]
//! pub trait Greeter {
//!     fn greet(&self) -> &'static str;
//! }
//!
//! #[derive(Default)]
//! struct Polite;
//!
//! #[implementation(name = "shop.Polite")]
//! impl Greeter for Polite {
//!     fn greet(&self) -> &'static str {
//!         "good morning"
//!     }
//! }
//!
//! #[derive(Default, Injectable)]
//! struct Counter {
//!     #[inject]
//!     greeter: Option<Box<dyn Greeter>>,
//! }
//!
//! let injector = Injector::builder()
//!     .config(PropertiesText::new("inline", "shop.Greeter = shop.Polite"))
//!     .build()?;
//!
//! let mut counter = Counter::default();
//! injector.inject(&mut counter)?;
//! assert_eq!(counter.greeter.unwrap().greet(), "good morning");
//! # Ok::<(), haqn::HaqnError>(())
//! ```

pub use haqn_core::*;
pub use haqn_derive::*;
pub use haqn_support::*;
