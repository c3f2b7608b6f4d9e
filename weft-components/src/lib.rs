//! Built-in components for the Weft runtime.
//!
//! A small component library behind the core [`Registry`] trait:
//!
//! - `constant` — exports a fixed value
//! - `ticker` — exports a counter, notifying on every interval
//! - `relay` — forwards one evaluated input, notifying on change
//! - `collect` — gathers a list of inputs into one sequence
//!
//! [`Registry`]: weft_core::component::Registry

#![warn(missing_docs)]

mod collect;
mod constant;
mod registry;
mod relay;
mod ticker;

pub use collect::Collect;
pub use constant::Constant;
pub use registry::BuiltinRegistry;
pub use relay::Relay;
pub use ticker::Ticker;
