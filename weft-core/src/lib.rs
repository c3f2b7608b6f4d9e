//! Weft Core Library
//!
//! This crate provides the foundational types and traits for the Weft
//! component-graph runtime.
//!
//! # Overview
//!
//! Weft loads a declarative configuration describing named components and the
//! selector expressions wiring them together, then runs every component
//! concurrently with automatic re-evaluation of downstream components.
//!
//! # Key Components
//!
//! - **Value**: Dynamic value model with shape introspection
//! - **Block**: The decoded configuration unit for one component
//! - **Expr**: Selector expressions (`${component.name.field}`) and traversals
//! - **Eval**: Evaluation contexts binding dependency state snapshots
//! - **Component**: The run/update/current-state contract and registry traits
//! - **Diag**: Severity-tagged diagnostic bundles

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod component;
pub mod diag;
pub mod error;
pub mod eval;
pub mod expr;
pub mod prelude;
pub mod reference;
pub mod testing;
pub mod types;
pub mod value;

// Re-export key types at crate root for convenience
pub use block::BlockDefinition;
pub use component::{BuildContext, Component, ComponentSchema, Notifier, Registry, RegistrySchema};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use error::{GraphError, Result, WeftError};
pub use eval::EvalContext;
pub use expr::{Selector, SelectorParser, Traversal};
pub use reference::Reference;
pub use types::NodeId;
pub use value::{Shape, Value};
