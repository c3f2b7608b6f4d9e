//! Weft Runtime - the component-graph engine.
//!
//! This crate provides the execution infrastructure for Weft:
//! - The DAG engine with transitive reduction and topological walks
//! - The nametable mapping references to component nodes
//! - The configuration loader
//! - The concurrent flow runtime with coalescing change propagation
//! - The one-shot convert pipeline for foreign configuration dialects
//! - HTTP endpoints serving the graph as DOT text

#![warn(missing_docs)]

pub mod api;
pub mod convert;
pub mod dag;
pub mod flow;
pub mod loader;
pub mod nametable;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::api::{ApiServer, ServerConfig};
    pub use crate::convert::{ConvertOptions, Converter, ConverterRegistry};
    pub use crate::dag::{Edge, Graph};
    pub use crate::flow::{Flow, LoadError};
    pub use crate::loader::{FlowDocument, LogFormat, LogLevel};
    pub use crate::nametable::Nametable;
}
