//! Prelude for convenient imports.

pub use crate::block::BlockDefinition;
pub use crate::component::{
    BuildContext, Component, ComponentFuture, ComponentSchema, Notifier, Registry, RegistrySchema,
};
pub use crate::diag::{Diagnostic, Diagnostics, Severity};
pub use crate::error::{GraphError, Result, WeftError};
pub use crate::eval::EvalContext;
pub use crate::expr::{Selector, SelectorParser, Traversal};
pub use crate::reference::Reference;
pub use crate::types::NodeId;
pub use crate::value::{Shape, Value};
