//! The built-in component registry.

use crate::{Collect, Constant, Relay, Ticker};
use std::sync::Arc;
use weft_core::block::BlockDefinition;
use weft_core::component::{
    BuildContext, Component, ComponentSchema, Registry, RegistrySchema,
};
use weft_core::error::{Result, WeftError};
use weft_core::value::Shape;

/// Registry of the built-in component kinds.
#[derive(Debug, Default)]
pub struct BuiltinRegistry;

impl BuiltinRegistry {
    /// Create the registry.
    pub fn new() -> Self {
        Self
    }
}

fn exports(out: Shape) -> Shape {
    Shape::record([("out", out)])
}

impl Registry for BuiltinRegistry {
    fn schema(&self) -> RegistrySchema {
        RegistrySchema::new()
            .with_kind(ComponentSchema::new("constant", 1, exports(Shape::Any)))
            .with_kind(ComponentSchema::new("ticker", 1, exports(Shape::Number)))
            .with_kind(ComponentSchema::new("relay", 1, exports(Shape::Any)))
            .with_kind(ComponentSchema::new(
                "collect",
                1,
                exports(Shape::Seq(Box::new(Shape::Any))),
            ))
    }

    fn build(
        &self,
        kind: &str,
        bctx: &BuildContext,
        block: &BlockDefinition,
    ) -> Result<Arc<dyn Component>> {
        let _enter = bctx.span.enter();
        tracing::debug!(kind, "building component");

        match kind {
            "constant" => Constant::build(bctx, block),
            "ticker" => Ticker::build(bctx, block),
            "relay" => Relay::build(bctx, block),
            "collect" => Collect::build(bctx, block),
            other => Err(WeftError::Build {
                node: block.reference().to_string(),
                cause: format!("unknown component kind '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_core::value::Value;

    #[test]
    fn schema_covers_all_kinds() {
        let schema = BuiltinRegistry::new().schema();
        for kind in ["constant", "ticker", "relay", "collect"] {
            assert!(schema.get(kind).is_some(), "missing kind {kind}");
            assert_eq!(schema.get(kind).unwrap().labels, 1);
        }
    }

    #[test]
    fn builds_by_kind() {
        let registry = BuiltinRegistry::new();
        let block: BlockDefinition =
            serde_yaml::from_str("kind: constant\nlabels: [c]\nbody:\n  value: 9").unwrap();
        let bctx = BuildContext::new("constant.c", None);

        let component = registry.build("constant", &bctx, &block).unwrap();
        assert_eq!(component.current_state(), Value(json!({"out": 9})));
    }

    #[test]
    fn unknown_kind_is_a_build_error() {
        let registry = BuiltinRegistry::new();
        let block: BlockDefinition =
            serde_yaml::from_str("kind: mystery\nlabels: [x]\nbody: {}").unwrap();
        let bctx = BuildContext::new("mystery.x", None);

        let result = registry.build("mystery", &bctx, &block);
        assert!(matches!(result, Err(WeftError::Build { .. })));
    }
}
