//! Capability registry and tool dispatch

use std::collections::HashMap;
use std::sync::Arc;

use nbgen_ai::ToolDescriptor;

use crate::{
    error::{Error, Result},
    tool::{BoxedTool, to_descriptor},
};

struct Entry {
    tool: BoxedTool,
    validator: Arc<jsonschema::Validator>,
}

/// Fixed set of tools the model may call, keyed by name.
///
/// Each tool's parameter schema is compiled when it is registered, so a
/// tool with an unusable schema never reaches the model.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails on duplicate names and on schemas that do not
    /// compile or do not describe an object.
    pub fn register(&mut self, tool: BoxedTool) -> Result<()> {
        let name = tool.name().to_string();
        if name.is_empty() {
            return Err(Error::Registration {
                tool: name,
                message: "tool name is empty".into(),
            });
        }
        if self.index.contains_key(&name) {
            return Err(Error::Registration {
                tool: name,
                message: "a tool with this name is already registered".into(),
            });
        }

        let schema = tool.parameters_schema();
        if schema.get("type").and_then(|t| t.as_str()) != Some("object") {
            return Err(Error::Registration {
                tool: name,
                message: "parameter schema must have type \"object\"".into(),
            });
        }
        let validator = jsonschema::validator_for(&schema).map_err(|e| Error::Registration {
            tool: name.clone(),
            message: format!("invalid parameter schema: {}", e),
        })?;

        tracing::debug!(tool = %name, "Registered tool");
        self.index.insert(name, self.entries.len());
        self.entries.push(Entry {
            tool,
            validator: Arc::new(validator),
        });
        Ok(())
    }

    /// Builder-style registration
    pub fn with_tool(mut self, tool: BoxedTool) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tool.name()).collect()
    }

    /// Descriptors sent to the endpoint, in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries
            .iter()
            .map(|e| to_descriptor(e.tool.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke the tool registered under `name`.
    ///
    /// Fails with `UnknownTool` for unregistered names and with
    /// `InvalidArguments` when the arguments violate the schema. Handler
    /// errors are wrapped in `Capability` with their source intact.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        if let Some(message) = validate_with_validator(&arguments, &entry.validator) {
            return Err(Error::InvalidArguments {
                tool: name.to_string(),
                message,
            });
        }

        entry
            .tool
            .execute(arguments)
            .await
            .map_err(|source| Error::Capability {
                tool: name.to_string(),
                source,
            })
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::testing::FnTool;
    use serde_json::json;

    fn info_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "dandiset_id": { "type": "string" },
                "page": { "type": "integer" }
            },
            "required": ["dandiset_id"]
        })
    }

    fn registry_with_info() -> ToolRegistry {
        let tool = FnTool::new("dandiset_info", info_schema(), |args| {
            Ok(json!({"name": args["dandiset_id"], "size": 42}))
        });
        ToolRegistry::new().with_tool(Arc::new(tool)).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_known_tool() {
        let registry = registry_with_info();
        let out = registry
            .dispatch("dandiset_info", json!({"dandiset_id": "X"}))
            .await
            .unwrap();
        assert_eq!(out, json!({"name": "X", "size": 42}));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = registry_with_info();
        let err = registry.dispatch("rm_rf", json!({})).await.unwrap_err();
        match err {
            Error::UnknownTool(name) => assert_eq!(name, "rm_rf"),
            other => panic!("expected UnknownTool, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_missing_required_argument() {
        let registry = registry_with_info();
        let err = registry
            .dispatch("dandiset_info", json!({"page": 1}))
            .await
            .unwrap_err();
        match err {
            Error::InvalidArguments { tool, message } => {
                assert_eq!(tool, "dandiset_info");
                assert!(message.contains("dandiset_id"), "got: {}", message);
            }
            other => panic!("expected InvalidArguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_wrong_type() {
        let registry = registry_with_info();
        let err = registry
            .dispatch("dandiset_info", json!({"dandiset_id": "X", "page": "two"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_capability_error_propagates() {
        let tool = FnTool::new(
            "nwb_file_info",
            json!({"type": "object"}),
            |_| Err("Failed to fetch NWB file info: 404".into()),
        );
        let registry = ToolRegistry::new().with_tool(Arc::new(tool)).unwrap();
        let err = registry.dispatch("nwb_file_info", json!({})).await.unwrap_err();
        match err {
            Error::Capability { tool, source } => {
                assert_eq!(tool, "nwb_file_info");
                assert_eq!(source.to_string(), "Failed to fetch NWB file info: 404");
            }
            other => panic!("expected Capability, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry_with_info();
        let err = registry
            .register(Arc::new(FnTool::returning("dandiset_info", json!(null))))
            .unwrap_err();
        assert!(matches!(err, Error::Registration { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_non_object_schema_rejected() {
        let tool = FnTool::new("bad", json!({"type": "string"}), |_| Ok(json!(null)));
        let err = ToolRegistry::new().register(Arc::new(tool)).unwrap_err();
        assert_eq!(err.tool_name(), Some("bad"));
    }

    #[test]
    fn test_uncompilable_schema_rejected() {
        let tool = FnTool::new(
            "bad",
            json!({"type": "object", "properties": {"x": {"type": "not_a_real_type"}}}),
            |_| Ok(json!(null)),
        );
        let err = ToolRegistry::new().register(Arc::new(tool)).unwrap_err();
        assert!(err.to_string().contains("invalid parameter schema"), "got: {}", err);
    }

    #[test]
    fn test_descriptors_keep_registration_order() {
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(FnTool::returning("b", json!(1))))
            .unwrap()
            .with_tool(Arc::new(FnTool::returning("a", json!(2))))
            .unwrap();
        assert_eq!(registry.names(), vec!["b", "a"]);
        let names: Vec<String> = registry
            .descriptors()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(registry.contains("a"));
        assert!(!registry.contains("c"));
    }
}
