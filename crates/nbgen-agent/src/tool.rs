//! Tool trait and execution

use async_trait::async_trait;
use nbgen_ai::ToolDescriptor;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::BoxError;

/// Result of a tool execution: any JSON value, or the handler's own error
pub type ToolOutput = std::result::Result<serde_json::Value, BoxError>;

/// Trait for executable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the LLM
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    ///
    /// Errors are surfaced to the caller unchanged; the loop does not retry.
    async fn execute(&self, arguments: serde_json::Value) -> ToolOutput;
}

/// Type alias for a boxed tool
pub type BoxedTool = Arc<dyn Tool>;

/// Convert a Tool to the descriptor sent to the endpoint
pub fn to_descriptor(tool: &dyn Tool) -> ToolDescriptor {
    ToolDescriptor::function(tool.name(), tool.description(), tool.parameters_schema())
}

/// Deserialize keyword arguments into a typed parameter struct.
pub fn parse_arguments<T: DeserializeOwned>(
    arguments: serde_json::Value,
) -> std::result::Result<T, BoxError> {
    serde_json::from_value(arguments).map_err(|e| Box::new(e) as BoxError)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    type Handler = dyn Fn(serde_json::Value) -> ToolOutput + Send + Sync;

    /// Tool backed by a closure; records every argument payload it receives.
    pub struct FnTool {
        name: String,
        schema: serde_json::Value,
        handler: Box<Handler>,
        pub calls: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    impl FnTool {
        pub fn new(
            name: &str,
            schema: serde_json::Value,
            handler: impl Fn(serde_json::Value) -> ToolOutput + Send + Sync + 'static,
        ) -> Self {
            Self {
                name: name.to_string(),
                schema,
                handler: Box::new(handler),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// A tool accepting any object and returning `result`
        pub fn returning(name: &str, result: serde_json::Value) -> Self {
            Self::new(
                name,
                serde_json::json!({"type": "object", "properties": {}}),
                move |_| Ok(result.clone()),
            )
        }
    }

    #[async_trait]
    impl Tool for FnTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            self.schema.clone()
        }
        async fn execute(&self, arguments: serde_json::Value) -> ToolOutput {
            self.calls.lock().push(arguments.clone());
            (self.handler)(arguments)
        }
    }
}
