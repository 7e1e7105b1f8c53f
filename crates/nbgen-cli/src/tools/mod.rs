//! DANDI archive tools exposed to the model

mod client;
mod dandiset_assets;
mod dandiset_info;
mod nwb_file_info;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use nbgen_agent::{BoxError, Tool, ToolOutput, ToolRegistry, parse_arguments};

pub use client::ArchiveClient;

pub(crate) fn draft() -> String {
    "draft".to_string()
}

/// The archive tools the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveTool {
    DandisetInfo,
    DandisetAssets,
    NwbFileInfo,
}

impl ArchiveTool {
    /// Every tool, in registration order
    pub const ALL: [ArchiveTool; 3] = [
        ArchiveTool::DandisetInfo,
        ArchiveTool::DandisetAssets,
        ArchiveTool::NwbFileInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArchiveTool::DandisetInfo => dandiset_info::NAME,
            ArchiveTool::DandisetAssets => dandiset_assets::NAME,
            ArchiveTool::NwbFileInfo => nwb_file_info::NAME,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ArchiveTool::DandisetInfo => dandiset_info::DESCRIPTION,
            ArchiveTool::DandisetAssets => dandiset_assets::DESCRIPTION,
            ArchiveTool::NwbFileInfo => nwb_file_info::DESCRIPTION,
        }
    }

    pub fn parameters_schema(self) -> serde_json::Value {
        match self {
            ArchiveTool::DandisetInfo => dandiset_info::parameters_schema(),
            ArchiveTool::DandisetAssets => dandiset_assets::parameters_schema(),
            ArchiveTool::NwbFileInfo => nwb_file_info::parameters_schema(),
        }
    }

    fn failure_context(self) -> &'static str {
        match self {
            ArchiveTool::DandisetInfo => dandiset_info::FAILURE,
            ArchiveTool::DandisetAssets => dandiset_assets::FAILURE,
            ArchiveTool::NwbFileInfo => nwb_file_info::FAILURE,
        }
    }

    /// Turn model-supplied arguments into the request body, applying defaults
    pub fn payload(self, arguments: serde_json::Value) -> Result<serde_json::Value, BoxError> {
        let payload = match self {
            ArchiveTool::DandisetInfo => {
                serde_json::to_value(parse_arguments::<dandiset_info::Args>(arguments)?)?
            }
            ArchiveTool::DandisetAssets => serde_json::to_value(
                parse_arguments::<dandiset_assets::Args>(arguments)?.normalized(),
            )?,
            ArchiveTool::NwbFileInfo => {
                serde_json::to_value(parse_arguments::<nwb_file_info::Args>(arguments)?)?
            }
        };
        Ok(payload)
    }
}

impl fmt::Display for ArchiveTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArchiveTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArchiveTool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown archive tool: {}", s))
    }
}

/// Binds an [`ArchiveTool`] to the client that serves it
pub struct ArchiveToolHandler {
    tool: ArchiveTool,
    client: Arc<ArchiveClient>,
}

impl ArchiveToolHandler {
    pub fn new(tool: ArchiveTool, client: Arc<ArchiveClient>) -> Self {
        Self { tool, client }
    }
}

#[async_trait]
impl Tool for ArchiveToolHandler {
    fn name(&self) -> &str {
        self.tool.name()
    }

    fn description(&self) -> &str {
        self.tool.description()
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.tool.parameters_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolOutput {
        let payload = self.tool.payload(arguments)?;
        let result = self
            .client
            .post(self.tool.name(), &payload, self.tool.failure_context())
            .await?;
        Ok(result)
    }
}

/// Registry holding every archive tool, served by `client`
pub fn archive_registry(client: Arc<ArchiveClient>) -> nbgen_agent::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in ArchiveTool::ALL {
        registry.register(Arc::new(ArchiveToolHandler::new(tool, client.clone())))?;
    }
    Ok(registry)
}
