//! NWB file metadata and loading hints

use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAME: &str = "nwb_file_info";

pub const DESCRIPTION: &str = r#"Get information about an NWB file, including metadata and information about how to load the neurodata objects using pynwb and lindi.

Be careful not to load too much data at once, as it can be slow and use a lot of memory.
"#;

pub const FAILURE: &str = "Failed to fetch NWB file info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Args {
    pub dandiset_id: String,
    pub nwb_file_url: String,
}

pub fn parameters_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "dandiset_id": {"type": "string", "description": "DANDI dataset ID"},
            "nwb_file_url": {"type": "string", "description": "URL of the NWB file in DANDI"}
        },
        "required": ["dandiset_id", "nwb_file_url"]
    })
}
