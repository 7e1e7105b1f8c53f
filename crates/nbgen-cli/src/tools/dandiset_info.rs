//! Dandiset metadata lookup

use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAME: &str = "dandiset_info";

pub const DESCRIPTION: &str = r#"Get information about a specific version of a DANDI dataset.

When the version is unknown, use "draft".

This will return detailed information about the dandiset including:
name, description, access, license, citation, keywords, protocol, contributor names, date created, size, number of files, number of subjects, variables measured, and measurement technique.
"#;

pub const FAILURE: &str = "Failed to fetch dandiset info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Args {
    pub dandiset_id: String,
    #[serde(default = "super::draft")]
    pub version: String,
}

pub fn parameters_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "dandiset_id": {"type": "string", "description": "DANDI dataset ID"},
            "version": {
                "type": "string",
                "description": "Version of the dataset (optional, defaults to 'draft')"
            }
        },
        "required": ["dandiset_id"]
    })
}
