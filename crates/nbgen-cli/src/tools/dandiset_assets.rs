//! Paged asset listing for a Dandiset version

use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAME: &str = "dandiset_assets";

pub const DESCRIPTION: &str = r#"Get a list of assets/files in a dandiset version.

The output provides:
- count: total number of assets
- results: array of assets with asset_id, path, and size

The URL for the asset can be constructed as follows:
https://api.dandiarchive.org/api/assets/<asset_id>/download/"#;

pub const FAILURE: &str = "Failed to fetch dandiset assets";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Args {
    pub dandiset_id: String,
    #[serde(default = "super::draft")]
    pub version: String,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Only sent when non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
}

impl Args {
    /// Drop an empty glob so it is not sent
    pub fn normalized(mut self) -> Self {
        if self.glob.as_deref().is_some_and(str::is_empty) {
            self.glob = None;
        }
        self
    }
}

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

pub fn parameters_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "dandiset_id": {"type": "string", "description": "DANDI dataset ID"},
            "version": {"type": "string", "description": "Version of the dataset (optional)"},
            "page": {"type": "integer", "description": "Page number (optional)"},
            "page_size": {"type": "integer", "description": "Results per page (optional)"},
            "glob": {"type": "string", "description": "File pattern filter (optional)"}
        },
        "required": ["dandiset_id"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_absent_glob() {
        let args: Args = serde_json::from_value(json!({"dandiset_id": "000001"})).unwrap();
        assert_eq!(
            serde_json::to_value(args.normalized()).unwrap(),
            json!({"dandiset_id": "000001", "version": "draft", "page": 1, "page_size": 20})
        );
    }

    #[test]
    fn test_glob_sent_when_given() {
        let args: Args = serde_json::from_value(
            json!({"dandiset_id": "000001", "page": 2, "glob": "*.nwb"}),
        )
        .unwrap();
        let v = serde_json::to_value(args.normalized()).unwrap();
        assert_eq!(v["glob"], "*.nwb");
        assert_eq!(v["page"], 2);
    }

    #[test]
    fn test_empty_glob_dropped() {
        let args: Args =
            serde_json::from_value(json!({"dandiset_id": "000001", "glob": ""})).unwrap();
        let v = serde_json::to_value(args.normalized()).unwrap();
        assert!(v.get("glob").is_none());
    }
}
