//! Notebook generation for a Dandiset

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use nbgen_agent::{Agent, RunOutcome};
use nbgen_ai::Message;
use regex::Regex;
use serde_json::json;

static PYTHON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").unwrap());

static ANY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n]*\r?\n(.*?)```").unwrap());

const JUPYTEXT_HEADER: &str = "# ---
# jupyter:
#   jupytext:
#     text_representation:
#       extension: .py
#       format_name: percent
#       format_version: '1.3'
#       jupytext_version: 1.14.5
#   kernelspec:
#     display_name: Python 3
#     language: python
#     name: python3
# ---
";

const SYSTEM_PROMPT: &str = "You are an expert neuroscientist and Python developer. \
You write clear, runnable notebooks that help researchers explore datasets in the DANDI archive.

Use the tools to learn about the Dandiset before writing any code: read its metadata, list its assets, \
and inspect at least one NWB file to see how its data is laid out and how to load it.

Reply with the complete notebook as a single Python script in jupytext percent format inside one \
```python code block. Use `# %% [markdown]` cells for explanations and `# %%` cells for code.";

/// Where the notebook is written when no path is given
pub fn default_output_path(dandiset_id: &str) -> PathBuf {
    PathBuf::from(format!("dandiset_{}_exploration.py", dandiset_id))
}

/// Conversation that asks the model for a notebook
pub fn seed_messages(dandiset_id: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(format!(
            "Create an exploration notebook for Dandiset {id}. Introduce the dataset, show how to \
             list its assets with the DANDI API, load one NWB file with pynwb and lindi, and \
             visualize a few of its neurodata objects.",
            id = dandiset_id
        )),
    ]
}

/// Pull the script out of the model's answer.
///
/// Prefers the first ```python block, then the first fenced block of any
/// kind, then the whole answer.
pub fn extract_script(text: &str) -> String {
    let body = PYTHON_BLOCK
        .captures(text)
        .or_else(|| ANY_BLOCK.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let mut script = body.trim().to_string();
    script.push('\n');
    script
}

/// Prefix the jupytext header unless the script already has one
pub fn render_notebook(script: &str) -> String {
    if script.starts_with("# ---") {
        script.to_string()
    } else {
        format!("{}\n{}", JUPYTEXT_HEADER, script)
    }
}

/// A written notebook and the run that produced it
#[derive(Debug)]
pub struct GeneratedNotebook {
    pub path: PathBuf,
    pub outcome: RunOutcome,
}

/// Ask the agent for a notebook and write it to `output` (or the default
/// path). `run_id` is stored with the interaction log record.
pub async fn generate_notebook(
    agent: &Agent,
    dandiset_id: &str,
    output: Option<&Path>,
    run_id: &str,
) -> anyhow::Result<GeneratedNotebook> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(dandiset_id));

    let metadata = json!({"dandiset_id": dandiset_id, "run_id": run_id});
    let outcome = agent
        .run(seed_messages(dandiset_id), Some(metadata))
        .await
        .context("notebook generation failed")?;

    let notebook = render_notebook(&extract_script(&outcome.text));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, notebook)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), turns = outcome.turns, "Wrote notebook");
    Ok(GeneratedNotebook { path, outcome })
}
