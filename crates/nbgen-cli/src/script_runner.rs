//! Running generated scripts, with a headless matplotlib backend when needed

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;

static MATPLOTLIB_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"import\s+matplotlib|from\s+matplotlib").unwrap());

static PLOTTING_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.plot\(|\.imshow\(|\.scatter\(|\.hist\(|\.bar\(|plt\.show\(|\.figure\(").unwrap()
});

static IMPORT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(import\s+matplotlib[^\n]*)(\n|$)").unwrap());

static FROM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(from\s+matplotlib[^\n]*)(\n|$)").unwrap());

const BACKEND_LINES: &str = "import matplotlib\nmatplotlib.use(\"Agg\")";

/// Outcome of running a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    pub success: bool,
    /// Captured stdout, when non-empty
    pub stdout: Option<String>,
    /// Captured stderr, only when the run failed
    pub stderr: Option<String>,
}

impl ScriptRun {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: None,
            stderr: Some(message.into()),
        }
    }
}

/// True when the script imports matplotlib and draws something
pub fn uses_matplotlib(content: &str) -> bool {
    MATPLOTLIB_IMPORT.is_match(content) && PLOTTING_CALL.is_match(content)
}

/// Force the non-interactive `Agg` backend so plots never open a window
pub fn add_matplotlib_backend(content: &str) -> String {
    if IMPORT_LINE.is_match(content) {
        IMPORT_LINE
            .replacen(content, 1, format!("${{1}}\n{}${{2}}", BACKEND_LINES))
            .into_owned()
    } else if FROM_LINE.is_match(content) {
        FROM_LINE
            .replacen(content, 1, format!("{}\n${{1}}${{2}}", BACKEND_LINES))
            .into_owned()
    } else {
        format!("{}\n\n{}", BACKEND_LINES, content)
    }
}

/// Path of the patched copy: `dir/name.py` becomes `dir/name_run.py`
pub fn run_copy_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}_run.{}", stem, ext.to_string_lossy()),
        None => format!("{}_run", stem),
    };
    path.with_file_name(file_name)
}

/// Runs scripts with a fixed interpreter
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    python: String,
}

impl ScriptRunner {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// Run `path`. With `capture` off the script inherits this process's
    /// stdout and stderr and nothing is returned but the status.
    pub async fn run_script(&self, path: &Path, capture: bool) -> ScriptRun {
        tracing::debug!(python = %self.python, script = %path.display(), "Running script");

        if !capture {
            return match Command::new(&self.python).arg(path).status().await {
                Ok(status) => ScriptRun {
                    success: status.success(),
                    stdout: None,
                    stderr: None,
                },
                Err(e) => ScriptRun::failed(format!("Failed to run {}: {}", self.python, e)),
            };
        }

        let output = match Command::new(&self.python)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(o) => o,
            Err(e) => return ScriptRun::failed(format!("Failed to run {}: {}", self.python, e)),
        };

        let success = output.status.success();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        ScriptRun {
            success,
            stdout: (!stdout.is_empty()).then_some(stdout),
            stderr: (!success && !stderr.is_empty()).then_some(stderr),
        }
    }

    /// Run `path`, first writing a patched `_run` copy when it plots with
    /// matplotlib.
    pub async fn preprocess_and_run(&self, path: &Path, capture: bool) -> std::io::Result<ScriptRun> {
        let content = tokio::fs::read_to_string(path).await?;
        if !uses_matplotlib(&content) {
            return Ok(self.run_script(path, capture).await);
        }

        let run_path = run_copy_path(path);
        tokio::fs::write(&run_path, add_matplotlib_backend(&content)).await?;
        tracing::info!(script = %run_path.display(), "Wrote copy with Agg backend");
        Ok(self.run_script(&run_path, capture).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detects_matplotlib_plotting() {
        let script = "import matplotlib.pyplot as plt\n\nplt.plot([1, 2, 3], [4, 5, 6])\nplt.show()\n";
        assert!(uses_matplotlib(script));
    }

    #[test]
    fn test_import_without_plotting_is_ignored() {
        assert!(!uses_matplotlib("import matplotlib\nprint(matplotlib.__version__)\n"));
        assert!(!uses_matplotlib("import numpy as np\nx = np.array([1, 2, 3])\nprint(x)\n"));
    }

    #[test]
    fn test_backend_after_import() {
        let patched = add_matplotlib_backend("import matplotlib.pyplot as plt\n\nplt.plot([1, 2, 3])");
        assert_eq!(
            patched,
            "import matplotlib.pyplot as plt\nimport matplotlib\nmatplotlib.use(\"Agg\")\n\nplt.plot([1, 2, 3])"
        );
    }

    #[test]
    fn test_backend_before_from_import() {
        let patched = add_matplotlib_backend("from matplotlib import pyplot as plt\n\nplt.plot([1, 2, 3])");
        assert_eq!(
            patched,
            "import matplotlib\nmatplotlib.use(\"Agg\")\nfrom matplotlib import pyplot as plt\n\nplt.plot([1, 2, 3])"
        );
    }

    #[test]
    fn test_backend_prepended_without_import() {
        let patched = add_matplotlib_backend("import numpy as np\n\nx = np.array([1, 2, 3])");
        assert!(patched.starts_with("import matplotlib\nmatplotlib.use(\"Agg\")\n\nimport numpy"));
    }

    #[test]
    fn test_backend_on_last_line_import() {
        let patched = add_matplotlib_backend("x = 1\nimport matplotlib.pyplot as plt");
        assert!(patched.ends_with("import matplotlib.pyplot as plt\nimport matplotlib\nmatplotlib.use(\"Agg\")"));
    }

    #[test]
    fn test_run_copy_path() {
        assert_eq!(
            run_copy_path(Path::new("out/dandiset_000001_exploration.py")),
            PathBuf::from("out/dandiset_000001_exploration_run.py")
        );
        assert_eq!(run_copy_path(Path::new("script")), PathBuf::from("script_run"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_unsuccessful_run() {
        let runner = ScriptRunner::new("/nonexistent/interpreter");
        let run = runner.run_script(Path::new("x.py"), true).await;
        assert!(!run.success);
        assert!(run.stdout.is_none());
        assert!(run.stderr.unwrap().contains("/nonexistent/interpreter"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_on_success() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("ok.sh");
        std::fs::write(&script, "echo hello\necho ignored >&2\n").unwrap();

        let run = ScriptRunner::new("sh").run_script(&script, true).await;
        assert!(run.success);
        assert_eq!(run.stdout.as_deref(), Some("hello\n"));
        assert_eq!(run.stderr, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stderr_on_failure() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "echo Error message >&2\nexit 3\n").unwrap();

        let run = ScriptRunner::new("sh").run_script(&script, true).await;
        assert!(!run.success);
        assert_eq!(run.stdout, None);
        assert_eq!(run.stderr.as_deref(), Some("Error message\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_uncaptured_run_reports_status_only() {
        let dir = TempDir::new().unwrap();
        let ok = dir.path().join("ok.sh");
        let fail = dir.path().join("fail.sh");
        std::fs::write(&ok, "exit 0\n").unwrap();
        std::fs::write(&fail, "exit 2\n").unwrap();

        let runner = ScriptRunner::new("sh");
        let run = runner.run_script(&ok, false).await;
        assert_eq!(
            run,
            ScriptRun {
                success: true,
                stdout: None,
                stderr: None
            }
        );
        let run = runner.run_script(&fail, false).await;
        assert!(!run.success);
        assert!(run.stderr.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_preprocess_runs_original_without_matplotlib() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("plain.py");
        std::fs::write(&script, "print('Hello, world!')\n").unwrap();

        // `cat` echoes whichever file it was given
        let run = ScriptRunner::new("cat")
            .preprocess_and_run(&script, true)
            .await
            .unwrap();
        assert_eq!(run.stdout.as_deref(), Some("print('Hello, world!')\n"));
        assert!(!dir.path().join("plain_run.py").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_preprocess_runs_patched_copy_with_matplotlib() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("plots.py");
        let original = "import matplotlib.pyplot as plt\nplt.plot([1, 2])\nplt.show()\n";
        std::fs::write(&script, original).unwrap();

        let run = ScriptRunner::new("cat")
            .preprocess_and_run(&script, true)
            .await
            .unwrap();
        let copy = dir.path().join("plots_run.py");
        assert!(copy.exists());
        assert!(run.stdout.unwrap().contains("matplotlib.use(\"Agg\")"));
        assert_eq!(std::fs::read_to_string(&script).unwrap(), original);
    }

    #[tokio::test]
    async fn test_preprocess_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = ScriptRunner::new("python3")
            .preprocess_and_run(&dir.path().join("missing.py"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
