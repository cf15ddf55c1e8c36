//! Script Execution
//!
//! Runs a skill's bundled script as a subprocess with the guard rails the
//! skill model requires: path containment, permission checks, interpreter
//! resolution, a hard timeout, and per-stream output ceilings.
//!
//! Each invocation walks a fixed pipeline, terminal on first failure:
//!
//! ```text
//! VALIDATE_PATH → CHECK_PERMISSIONS → RESOLVE_INTERPRETER
//!     → BUILD_ENVIRONMENT → SPAWN → CAPTURE/TIMEOUT → FINALIZE
//! ```
//!
//! Only pre-spawn failures are errors. Once the process runs, its fate
//! (non-zero exit, timeout, signal) is operational data reported in
//! [`ScriptExecutionResult`], never an `Err`.

use crate::error::{Result, SkillError};
use crate::path_security::PathValidator;
use crate::types::{ScriptMetadata, SkillMetadata};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Per-stream capture ceiling for stdout and stderr.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Ceiling on the serialized JSON argument payload delivered on stdin.
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 8192;

/// How long to keep draining output after a timed-out process was killed.
/// An orphaned grandchild may hold the pipes open indefinitely; partial
/// output captured so far is still returned when the grace period expires.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Outcome of one script execution. Created fresh per invocation and never
/// cached; scripts are not assumed idempotent.
#[derive(Debug, Clone)]
pub struct ScriptExecutionResult {
    /// Process exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// True only for a clean zero exit with no timeout and no signal.
    pub success: bool,
    /// Captured standard output, truncated at [`MAX_OUTPUT_BYTES`].
    pub stdout: String,
    /// Captured standard error, truncated at [`MAX_OUTPUT_BYTES`].
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    /// Wall-clock execution time.
    pub duration: Duration,
    /// True when the process was killed because the timeout elapsed.
    pub timed_out: bool,
    /// Terminating signal number, if the process died to a signal.
    pub signal: Option<i32>,
    /// Absolute path of the executed script.
    pub script_path: PathBuf,
}

impl ScriptExecutionResult {
    /// Human-readable name for the terminating signal, if any.
    pub fn signal_name(&self) -> Option<String> {
        self.signal.map(|n| match n {
            1 => "SIGHUP".to_string(),
            2 => "SIGINT".to_string(),
            6 => "SIGABRT".to_string(),
            9 => "SIGKILL".to_string(),
            11 => "SIGSEGV".to_string(),
            15 => "SIGTERM".to_string(),
            other => format!("SIG{other}"),
        })
    }
}

/// Executes skill scripts with a fixed timeout.
pub struct ScriptExecutor {
    timeout: Duration,
}

impl ScriptExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a script with JSON arguments delivered on stdin.
    ///
    /// The child inherits the host environment plus `SKILL_NAME`,
    /// `SKILL_BASE_DIR`, `SKILL_VERSION`, and `SKILLKIT_VERSION`. Argument
    /// keys are lowercased before serialization so caller-side case
    /// variance cannot desynchronize with the script's expectations.
    pub async fn execute(
        &self,
        script: &ScriptMetadata,
        skill: &SkillMetadata,
        base_dir: &Path,
        arguments: &HashMap<String, Value>,
    ) -> Result<ScriptExecutionResult> {
        // VALIDATE_PATH
        let validator = PathValidator::new(base_dir);
        let script_path = validator.resolve(&script.path)?;

        // CHECK_PERMISSIONS
        check_permissions(&script_path)?;

        // RESOLVE_INTERPRETER
        let interpreter = script.script_type.interpreter();
        let interpreter_path = find_in_path(interpreter)
            .ok_or_else(|| SkillError::InterpreterNotFound(interpreter.to_string()))?;

        // Serialize before spawn so serialization failures never leave a
        // stray child process.
        let payload = serialize_arguments(arguments)?;

        debug!(
            skill = %skill.name,
            script = %script.name,
            interpreter,
            timeout_secs = self.timeout.as_secs(),
            "executing skill script"
        );

        // BUILD_ENVIRONMENT + SPAWN
        let mut cmd = Command::new(interpreter_path);
        cmd.arg(&script_path)
            .current_dir(base_dir)
            .env("SKILL_NAME", &skill.name)
            .env("SKILL_BASE_DIR", base_dir)
            .env("SKILL_VERSION", &skill.version)
            .env("SKILLKIT_VERSION", env!("CARGO_PKG_VERSION"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take down the whole tree, not
        // just the interpreter.
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = cmd.spawn()?;

        // Feed the payload from a task: a script that never reads stdin must
        // not deadlock the executor on a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                let _ = stdin.write_all(&payload).await;
                let _ = stdin.shutdown().await;
            });
        }

        // CAPTURE/ENFORCE_TIMEOUT: both streams are read concurrently with
        // execution; readers keep draining after the ceiling so the child is
        // never blocked on a full pipe just because its output was capped.
        // The capture buffers are shared so partial output survives even if
        // a drain has to be cut short after a kill.
        let stdout_cap = Arc::new(Mutex::new(StreamCapture::default()));
        let stderr_cap = Arc::new(Mutex::new(StreamCapture::default()));
        let mut stdout_task = tokio::spawn(drain_stream(
            child.stdout.take(),
            MAX_OUTPUT_BYTES,
            Arc::clone(&stdout_cap),
        ));
        let mut stderr_task = tokio::spawn(drain_stream(
            child.stderr.take(),
            MAX_OUTPUT_BYTES,
            Arc::clone(&stderr_cap),
        ));

        let mut timed_out = false;
        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                timed_out = true;
                warn!(
                    skill = %skill.name,
                    script = %script.name,
                    timeout_secs = self.timeout.as_secs(),
                    "script timed out; killing process"
                );
                if let Some(pid) = child.id() {
                    kill_process_group(pid);
                }
                child.kill().await.ok();
                // Reap so no zombie remains; also yields the signal status.
                child.wait().await?
            }
        };

        // The process's fate is decided; the clock stops here even if the
        // drain below needs a moment to reach EOF.
        let duration = start.elapsed();

        if timed_out {
            // A killed shell may leave grandchildren holding the pipes open;
            // do not wait on them forever.
            let drains = async {
                let _ = (&mut stdout_task).await;
                let _ = (&mut stderr_task).await;
            };
            if tokio::time::timeout(DRAIN_GRACE, drains).await.is_err() {
                stdout_task.abort();
                stderr_task.abort();
            }
        } else {
            stdout_task.await.map_err(join_error)?;
            stderr_task.await.map_err(join_error)?;
        }

        let (stdout_buf, stdout_truncated) = take_capture(&stdout_cap);
        let (stderr_buf, stderr_truncated) = take_capture(&stderr_cap);

        // FINALIZE
        let signal = termination_signal(&status);
        let result = ScriptExecutionResult {
            exit_code: status.code(),
            success: status.success() && !timed_out,
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            stdout_truncated,
            stderr_truncated,
            duration,
            timed_out,
            signal,
            script_path,
        };

        debug!(
            skill = %skill.name,
            script = %script.name,
            exit_code = ?result.exit_code,
            success = result.success,
            timed_out = result.timed_out,
            duration_ms = duration.as_millis() as u64,
            "script execution finished"
        );
        Ok(result)
    }
}

/// Lowercase argument keys and serialize to a compact JSON object.
fn serialize_arguments(arguments: &HashMap<String, Value>) -> Result<Vec<u8>> {
    let normalized: serde_json::Map<String, Value> = arguments
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();
    let payload = serde_json::to_vec(&Value::Object(normalized))?;
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(SkillError::ArgumentsTooLarge {
            size: payload.len(),
            limit: MAX_PAYLOAD_BYTES,
        });
    }
    Ok(payload)
}

/// Reject scripts carrying setuid/setgid bits.
#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode();
    if mode & 0o6000 != 0 {
        return Err(SkillError::ScriptPermission {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Locate an interpreter binary on PATH.
fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Send SIGKILL to the child's whole process group. Shell scripts routinely
/// fork; killing only the interpreter would leave grandchildren running and
/// holding the output pipes open.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    unsafe {
        libc::kill(-(pid as i32), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(unix)]
fn termination_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

fn join_error(e: tokio::task::JoinError) -> SkillError {
    SkillError::Io(std::io::Error::other(e))
}

#[derive(Default)]
struct StreamCapture {
    buf: Vec<u8>,
    truncated: bool,
}

fn take_capture(capture: &Mutex<StreamCapture>) -> (Vec<u8>, bool) {
    let mut capture = capture.lock();
    (std::mem::take(&mut capture.buf), capture.truncated)
}

/// Read a stream into a capped shared buffer, draining (and discarding)
/// anything past the ceiling so the writer never blocks on a full pipe.
async fn drain_stream<R>(reader: Option<R>, cap: usize, capture: Arc<Mutex<StreamCapture>>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let mut capture = capture.lock();
                if capture.truncated {
                    continue;
                }
                let remaining = cap - capture.buf.len();
                if n <= remaining {
                    capture.buf.extend_from_slice(&chunk[..n]);
                } else {
                    capture.buf.extend_from_slice(&chunk[..remaining]);
                    capture.truncated = true;
                }
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn argument_keys_lowercased_and_compact() {
        let mut args = HashMap::new();
        args.insert("File".to_string(), json!("x.pdf"));
        args.insert("PAGES".to_string(), json!([1, 2]));

        let payload = serialize_arguments(&args).unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["file"], "x.pdf");
        assert_eq!(value["pages"], json!([1, 2]));
        assert!(value.get("File").is_none());
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut args = HashMap::new();
        args.insert("blob".to_string(), json!("a".repeat(MAX_PAYLOAD_BYTES)));
        let err = serialize_arguments(&args).unwrap_err();
        assert!(matches!(err, SkillError::ArgumentsTooLarge { .. }));
    }

    #[test]
    fn shell_interpreter_present_on_unix() {
        #[cfg(unix)]
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("definitely-not-an-interpreter-xyz").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn setuid_script_rejected() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("evil.sh");
        std::fs::write(&script, "echo hi").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o4755)).unwrap();

        let err = check_permissions(&script).unwrap_err();
        assert!(matches!(err, SkillError::ScriptPermission { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn plain_executable_accepted() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ok.sh");
        std::fs::write(&script, "echo hi").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(check_permissions(&script).is_ok());
    }

    #[tokio::test]
    async fn capture_marks_truncation_only_past_cap() {
        let data = vec![b'a'; 100];
        let capture = Arc::new(Mutex::new(StreamCapture::default()));
        drain_stream(Some(&data[..]), 100, Arc::clone(&capture)).await;
        let (buf, truncated) = take_capture(&capture);
        assert_eq!(buf.len(), 100);
        assert!(!truncated, "exactly at the cap is not truncated");

        let data = vec![b'a'; 150];
        let capture = Arc::new(Mutex::new(StreamCapture::default()));
        drain_stream(Some(&data[..]), 100, Arc::clone(&capture)).await;
        let (buf, truncated) = take_capture(&capture);
        assert_eq!(buf.len(), 100);
        assert!(truncated);
    }

    #[test]
    fn signal_names() {
        let result = ScriptExecutionResult {
            exit_code: None,
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration: Duration::from_millis(1),
            timed_out: false,
            signal: Some(9),
            script_path: PathBuf::new(),
        };
        assert_eq!(result.signal_name().as_deref(), Some("SIGKILL"));
    }
}
