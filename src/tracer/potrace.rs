//! potrace backend
//!
//! Runs `potrace <in.bmp> -s -o <out.svg> --turdsize <N>` once per image.
//! The process is killed if it outlives the configured timeout.

use crate::config::Config;
use crate::error::StageError;
use crate::tracer::Tracer;
use futures::future::{BoxFuture, FutureExt};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub struct Potrace {
    executable: PathBuf,
    timeout: Duration,
}

impl Potrace {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.potrace_path.clone(), config.trace_timeout())
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Whether the executable exists, either at its path or on PATH
    pub fn is_available(&self) -> bool {
        if self.executable.components().count() > 1 || self.executable.is_absolute() {
            return self.executable.is_file();
        }

        let file_name = format!(
            "{}{}",
            self.executable.to_string_lossy(),
            std::env::consts::EXE_SUFFIX
        );
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(&file_name).is_file()))
            .unwrap_or(false)
    }

    fn command_args(bitmap: &Path, svg: &Path, speck_size: u32) -> Vec<OsString> {
        vec![
            bitmap.as_os_str().to_owned(),
            OsString::from("-s"),
            OsString::from("-o"),
            svg.as_os_str().to_owned(),
            OsString::from("--turdsize"),
            OsString::from(speck_size.to_string()),
        ]
    }

    async fn run(&self, bitmap: &Path, svg: &Path, speck_size: u32) -> Result<(), StageError> {
        let child = Command::new(&self.executable)
            .args(Self::command_args(bitmap, svg, speck_size))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StageError::ToolNotFound(self.executable.clone()),
                _ => StageError::ToolError(format!(
                    "Failed to start {}: {}",
                    self.executable.display(),
                    e
                )),
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                StageError::ToolError(format!("Failed to wait for potrace: {}", e))
            })?,
            Err(_) => {
                tracing::warn!(
                    "potrace exceeded {:?} on {}, killing it",
                    self.timeout,
                    bitmap.display()
                );
                return Err(StageError::ToolError(format!(
                    "Timed out after {}s",
                    self.timeout.as_secs_f32()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::ToolError(format!(
                "potrace exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Tracer for Potrace {
    fn name(&self) -> &'static str {
        "potrace"
    }

    fn trace<'a>(
        &'a self,
        bitmap: &'a Path,
        svg: &'a Path,
        speck_size: u32,
    ) -> BoxFuture<'a, Result<(), StageError>> {
        self.run(bitmap, svg, speck_size).boxed()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn stub_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("potrace-stub.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_command_args_order() {
        let args = Potrace::command_args(Path::new("in.bmp"), Path::new("out.svg"), 7);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["in.bmp", "-s", "-o", "out.svg", "--turdsize", "7"]);
    }

    #[tokio::test]
    async fn test_trace_success_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = stub_script(dir.path(), "echo \"$@\" > \"$4\"");
        let svg = dir.path().join("out.svg");

        let potrace = Potrace::new(&script, Duration::from_secs(10));
        potrace.trace(Path::new("in.bmp"), &svg, 3).await.unwrap();

        let recorded = std::fs::read_to_string(&svg).unwrap();
        assert_eq!(recorded.trim(), format!("in.bmp -s -o {} --turdsize 3", svg.display()));
    }

    #[tokio::test]
    async fn test_missing_executable_is_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let potrace = Potrace::new(dir.path().join("no-such-potrace"), Duration::from_secs(1));
        assert!(!potrace.is_available());

        let err = potrace
            .trace(Path::new("in.bmp"), Path::new("out.svg"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = stub_script(dir.path(), "echo 'bad bitmap' >&2\nexit 3");

        let potrace = Potrace::new(&script, Duration::from_secs(10));
        assert!(potrace.is_available());

        let err = potrace
            .trace(Path::new("in.bmp"), Path::new("out.svg"), 2)
            .await
            .unwrap_err();
        match err {
            StageError::ToolError(message) => assert!(message.contains("bad bitmap")),
            other => panic!("Expected ToolError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hung_tracer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = stub_script(dir.path(), "sleep 30");

        let potrace = Potrace::new(&script, Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = potrace
            .trace(Path::new("in.bmp"), Path::new("out.svg"), 2)
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::ToolError(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
