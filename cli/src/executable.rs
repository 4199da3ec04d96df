use std::{io, path::PathBuf, process::Stdio, sync::Arc};

use async_trait::async_trait;
use scold_core::testing::{CancelToken, ExecutionError, ExecutionResult, ProcessExecutor, Stdin};
use tokio::process::Command;

/// Launches a program on the local machine.
#[derive(Debug, Clone)]
pub struct Executable {
    path: PathBuf,
    args: Vec<String>,
}

impl Executable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl ProcessExecutor for Executable {
    async fn run(&self, cancel: CancelToken, mut input: Stdin) -> Result<ExecutionResult, ExecutionError> {
        let mut proc = Command::new(&self.path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::Spawn {
                path: self.path.display().to_string(),
                source: Arc::new(e),
            })?;

        let open_err = |name: &str| ExecutionError::Internal(format!("Failed to open {}", name));
        let mut stdin = proc.stdin.take().ok_or_else(|| open_err("stdin"))?;
        let mut stdout = proc.stdout.take().ok_or_else(|| open_err("stdout"))?;
        let mut stderr = proc.stderr.take().ok_or_else(|| open_err("stderr"))?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let outcome = {
            let feed_stdin = async move {
                let res = tokio::io::copy(&mut input, &mut stdin).await;
                drop(stdin); // NOTE: the program sees EOF only after this
                match res {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(0),
                    other => other,
                }
            };
            let communicate = async {
                tokio::try_join!(
                    feed_stdin,
                    tokio::io::copy(&mut stdout, &mut stdout_buf),
                    tokio::io::copy(&mut stderr, &mut stderr_buf),
                    proc.wait(),
                )
            };
            tokio::select! {
                res = communicate => Some(res),
                _ = cancel.cancelled() => None,
            }
        };

        let Some(res) = outcome else {
            proc.kill()
                .await
                .unwrap_or_else(|e| log::warn!("Failed to kill TLE process: {:#}", e));
            return Err(ExecutionError::Killed);
        };
        let (_, _, _, status) =
            res.map_err(|e| ExecutionError::io("Failed to communicate with subprocess", e))?;

        Ok(ExecutionResult {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout_buf).into(),
            stderr: String::from_utf8_lossy(&stderr_buf).into(),
        })
    }
}

#[cfg(all(test, unix))]
mod test {
    use std::{io::Cursor, time::Duration};

    use super::*;

    fn sh(script: &str) -> Executable {
        Executable::new("/bin/sh").args(vec!["-c".into(), script.into()])
    }

    fn stdin(s: &str) -> Stdin {
        Box::new(Cursor::new(s.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn should_echo_stdin() {
        let res = sh("read x; echo \"hello_$x\"")
            .run(CancelToken::new(), stdin("123\n"))
            .await
            .unwrap();
        assert_eq!(
            res,
            ExecutionResult {
                exit_code: 0,
                stdout: "hello_123\n".into(),
                stderr: "".into(),
            }
        );
    }

    #[tokio::test]
    async fn should_succeed_even_if_stdin_is_not_read() {
        let big_input = "x".repeat(1 << 20);
        let res = sh("echo hi").run(CancelToken::new(), stdin(&big_input)).await.unwrap();
        assert_eq!(res.exit_code, 0);
        assert_eq!(res.stdout, "hi\n");
    }

    #[tokio::test]
    async fn should_report_exit_code_and_stderr() {
        let res = sh("echo oops >&2; exit 42")
            .run(CancelToken::new(), stdin(""))
            .await
            .unwrap();
        assert_eq!(res.exit_code, 42);
        assert_eq!(res.stderr, "oops\n");
    }

    #[tokio::test]
    async fn should_stop_when_cancelled() {
        let cancel = CancelToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                cancel.cancel();
            })
        };
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            sh("sleep 10").run(cancel, stdin("")),
        )
        .await
        .expect("cancellation was ignored");
        assert!(matches!(res, Err(ExecutionError::Killed)));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn should_fail_to_spawn_missing_program() {
        let res = Executable::new("/definitely/not/here")
            .run(CancelToken::new(), stdin(""))
            .await;
        assert!(matches!(res, Err(ExecutionError::Spawn { .. })));
    }
}
