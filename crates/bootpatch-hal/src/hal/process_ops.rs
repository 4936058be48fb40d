//! Process execution helpers.
//!
//! External commands are "world-touching" and only the command backend
//! calls these. Every run is bounded by a timeout; stderr is drained on a
//! helper thread so a chatty child cannot deadlock on a full pipe.

use crate::{HalError, HalResult};
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// How a long-running collaborator finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitInfo {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub message: String,
}

impl ExitInfo {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            message: String::new(),
        }
    }

    pub fn failed(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

fn map_command_err(program: &str, err: io::Error) -> HalError {
    if err.kind() == io::ErrorKind::NotFound {
        return HalError::CommandNotFound(program.to_string());
    }
    HalError::Io(err)
}

fn output_failed(program: &str, output: &Output) -> HalError {
    HalError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    child.stderr.take().map(|stderr| {
        std::thread::spawn(move || {
            let mut s = String::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_string(&mut s);
            s
        })
    })
}

fn kill_and_reap(child: &mut Child, stderr_handle: &mut Option<JoinHandle<String>>) {
    let _ = child.kill();
    let _ = child.wait();
    if let Some(h) = stderr_handle.take() {
        let _ = h.join();
    }
}

/// Run to completion and collect both streams.
pub fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<Output> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    let mut stdout = child.stdout.take();
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(out) = stdout.as_mut() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let mut stderr_handle = drain_stderr(&mut child);

    let status = match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            kill_and_reap(&mut child, &mut stderr_handle);
            let _ = stdout_handle.join();
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle
        .take()
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
        .into_bytes();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Run to completion and return stdout; a non-zero exit is an error.
pub fn checked_stdout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<String> {
    let output = output_with_timeout(program, cmd, timeout)?;
    if !output.status.success() {
        return Err(output_failed(program, &output));
    }
    Ok(String::from_utf8(output.stdout)?)
}

/// Run a command, handing each stdout line to `on_line` as soon as it is
/// read. A non-zero exit is reported through [`ExitInfo`], not as an error.
pub fn stream_lines(
    program: &str,
    cmd: &mut Command,
    timeout: Duration,
    on_line: &mut dyn FnMut(&str),
) -> HalResult<ExitInfo> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| map_command_err(program, e))?;

    let mut stderr_handle = drain_stderr(&mut child);

    let (tx, rx) = mpsc::channel::<io::Result<String>>();
    if let Some(stdout) = child.stdout.take() {
        std::thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let line = match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    // Tools print progress in whatever encoding they like.
                    Ok(_) => Ok(String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string()),
                    Err(err) => Err(err),
                };
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        });
    }

    let start = Instant::now();
    loop {
        if start.elapsed() > timeout {
            kill_and_reap(&mut child, &mut stderr_handle);
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(line)) => on_line(&line),
            Ok(Err(err)) => {
                kill_and_reap(&mut child, &mut stderr_handle);
                return Err(HalError::Io(err));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            // stdout closed: the child is exiting.
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = match child.wait_timeout(EXIT_GRACE).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            kill_and_reap(&mut child, &mut stderr_handle);
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: EXIT_GRACE.as_secs(),
            });
        }
    };
    let stderr = stderr_handle
        .take()
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    if status.success() {
        Ok(ExitInfo::success())
    } else {
        log::warn!("{} exited with {:?}", program, status.code());
        Ok(ExitInfo::failed(status.code(), stderr.trim()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn stream_lines_delivers_each_line_in_order() {
        let mut lines = Vec::new();
        let exit = stream_lines(
            "sh",
            &mut sh("echo one; echo two; printf three"),
            Duration::from_secs(10),
            &mut |line| lines.push(line.to_string()),
        )
        .unwrap();
        assert!(exit.is_success());
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn stream_lines_survives_invalid_utf8_output() {
        let mut lines = Vec::new();
        let exit = stream_lines(
            "sh",
            &mut sh("printf 'Copying\\n\\377\\376 progress\\r\\n'; sleep 1; echo done"),
            Duration::from_secs(10),
            &mut |line| lines.push(line.to_string()),
        )
        .unwrap();
        assert!(exit.is_success());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Copying");
        assert!(lines[1].ends_with(" progress"));
        assert!(lines[1].contains('\u{FFFD}'));
        assert_eq!(lines[2], "done");
    }

    #[test]
    fn stream_lines_reports_exit_code_and_stderr() {
        let exit = stream_lines(
            "sh",
            &mut sh("echo working; echo 'disk busy' >&2; exit 3"),
            Duration::from_secs(10),
            &mut |_| {},
        )
        .unwrap();
        assert_eq!(exit, ExitInfo::failed(Some(3), "disk busy"));
    }

    #[test]
    fn stream_lines_times_out() {
        let err = stream_lines(
            "sh",
            &mut sh("exec sleep 5"),
            Duration::from_millis(300),
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, HalError::CommandTimeout { .. }));
    }

    #[test]
    fn missing_program_is_command_not_found() {
        let err = checked_stdout(
            "bootpatch-no-such-tool",
            &mut Command::new("bootpatch-no-such-tool"),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, HalError::CommandNotFound(_)));
    }

    #[test]
    fn checked_stdout_fails_on_non_zero_exit() {
        let err = checked_stdout("sh", &mut sh("echo nope >&2; exit 1"), Duration::from_secs(10))
            .unwrap_err();
        match err {
            HalError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
