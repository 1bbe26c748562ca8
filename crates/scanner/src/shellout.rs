//! Shell-out with a hard wall-clock timeout.
//!
//! Used by the Physical-ID Probe and the GIT project detector. Both need
//! the same contract: run a command, wait at most N seconds, and turn
//! "it failed" or "it hung" into `None` rather than an error — per the
//! error taxonomy, a shell-out timeout is never fatal.

use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

/// Run `program args…`, waiting at most `timeout` for it to finish.
///
/// Returns the trimmed stdout on success (exit code 0). Any failure to
/// spawn, non-zero exit, or timeout yields `None`. The child is killed
/// on timeout so it cannot outlive the caller.
pub fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .spawn()
        .ok()?;

    let (tx, rx) = mpsc::channel();
    let mut stdout = child.stdout.take();
    std::thread::spawn(move || {
        use std::io::Read;
        let mut buf = String::new();
        if let Some(out) = stdout.as_mut() {
            let _ = out.read_to_string(&mut buf);
        }
        let _ = tx.send(buf);
    });

    match wait_with_timeout(&mut child, timeout) {
        Some(true) => rx.recv_timeout(timeout).ok().map(|s| s.trim().to_string()),
        _ => {
            let _ = child.kill();
            let _ = child.wait();
            None
        }
    }
}

/// Poll `child` for up to `timeout`, returning `Some(true)` if it exited
/// successfully, `Some(false)` if it exited with a failure, or `None` if
/// the deadline elapsed while it was still running.
fn wait_with_timeout(child: &mut std::process::Child, timeout: Duration) -> Option<bool> {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status.success());
        }
        if std::time::Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_on_success() {
        let out = run_with_timeout("echo", &["hello"], Duration::from_secs(2));
        assert_eq!(out.as_deref(), Some("hello"));
    }

    #[test]
    fn missing_binary_yields_none() {
        let out = run_with_timeout(
            "archivum-definitely-not-a-real-binary",
            &[],
            Duration::from_secs(1),
        );
        assert!(out.is_none());
    }

    #[test]
    fn timeout_kills_and_yields_none() {
        let out = run_with_timeout("sleep", &["5"], Duration::from_millis(200));
        assert!(out.is_none());
    }
}
