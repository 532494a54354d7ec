use std::process::{Command, Stdio};

use anyhow::{Context as _, Result};
use nix::sys::signal::{signal, SigHandler, Signal};
use tilewm_config::ReapPolicy;
use tracing::{debug, warn};

/// Launches applications without ever waiting on them from the event loop.
#[derive(Debug, Clone, Copy)]
pub struct Launcher {
    policy: ReapPolicy,
}

impl Launcher {
    /// Installs the process-wide part of `policy`.
    pub fn new(policy: ReapPolicy) -> Result<Self> {
        if policy == ReapPolicy::IgnoreSigchld {
            // SAFETY: SIG_IGN installs no handler code; it only tells the
            // kernel to reap children itself.
            unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }.context("ignore SIGCHLD")?;
        }
        Ok(Self { policy })
    }

    /// A launcher that leaves signal dispositions untouched.
    pub fn with_policy(policy: ReapPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ReapPolicy {
        self.policy
    }

    /// Spawns `argv` detached from the manager's stdio. Failure to start is
    /// logged; a child's exit status is never inspected.
    pub fn launch(&self, argv: &[String]) {
        let Some((program, args)) = argv.split_first() else {
            warn!("Refusing to launch an empty command");
            return;
        };

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                debug!("Launched {} (pid {})", program, child.id());
                if self.policy == ReapPolicy::WaitThread {
                    std::thread::spawn(move || {
                        let _ = child.wait();
                    });
                }
            }
            Err(e) => warn!("Failed to launch {}: {}", program, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_tolerates_missing_programs() {
        let launcher = Launcher::with_policy(ReapPolicy::WaitThread);
        launcher.launch(&["/nonexistent/tilewm-test-binary".to_string()]);
        launcher.launch(&[]);
        assert_eq!(launcher.policy(), ReapPolicy::WaitThread);
    }

    #[test]
    fn test_launch_returns_without_waiting() {
        let launcher = Launcher::with_policy(ReapPolicy::WaitThread);
        let started = std::time::Instant::now();
        launcher.launch(&["sleep".to_string(), "2".to_string()]);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }
}
