//! Executes the tasks of a planned step: external commands, HTTPS downloads
//! and archive extraction.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::InstallError;
use crate::toolchain::{CommandSpec, Task};

/// Shared by every runner thread; holds the HTTP client and run-wide switches.
///
/// Clones share one package manager lock, so apt, dnf, pacman and brew never
/// run twice at once while downloads stay parallel.
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
    dry_run: bool,
    step_delay: Duration,
    package_lock: Arc<Mutex<()>>,
}

impl Executor {
    pub fn new(dry_run: bool, step_delay: Duration) -> Result<Self, InstallError> {
        // Archives can take minutes; only the connect phase is bounded.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(None::<Duration>)
            .user_agent(concat!("decor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| InstallError::Download {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            dry_run,
            step_delay,
            package_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Take the package manager lock, calling `on_wait` first if another
    /// runner holds it.
    pub fn lock_package_manager(&self, on_wait: impl FnOnce()) -> MutexGuard<'_, ()> {
        match self.package_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                on_wait();
                self.package_lock
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
            }
        }
    }

    /// Wait the configured delay before a step starts.
    pub fn pause(&self) {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
    }

    /// Run one task. `on_fraction` receives download progress in [0, 1].
    pub fn execute(
        &self,
        task: &Task,
        on_fraction: &mut dyn FnMut(f64),
    ) -> Result<(), InstallError> {
        if self.dry_run {
            info!("[dry-run] {}", describe(task));
            on_fraction(1.0);
            return Ok(());
        }
        match task {
            Task::Run(command) => run_command(command),
            Task::Download { url, dest } => self.download_to_file(url, dest, on_fraction),
            Task::ExtractTarGz {
                archive,
                into,
                elevate,
            } => {
                let command = CommandSpec::new(
                    "tar",
                    [
                        "-xzf".to_string(),
                        archive.display().to_string(),
                        "-C".to_string(),
                        into.display().to_string(),
                    ],
                )
                .elevated(*elevate);
                run_command(&command)
            }
        }
    }

    fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        on_fraction: &mut dyn FnMut(f64),
    ) -> Result<(), InstallError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| InstallError::Io {
                action: "failed to create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        info!("downloading {url} to {}", dest.display());
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| InstallError::Download {
                url: url.to_string(),
                source,
            })?;

        let total_size = response.content_length();
        let mut file = fs::File::create(dest).map_err(|source| InstallError::Io {
            action: "failed to create",
            path: dest.to_path_buf(),
            source,
        })?;

        let mut buffer = [0; 8192];
        let mut downloaded: u64 = 0;
        loop {
            let n = response.read(&mut buffer).map_err(|source| InstallError::Io {
                action: "failed to read response for",
                path: dest.to_path_buf(),
                source,
            })?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).map_err(|source| InstallError::Io {
                action: "failed to write",
                path: dest.to_path_buf(),
                source,
            })?;
            downloaded += n as u64;

            if let Some(total) = total_size.filter(|total| *total > 0) {
                on_fraction(downloaded as f64 / total as f64);
            }
        }

        debug!(
            "downloaded {:.1} MB from {url}",
            downloaded as f64 / 1024.0 / 1024.0
        );
        on_fraction(1.0);
        Ok(())
    }
}

/// Human-readable form of a task, used for dry-run and debug logs.
pub fn describe(task: &Task) -> String {
    match task {
        Task::Run(command) => format!("run: {command}"),
        Task::Download { url, dest } => format!("download {url} -> {}", dest.display()),
        Task::ExtractTarGz {
            archive,
            into,
            elevate,
        } => format!(
            "extract {} into {}{}",
            archive.display(),
            into.display(),
            if *elevate { " (sudo)" } else { "" }
        ),
    }
}

/// Run `command` to completion. Output lines go to the debug log; stderr is
/// kept for the error message when the exit status is non-zero.
pub fn run_command(command: &CommandSpec) -> Result<(), InstallError> {
    info!("running: {command}");
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| InstallError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let (pipe_tx, pipe_rx) = mpsc::channel::<(bool, String)>();

    if let Some(stdout) = child.stdout.take() {
        let tx_stdout = pipe_tx.clone();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                let _ = tx_stdout.send((false, line));
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let tx_stderr = pipe_tx.clone();
        thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                let _ = tx_stderr.send((true, line));
            }
        });
    }
    drop(pipe_tx);

    let mut stderr = String::new();
    while let Ok((is_stderr, line)) = pipe_rx.recv() {
        if is_stderr {
            debug!("[stderr] {line}");
            stderr.push_str(&line);
            stderr.push('\n');
        } else {
            debug!("{line}");
        }
    }

    let status = child.wait().map_err(|source| InstallError::Spawn {
        command: command.to_string(),
        source,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(InstallError::CommandFailed {
            command: command.to_string(),
            code: status.code(),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_describe_tasks() {
        let run = Task::Run(CommandSpec::new("rustup", ["update"]));
        assert_eq!(describe(&run), "run: rustup update");

        let extract = Task::ExtractTarGz {
            archive: PathBuf::from("/tmp/go.tar.gz"),
            into: PathBuf::from("/usr/local"),
            elevate: true,
        };
        assert_eq!(describe(&extract), "extract /tmp/go.tar.gz into /usr/local (sudo)");
    }

    #[test]
    fn test_dry_run_reports_full_fraction() {
        let executor = Executor::new(true, Duration::ZERO).unwrap();
        let task = Task::Download {
            url: "https://go.dev/dl/go1.25.5.linux-amd64.tar.gz".to_string(),
            dest: PathBuf::from("/nonexistent/decor/go.tar.gz"),
        };
        let mut fractions = Vec::new();
        executor.execute(&task, &mut |f| fractions.push(f)).unwrap();
        assert_eq!(fractions, vec![1.0]);
        assert!(!Path::new("/nonexistent/decor/go.tar.gz").exists());
    }

    #[test]
    fn test_spawn_failure() {
        let command = CommandSpec::new("decor-test-no-such-binary", ["--version"]);
        let err = run_command(&command).unwrap_err();
        assert!(matches!(err, InstallError::Spawn { .. }));
    }

    #[test]
    fn test_package_manager_lock_is_shared_by_clones() {
        let executor = Executor::new(true, Duration::ZERO).unwrap();
        let other = executor.clone();
        let guard = executor.lock_package_manager(|| panic!("lock should be free"));

        let (waiting_tx, waiting_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let _guard = other.lock_package_manager(|| waiting_tx.send(()).unwrap());
        });

        waiting_rx.recv().unwrap();
        drop(guard);
        handle.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_command_failure_keeps_stderr() {
        let command = CommandSpec::new("sh", ["-c", "echo progress; echo 'E: broken' >&2; exit 4"]);
        match run_command(&command).unwrap_err() {
            InstallError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(4));
                assert_eq!(stderr.trim(), "E: broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_success() {
        let command = CommandSpec::new("sh", ["-c", "echo ok"]);
        assert!(run_command(&command).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_gz() {
        let workdir = tempfile::tempdir().unwrap();
        let source = workdir.path().join("go");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("VERSION"), "go1.25.5\n").unwrap();

        let archive = workdir.path().join("go.tar.gz");
        let pack = CommandSpec::new(
            "tar",
            [
                "-czf".to_string(),
                archive.display().to_string(),
                "-C".to_string(),
                workdir.path().display().to_string(),
                "go".to_string(),
            ],
        );
        run_command(&pack).unwrap();

        let target = workdir.path().join("root");
        fs::create_dir(&target).unwrap();
        let executor = Executor::new(false, Duration::ZERO).unwrap();
        let task = Task::ExtractTarGz {
            archive,
            into: target.clone(),
            elevate: false,
        };
        executor.execute(&task, &mut |_| {}).unwrap();
        assert_eq!(fs::read_to_string(target.join("go/VERSION")).unwrap(), "go1.25.5\n");
    }
}
