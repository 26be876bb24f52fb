use std::{
    env, fmt,
    io::{self, BufRead, BufReader, Read},
    process::{Child, Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{
    append_shutdown_log, launch_plan::LaunchCandidate, process_control, AtomicFlagGuard, DeckError,
    CHILD_EXIT_POLL_INTERVAL, CHILD_STOP_GRACE, CHILD_STOP_POLL_INTERVAL, SPAWN_RETRY_DELAY,
};

/// Receives every diagnostic line the supervisor produces: captured child
/// output plus its own lifecycle notes.
pub(crate) type DiagnosticSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChildExit {
    pub(crate) code: Option<i32>,
}

impl ChildExit {
    pub(crate) fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "code {code}"),
            None => f.write_str("no exit code (terminated by signal)"),
        }
    }
}

pub(crate) trait BackendChild: Send {
    fn id(&self) -> u32;
    fn try_wait(&mut self) -> io::Result<Option<ChildExit>>;
    fn terminate(&mut self) -> io::Result<()>;
    fn kill(&mut self) -> io::Result<()>;
    fn wait(&mut self) -> io::Result<ChildExit>;

    /// Starts relaying captured stdout and stderr into `sink`.
    fn forward_output(&mut self, _sink: &DiagnosticSink) {}
}

pub(crate) trait BackendLauncher: Send + Sync {
    fn launch(&self, candidate: &LaunchCandidate) -> io::Result<Box<dyn BackendChild>>;
}

struct OsChild(Child);

impl BackendChild for OsChild {
    fn id(&self) -> u32 {
        self.0.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ChildExit>> {
        Ok(self
            .0
            .try_wait()?
            .map(|status| ChildExit { code: status.code() }))
    }

    fn terminate(&mut self) -> io::Result<()> {
        process_control::request_graceful_termination(&self.0)
    }

    fn kill(&mut self) -> io::Result<()> {
        process_control::force_kill(&mut self.0)
    }

    fn wait(&mut self) -> io::Result<ChildExit> {
        self.0.wait().map(|status| ChildExit {
            code: status.code(),
        })
    }

    fn forward_output(&mut self, sink: &DiagnosticSink) {
        if let Some(stdout) = self.0.stdout.take() {
            spawn_output_reader(stdout, "", Arc::clone(sink));
        }
        if let Some(stderr) = self.0.stderr.take() {
            spawn_output_reader(stderr, "[ERROR] ", Arc::clone(sink));
        }
    }
}

/// Spawns real OS processes with piped output.
pub(crate) struct SystemLauncher;

impl BackendLauncher for SystemLauncher {
    fn launch(&self, candidate: &LaunchCandidate) -> io::Result<Box<dyn BackendChild>> {
        let mut command = Command::new(&candidate.cmd);
        command
            .args(&candidate.args)
            .current_dir(&candidate.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("PYTHONUNBUFFERED", "1")
            .env(
                "PYTHONIOENCODING",
                env::var("PYTHONIOENCODING").unwrap_or_else(|_| "utf-8".to_string()),
            );

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        Ok(Box::new(OsChild(command.spawn()?)))
    }
}

fn spawn_output_reader<R>(stream: R, prefix: &'static str, sink: DiagnosticSink)
where
    R: Read + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("backend-output".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buffer = Vec::new();
            loop {
                buffer.clear();
                match reader.read_until(b'\n', &mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buffer);
                        let line = line.trim_end();
                        if !line.is_empty() {
                            sink(&format!("{prefix}{line}"));
                        }
                    }
                }
            }
        });
    if let Err(error) = spawned {
        log::warn!("failed to spawn backend output reader: {error}");
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SupervisorPolicy {
    pub(crate) retry_delay: Duration,
    pub(crate) exit_poll_interval: Duration,
    pub(crate) stop_grace: Duration,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            retry_delay: SPAWN_RETRY_DELAY,
            exit_poll_interval: CHILD_EXIT_POLL_INTERVAL,
            stop_grace: CHILD_STOP_GRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SupervisorOutcome {
    /// The child exited with code 0.
    CleanExit,
    /// `stop()` ended supervision.
    Stopped,
    /// An established backend died; no fallback is attempted.
    Crashed(ChildExit),
    Exhausted { attempts: usize },
    AlreadyRunning,
}

enum SpawnAttempt {
    Spawned,
    Stopping,
    Failed(DeckError),
}

enum ChildWait {
    Exited(ChildExit),
    Stopped,
}

pub(crate) struct BackendSupervisor {
    candidates: Vec<LaunchCandidate>,
    launcher: Box<dyn BackendLauncher>,
    sink: DiagnosticSink,
    policy: SupervisorPolicy,
    child: Mutex<Option<Box<dyn BackendChild>>>,
    stopping: AtomicBool,
    running: AtomicBool,
    established: AtomicBool,
}

impl BackendSupervisor {
    pub(crate) fn new(
        candidates: Vec<LaunchCandidate>,
        launcher: Box<dyn BackendLauncher>,
        sink: DiagnosticSink,
        policy: SupervisorPolicy,
    ) -> Self {
        Self {
            candidates,
            launcher,
            sink,
            policy,
            child: Mutex::new(None),
            stopping: AtomicBool::new(false),
            running: AtomicBool::new(false),
            established: AtomicBool::new(false),
        }
    }

    pub(crate) fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Marks the current child as the backend the UI is talking to. From now
    /// on an exit is reported as a crash instead of triggering fallback.
    pub(crate) fn mark_established(&self) {
        self.established.store(true, Ordering::Release);
    }

    fn is_established(&self) -> bool {
        self.established.load(Ordering::Acquire)
    }

    fn emit(&self, line: &str) {
        (self.sink)(line);
    }

    /// Walks the candidate list until a child exits cleanly, crashes after
    /// being established, `stop()` is called, or every candidate failed.
    pub(crate) async fn run(&self) -> SupervisorOutcome {
        let Some(_running) = AtomicFlagGuard::try_set(&self.running) else {
            return SupervisorOutcome::AlreadyRunning;
        };

        for (index, candidate) in self.candidates.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.policy.retry_delay).await;
            }

            match self.spawn_candidate(candidate) {
                SpawnAttempt::Spawned => {}
                SpawnAttempt::Stopping => return SupervisorOutcome::Stopped,
                SpawnAttempt::Failed(error) => {
                    self.emit(&format!("[SPAWN ERROR] {error}"));
                    continue;
                }
            }

            match self.wait_for_exit().await {
                ChildWait::Stopped => return SupervisorOutcome::Stopped,
                ChildWait::Exited(exit) => {
                    self.emit(&format!("backend process exited with {exit}"));
                    if exit.is_clean() {
                        return SupervisorOutcome::CleanExit;
                    }
                    if self.is_established() {
                        self.emit("[ERROR] backend stopped unexpectedly; not restarting");
                        return SupervisorOutcome::Crashed(exit);
                    }
                }
            }
        }

        if self.is_stopping() {
            return SupervisorOutcome::Stopped;
        }
        let attempts = self.candidates.len();
        self.emit(&format!(
            "[FATAL] could not start backend: all {attempts} launch candidates failed"
        ));
        SupervisorOutcome::Exhausted { attempts }
    }

    fn spawn_candidate(&self, candidate: &LaunchCandidate) -> SpawnAttempt {
        let mut slot = match self.child.lock() {
            Ok(slot) => slot,
            Err(_) => return SpawnAttempt::Failed(DeckError::LockPoisoned("backend child")),
        };
        if self.is_stopping() {
            return SpawnAttempt::Stopping;
        }

        match self.launcher.launch(candidate) {
            Ok(mut child) => {
                self.emit(&format!(
                    "backend started (pid {}): {}",
                    child.id(),
                    candidate.debug_command()
                ));
                child.forward_output(&self.sink);
                *slot = Some(child);
                SpawnAttempt::Spawned
            }
            Err(source) => SpawnAttempt::Failed(DeckError::Spawn {
                command: candidate.debug_command(),
                source,
            }),
        }
    }

    async fn wait_for_exit(&self) -> ChildWait {
        loop {
            if let Some(result) = self.poll_child() {
                return result;
            }
            tokio::time::sleep(self.policy.exit_poll_interval).await;
        }
    }

    fn poll_child(&self) -> Option<ChildWait> {
        let Ok(mut slot) = self.child.lock() else {
            return Some(ChildWait::Stopped);
        };
        let Some(child) = slot.as_mut() else {
            return Some(ChildWait::Stopped);
        };

        match child.try_wait() {
            Ok(Some(exit)) => {
                *slot = None;
                Some(ChildWait::Exited(exit))
            }
            Ok(None) => None,
            Err(error) => {
                log::warn!("failed to poll backend process status: {error}");
                None
            }
        }
    }

    /// Terminates the running child. Safe to call from every exit path; only
    /// the first call signals the process.
    pub(crate) fn stop(&self) {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return;
        }

        let child = match self.child.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(mut child) = child else {
            append_shutdown_log("no backend process running, nothing to stop");
            return;
        };

        let pid = child.id();
        append_shutdown_log(&format!("stopping backend process (pid {pid})"));
        match child.terminate() {
            Ok(()) => self.reap(child.as_mut()),
            Err(error) => {
                append_shutdown_log(&format!(
                    "graceful termination of pid {pid} failed: {error}; killing"
                ));
                force_kill(child.as_mut());
            }
        }
    }

    /// `stop()` on the blocking pool, for callers on the UI thread.
    pub(crate) async fn stop_off_thread(self: Arc<Self>) {
        if let Err(error) = tokio::task::spawn_blocking(move || self.stop()).await {
            append_shutdown_log(&format!("backend stop task failed: {error}"));
        }
    }

    fn reap(&self, child: &mut dyn BackendChild) {
        let deadline = Instant::now() + self.policy.stop_grace;
        loop {
            match child.try_wait() {
                Ok(Some(exit)) => {
                    append_shutdown_log(&format!("backend process exited with {exit}"));
                    return;
                }
                Ok(None) if Instant::now() < deadline => {
                    thread::sleep(CHILD_STOP_POLL_INTERVAL)
                }
                Ok(None) => {
                    append_shutdown_log("backend did not exit within grace period; killing");
                    force_kill(child);
                    return;
                }
                Err(error) => {
                    append_shutdown_log(&format!("failed to poll backend during stop: {error}"));
                    force_kill(child);
                    return;
                }
            }
        }
    }
}

fn force_kill(child: &mut dyn BackendChild) {
    if let Err(error) = child.kill() {
        append_shutdown_log(&format!("failed to kill backend process: {error}"));
    }
    match child.wait() {
        Ok(exit) => append_shutdown_log(&format!("backend process reaped with {exit}")),
        Err(error) => append_shutdown_log(&format!("failed to reap backend process: {error}")),
    }
}


#[cfg(all(test, unix))]
mod os_process_tests {
    use std::path::PathBuf;

    use super::*;

    fn shell_supervisor(
        script: &str,
        stop_grace: Duration,
    ) -> (Arc<BackendSupervisor>, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let sink: DiagnosticSink = Arc::new(move |line: &str| {
            sink_lines.lock().expect("lines lock").push(line.to_string());
        });
        let candidate = LaunchCandidate {
            cmd: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            cwd: PathBuf::from("."),
        };
        let policy = SupervisorPolicy {
            stop_grace,
            ..SupervisorPolicy::default()
        };
        let supervisor =
            BackendSupervisor::new(vec![candidate], Box::new(SystemLauncher), sink, policy);
        (Arc::new(supervisor), lines)
    }

    /// Waits for the output reader threads, which may lag the child's exit.
    fn wait_for_lines<F>(lines: &Mutex<Vec<String>>, done: F) -> Vec<String>
    where
        F: Fn(&[String]) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let snapshot = lines.lock().expect("lines lock").clone();
            if done(&snapshot) || Instant::now() >= deadline {
                return snapshot;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn position(lines: &[String], line: &str) -> Option<usize> {
        lines.iter().position(|candidate| candidate == line)
    }

    #[tokio::test]
    async fn captured_stdout_and_prefixed_stderr_follow_the_started_line() {
        let (supervisor, lines) =
            shell_supervisor("echo out-line; echo err-line >&2", CHILD_STOP_GRACE);

        assert_eq!(supervisor.run().await, SupervisorOutcome::CleanExit);

        let lines = wait_for_lines(&lines, |lines| {
            position(lines, "out-line").is_some() && position(lines, "[ERROR] err-line").is_some()
        });
        let started = lines
            .iter()
            .position(|line| line.starts_with("backend started (pid "))
            .expect("started line");
        let stdout = position(&lines, "out-line").expect("stdout line");
        let stderr = position(&lines, "[ERROR] err-line").expect("stderr line");
        assert_eq!(started, 0, "{lines:?}");
        assert!(started < stdout && started < stderr);
        assert!(lines.iter().any(|line| line == "backend process exited with code 0"));
    }

    #[tokio::test]
    async fn backend_ignoring_sigterm_is_killed_after_the_grace_period() {
        let grace = Duration::from_millis(400);
        let (supervisor, lines) =
            shell_supervisor("trap '' TERM; echo armed; exec sleep 30", grace);
        let running = Arc::clone(&supervisor);
        let task = tokio::spawn(async move { running.run().await });

        let armed = wait_for_lines(&lines, |lines| position(lines, "armed").is_some());
        assert!(position(&armed, "armed").is_some(), "{armed:?}");

        let started = Instant::now();
        for _ in 0..3 {
            supervisor.stop();
        }
        let elapsed = started.elapsed();

        assert!(elapsed >= grace, "stop returned after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "stop took {elapsed:?}");
        assert_eq!(task.await.expect("supervisor task"), SupervisorOutcome::Stopped);
    }
}
