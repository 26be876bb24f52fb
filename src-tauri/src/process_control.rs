use std::{io, process::Child};

#[cfg(target_os = "windows")]
use std::process::{Command, Stdio};

/// Asks the process to exit on its own. SIGTERM on unix, a plain
/// `taskkill /t` (no `/f`) on Windows.
#[cfg(unix)]
pub(crate) fn request_graceful_termination(child: &Child) -> io::Result<()> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) takes plain integers and has no memory-safety preconditions.
    let result = unsafe { libc::kill(pid, libc::SIGTERM) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(target_os = "windows")]
pub(crate) fn request_graceful_termination(child: &Child) -> io::Result<()> {
    let status = Command::new("taskkill")
        .args(["/pid", &child.id().to_string(), "/t"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("taskkill exited with {status}")))
    }
}

#[cfg(not(any(unix, target_os = "windows")))]
pub(crate) fn request_graceful_termination(_child: &Child) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination is not supported on this platform",
    ))
}

#[cfg(target_os = "windows")]
pub(crate) fn force_kill(child: &mut Child) -> io::Result<()> {
    let status = Command::new("taskkill")
        .args(["/pid", &child.id().to_string(), "/t", "/f"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => Ok(()),
        _ => child.kill(),
    }
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn force_kill(child: &mut Child) -> io::Result<()> {
    child.kill()
}
