use std::path::{Path, PathBuf};

use crate::{
    backend_config::DeckConfig, DeckError, DeckResult, BACKEND_DIST_DIR, BACKEND_ENTRYPOINT,
    BACKEND_EXECUTABLE, PYTHON_COMMANDS,
};

/// One way of starting the backend. The supervisor walks these in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchCandidate {
    pub(crate) cmd: String,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: PathBuf,
}

impl LaunchCandidate {
    pub(crate) fn debug_command(&self) -> String {
        let mut parts = vec![self.cmd.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Directories searched for a packaged backend, most specific first.
#[derive(Debug, Clone, Default)]
pub(crate) struct LaunchSearchRoots {
    pub(crate) resource_dir: Option<PathBuf>,
    pub(crate) portable_dir: Option<PathBuf>,
    pub(crate) executable_dir: Option<PathBuf>,
    pub(crate) source_dir: Option<PathBuf>,
}

impl LaunchSearchRoots {
    fn packaged_roots(&self) -> impl Iterator<Item = &Path> {
        [
            self.resource_dir.as_deref(),
            self.portable_dir.as_deref(),
            self.executable_dir.as_deref(),
            self.source_dir.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

pub(crate) fn resolve_launch_candidates(
    config: &DeckConfig,
    roots: &LaunchSearchRoots,
) -> DeckResult<Vec<LaunchCandidate>> {
    if let Some(custom_cmd) = config.custom_backend_cmd.as_deref() {
        return resolve_custom_launch(custom_cmd, roots).map(|candidate| vec![candidate]);
    }

    let mut candidates = Vec::with_capacity(PYTHON_COMMANDS.len() + 1);
    if let Some(packaged) = resolve_packaged_launch(roots) {
        candidates.push(packaged);
    }

    let script_dir = resolve_script_dir(config, roots);
    let entrypoint = script_dir.join(BACKEND_ENTRYPOINT);
    candidates.extend(PYTHON_COMMANDS.iter().map(|interpreter| LaunchCandidate {
        cmd: interpreter.to_string(),
        args: vec![entrypoint.to_string_lossy().to_string()],
        cwd: script_dir.clone(),
    }));

    Ok(candidates)
}

fn resolve_custom_launch(
    custom_cmd: &str,
    roots: &LaunchSearchRoots,
) -> DeckResult<LaunchCandidate> {
    let mut pieces = shlex::split(custom_cmd)
        .ok_or_else(|| DeckError::Config(format!("invalid backend command: {custom_cmd}")))?;
    if pieces.is_empty() {
        return Err(DeckError::Config("backend command is empty".to_string()));
    }

    let cmd = pieces.remove(0);
    let cwd = roots
        .source_dir
        .clone()
        .or_else(|| roots.executable_dir.clone())
        .unwrap_or_else(workspace_backend_dir);
    Ok(LaunchCandidate {
        cmd,
        args: pieces,
        cwd,
    })
}

fn resolve_packaged_launch(roots: &LaunchSearchRoots) -> Option<LaunchCandidate> {
    let executable = roots
        .packaged_roots()
        .map(|root| root.join(BACKEND_DIST_DIR).join(BACKEND_EXECUTABLE))
        .find(|candidate| candidate.is_file())?;
    let cwd = executable.parent()?.to_path_buf();
    Some(LaunchCandidate {
        cmd: executable.to_string_lossy().to_string(),
        args: Vec::new(),
        cwd,
    })
}

fn resolve_script_dir(config: &DeckConfig, roots: &LaunchSearchRoots) -> PathBuf {
    if let Some(dir) = &config.backend_dir {
        return dir.clone();
    }

    roots
        .packaged_roots()
        .find(|root| root.join(BACKEND_ENTRYPOINT).is_file())
        .map(Path::to_path_buf)
        .unwrap_or_else(workspace_backend_dir)
}

// Development checkout: `<repo>/api/api.py` next to `src-tauri/`.
fn workspace_backend_dir() -> PathBuf {
    let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("api");
    candidate.canonicalize().unwrap_or(candidate)
}
