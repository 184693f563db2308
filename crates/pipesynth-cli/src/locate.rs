use pipesynth_core::paths::DEFAULT_CONTEXT_FILE;
use std::path::{Path, PathBuf};

/// Resolve the context file.
///
/// Priority:
/// 1. `--context` flag / `PIPESYNTH_CONTEXT` env var (passed in as `explicit`)
/// 2. Nearest `cdk.json` walking upward from the current directory
/// 3. `cdk.json` in the current directory (reported as missing on load)
pub fn resolve_context(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd, DEFAULT_CONTEXT_FILE).unwrap_or_else(|| cwd.join(DEFAULT_CONTEXT_FILE))
}

fn find_upward(start: &Path, file_name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}
