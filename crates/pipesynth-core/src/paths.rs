use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_CONTEXT_FILE: &str = "cdk.json";
pub const DEFAULT_OUT_DIR: &str = "cdk.out";
pub const TEMPLATE_SUFFIX: &str = ".template.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn template_path(out_dir: &Path, stack_name: &str) -> PathBuf {
    out_dir.join(format!("{stack_name}{TEMPLATE_SUFFIX}"))
}

/// Where the deploy job's build spec lives inside a checkout of the source repo.
pub fn build_spec_path(source_root: &Path, location: &str) -> PathBuf {
    source_root.join(location)
}
