pub mod buildspec;
pub mod envs;
pub mod policy;
pub mod synth;
pub mod topology;
pub mod validate;

use anyhow::Context as _;
use pipesynth_core::config::{Context, EnvironmentConfig};
use std::path::Path;

/// What every command is pointed at: a context file plus the environment and
/// account overrides from the command line.
pub struct Target<'a> {
    pub context: &'a Path,
    pub environment: Option<&'a str>,
    pub account: Option<&'a str>,
}

impl Target<'_> {
    pub fn load_context(&self) -> anyhow::Result<Context> {
        Context::load(self.context)
            .with_context(|| format!("failed to load context from {}", self.context.display()))
    }

    pub fn resolve(&self) -> anyhow::Result<EnvironmentConfig> {
        let ctx = self.load_context()?;
        let cfg = ctx
            .resolve(self.environment, self.account)
            .context("invalid environment configuration")?;
        tracing::debug!(environment = %cfg.name, region = %cfg.region, "environment resolved");
        Ok(cfg)
    }
}
