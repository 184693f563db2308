//! Assembles one environment's pipeline: the artifact bucket, the build
//! projects, the deploy permissions and the stage topology.
//!
//! Assembly is a single synchronous pass over a validated
//! [`EnvironmentConfig`]. It either returns a complete [`PipelineStack`] or an
//! error; nothing is partially defined.

use crate::buildspec::{BuildEnvironment, BuildSpecSource, EnvironmentVariable};
use crate::config::EnvironmentConfig;
use crate::error::{PipelineError, Result};
use crate::jobs::{self, QualityCheck};
use crate::paths;
use crate::policy::{self, PolicyScope, PolicyStatement};
use crate::topology::{Action, Artifact, Pipeline, SecretRef, Stage};
use std::collections::BTreeMap;
use std::path::Path;

pub const SOURCE_STAGE: &str = "Source";
pub const QUALITY_STAGE: &str = "CodeQuality";
pub const DEPLOY_STAGE: &str = "Deploy";
pub const SOURCE_ACTION: &str = "GitHub_source";

// ---------------------------------------------------------------------------
// BuildProject
// ---------------------------------------------------------------------------

/// A build project bound to one pipeline action.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildProject {
    pub logical_id: String,
    pub name: String,
    pub spec: BuildSpecSource,
    pub environment: BuildEnvironment,
    pub environment_variables: BTreeMap<String, EnvironmentVariable>,
    /// Statements added to this project's role on top of the baseline.
    pub extra_statements: Vec<PolicyStatement>,
}

impl BuildProject {
    fn from_check(check: QualityCheck, cfg: &EnvironmentConfig) -> Self {
        let job = check.job_spec(cfg);
        Self {
            logical_id: check.logical_id().to_string(),
            name: job.name.clone(),
            spec: BuildSpecSource::Inline(job.to_buildspec()),
            environment: BuildEnvironment::default(),
            environment_variables: job.environment_variables,
            extra_statements: Vec::new(),
        }
    }

    fn deploy(cfg: &EnvironmentConfig) -> Self {
        Self {
            logical_id: jobs::DEPLOY_LOGICAL_ID.to_string(),
            name: jobs::deploy_project_name(),
            spec: BuildSpecSource::SourceFile(cfg.pipeline.build_spec_location.clone()),
            environment: BuildEnvironment::default(),
            environment_variables: BTreeMap::new(),
            extra_statements: Vec::new(),
        }
    }

    /// Attach statements to this project's execution role.
    pub fn add_to_role_policy(&mut self, statements: impl IntoIterator<Item = PolicyStatement>) {
        self.extra_statements.extend(statements);
    }

    /// Full statement list for this project's role.
    pub fn role_statements(&self, cfg: &EnvironmentConfig) -> Vec<PolicyStatement> {
        let mut statements = policy::project_base_statements(
            &cfg.region,
            &cfg.account,
            &self.name,
            &cfg.pipeline.bucket_name,
        );
        statements.extend(self.extra_statements.iter().cloned());
        statements
    }
}

// ---------------------------------------------------------------------------
// PipelineStack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineStack {
    pub config: EnvironmentConfig,
    pub projects: Vec<BuildProject>,
    pub pipeline: Pipeline,
}

impl PipelineStack {
    /// Assemble the stack. When `source_root` is given, the deploy build spec
    /// must exist under it.
    pub fn assemble(cfg: &EnvironmentConfig, source_root: Option<&Path>) -> Result<Self> {
        if let Some(root) = source_root {
            let spec = paths::build_spec_path(root, &cfg.pipeline.build_spec_location);
            if !spec.is_file() {
                return Err(PipelineError::BuildSpecNotFound(spec));
            }
        }

        let source_output = Artifact::new("SourceOutput");
        let mut projects = Vec::new();

        let source_action = Action::github_source(
            SOURCE_ACTION,
            &cfg.github.owner,
            &cfg.github.repository_name,
            &cfg.github.branch,
            SecretRef::new(&cfg.github.oauth_secret_name),
            source_output.clone(),
        )
        .with_trigger(cfg.github.trigger);
        let source_stage = Stage::new(SOURCE_STAGE).with_action(source_action);

        let mut quality_stage = Stage::new(QUALITY_STAGE);
        for &check in QualityCheck::all() {
            let project = BuildProject::from_check(check, cfg);
            quality_stage = quality_stage.with_action(Action::code_build(
                check.action_name(),
                &project.name,
                source_output.clone(),
                vec![Artifact::output_of(check.action_name())],
            ));
            projects.push(project);
        }

        let mut deploy = BuildProject::deploy(cfg);
        deploy.add_to_role_policy(policy::deploy_statements(&PolicyScope::from_config(cfg)));
        let deploy_stage = Stage::new(DEPLOY_STAGE).with_action(Action::code_build(
            jobs::DEPLOY_ACTION,
            &deploy.name,
            source_output,
            vec![Artifact::output_of(jobs::DEPLOY_ACTION)],
        ));
        projects.push(deploy);

        let pipeline = Pipeline::new(
            cfg.stack_name(),
            &cfg.pipeline.bucket_name,
            vec![source_stage, quality_stage, deploy_stage],
        )?;

        tracing::info!(
            environment = %cfg.name,
            stages = pipeline.stages().len(),
            projects = projects.len(),
            "assembled pipeline"
        );

        Ok(Self {
            config: cfg.clone(),
            projects,
            pipeline,
        })
    }

    pub fn project(&self, name: &str) -> Option<&BuildProject> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// The project backing a pipeline action, if it is a build action.
    pub fn project_for_action(&self, action: &str) -> Option<&BuildProject> {
        self.pipeline
            .action(action)
            .and_then(Action::project)
            .and_then(|name| self.project(name))
    }

    /// Names of every project the pipeline role must be able to start.
    pub fn project_names(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.name.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
