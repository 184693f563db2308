use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Handle to a stage output stored in the artifact bucket. Carries no content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Artifact(String);

impl Artifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Conventional output name for an action: `<Action>Output`.
    pub fn output_of(action_name: &str) -> Self {
        Self(format!("{action_name}Output"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SecretRef
// ---------------------------------------------------------------------------

/// A Secrets Manager secret referenced by name. The template only ever holds
/// the dynamic reference, which the provisioning engine resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretRef {
    pub secret_name: String,
}

impl SecretRef {
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
        }
    }

    pub fn dynamic_reference(&self) -> String {
        format!(
            "{{{{resolve:secretsmanager:{}:SecretString:::}}}}",
            self.secret_name
        )
    }
}

// ---------------------------------------------------------------------------
// SourceTrigger
// ---------------------------------------------------------------------------

/// How a source action learns about new commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTrigger {
    /// The hosting service calls a registered webhook on every push.
    #[default]
    Webhook,
    /// The pipeline polls the repository for changes.
    Poll,
    /// Runs only when released by hand.
    Manual,
}

impl SourceTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTrigger::Webhook => "webhook",
            SourceTrigger::Poll => "poll",
            SourceTrigger::Manual => "manual",
        }
    }
}

impl fmt::Display for SourceTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceTrigger {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "webhook" => Ok(SourceTrigger::Webhook),
            "poll" => Ok(SourceTrigger::Poll),
            "manual" => Ok(SourceTrigger::Manual),
            _ => Err("expected one of webhook, poll, manual"),
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    GithubSource {
        owner: String,
        repo: String,
        branch: String,
        oauth_token: SecretRef,
        trigger: SourceTrigger,
    },
    CodeBuild {
        project: String,
    },
}

impl ActionKind {
    pub fn is_source(&self) -> bool {
        matches!(self, ActionKind::GithubSource { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub name: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Artifact>,
    pub outputs: Vec<Artifact>,
}

impl Action {
    pub fn github_source(
        name: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        oauth_token: SecretRef,
        output: Artifact,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::GithubSource {
                owner: owner.into(),
                repo: repo.into(),
                branch: branch.into(),
                oauth_token,
                trigger: SourceTrigger::default(),
            },
            inputs: Vec::new(),
            outputs: vec![output],
        }
    }

    /// Set how a source action is started. No effect on build actions.
    pub fn with_trigger(mut self, trigger: SourceTrigger) -> Self {
        if let ActionKind::GithubSource { trigger: t, .. } = &mut self.kind {
            *t = trigger;
        }
        self
    }

    pub fn trigger(&self) -> Option<SourceTrigger> {
        match &self.kind {
            ActionKind::GithubSource { trigger, .. } => Some(*trigger),
            ActionKind::CodeBuild { .. } => None,
        }
    }

    pub fn code_build(
        name: impl Into<String>,
        project: impl Into<String>,
        input: Artifact,
        outputs: Vec<Artifact>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::CodeBuild {
                project: project.into(),
            },
            inputs: vec![input],
            outputs,
        }
    }

    pub fn project(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::CodeBuild { project } => Some(project),
            ActionKind::GithubSource { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered, validated stage list. Stage N+1 runs only after every action
/// in stage N has succeeded, so an artifact may only be consumed in a stage
/// strictly after the one that produces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub name: String,
    pub artifact_bucket: String,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(
        name: impl Into<String>,
        artifact_bucket: impl Into<String>,
        stages: Vec<Stage>,
    ) -> Result<Self> {
        validate_stages(&stages)?;
        Ok(Self {
            name: name.into(),
            artifact_bucket: artifact_bucket.into(),
            stages,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn actions(&self) -> impl Iterator<Item = (&Stage, &Action)> {
        self.stages
            .iter()
            .flat_map(|s| s.actions.iter().map(move |a| (s, a)))
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions().map(|(_, a)| a).find(|a| a.name == name)
    }

    pub fn producer(&self, artifact: &Artifact) -> Option<&Action> {
        self.actions()
            .map(|(_, a)| a)
            .find(|a| a.outputs.contains(artifact))
    }

    pub fn consumers(&self, artifact: &Artifact) -> Vec<&Action> {
        self.actions()
            .map(|(_, a)| a)
            .filter(|a| a.inputs.contains(artifact))
            .collect()
    }
}

fn validate_stages(stages: &[Stage]) -> Result<()> {
    if stages.len() < 2 {
        return Err(PipelineError::TooFewStages(stages.len()));
    }

    let mut stage_names = HashSet::new();
    let mut action_names = HashSet::new();
    let mut produced: HashSet<&Artifact> = HashSet::new();

    for (index, stage) in stages.iter().enumerate() {
        if !stage_names.insert(stage.name.as_str()) {
            return Err(PipelineError::DuplicateStage(stage.name.clone()));
        }
        if stage.actions.is_empty() {
            return Err(PipelineError::EmptyStage(stage.name.clone()));
        }

        let mut produced_here: Vec<&Artifact> = Vec::new();
        for action in &stage.actions {
            if !action_names.insert(action.name.as_str()) {
                return Err(PipelineError::DuplicateAction(action.name.clone()));
            }

            let is_source = action.kind.is_source();
            if index == 0 && !is_source {
                return Err(PipelineError::NonSourceInFirstStage(action.name.clone()));
            }
            if is_source && (index != 0 || !action.inputs.is_empty()) {
                return Err(PipelineError::MisplacedSource(action.name.clone()));
            }

            for input in &action.inputs {
                if !produced.contains(input) {
                    return Err(PipelineError::UnboundArtifact {
                        action: action.name.clone(),
                        artifact: input.to_string(),
                    });
                }
            }
            for output in &action.outputs {
                if produced.contains(output) || produced_here.contains(&output) {
                    return Err(PipelineError::DuplicateArtifact(output.to_string()));
                }
                produced_here.push(output);
            }
        }
        produced.extend(produced_here);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
