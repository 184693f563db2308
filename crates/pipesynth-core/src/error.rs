use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("context file not found: {}", .0.display())]
    ContextNotFound(PathBuf),

    #[error("unsupported context file '{}': expected .json, .yaml or .yml", .0.display())]
    UnsupportedContextFormat(PathBuf),

    #[error("no environment selected: set 'environmentType' in the context or pass --env")]
    NoEnvironment,

    #[error("environment '{0}' not found in context")]
    EnvironmentNotFound(String),

    #[error("missing required context key '{0}'")]
    MissingKey(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("account not set: pass --account, set CDK_DEFAULT_ACCOUNT, or add 'account' to the environment")]
    MissingAccount,

    #[error("build spec '{}' does not exist", .0.display())]
    BuildSpecNotFound(PathBuf),

    #[error("pipeline needs at least two stages, got {0}")]
    TooFewStages(usize),

    #[error("duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("stage '{0}' has no actions")]
    EmptyStage(String),

    #[error("duplicate action name: {0}")]
    DuplicateAction(String),

    #[error("artifact '{0}' is produced by more than one action")]
    DuplicateArtifact(String),

    #[error("action '{action}' consumes artifact '{artifact}' which no earlier stage produces")]
    UnboundArtifact { action: String, artifact: String },

    #[error("source action '{0}' must sit in the first stage and take no inputs")]
    MisplacedSource(String),

    #[error("first stage may only contain source actions, found '{0}'")]
    NonSourceInFirstStage(String),

    #[error("unknown job '{0}': valid jobs are linter, unit-testing, cfn-nag, dependencies-audit, git-secrets")]
    UnknownJob(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
