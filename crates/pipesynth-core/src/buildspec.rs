use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BUILDSPEC_VERSION: f64 = 0.2;

// ---------------------------------------------------------------------------
// EnvironmentVariable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    Plaintext,
    ParameterStore,
    SecretsManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: VariableType,
}

impl EnvironmentVariable {
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: VariableType::Plaintext,
        }
    }
}

// ---------------------------------------------------------------------------
// BuildEnvironment
// ---------------------------------------------------------------------------

/// Image and compute size the executor runs every job on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnvironment {
    pub image: String,
    pub compute_type: String,
    pub privileged: bool,
}

impl Default for BuildEnvironment {
    fn default() -> Self {
        Self {
            image: "aws/codebuild/standard:4.0".to_string(),
            compute_type: "BUILD_GENERAL1_SMALL".to_string(),
            privileged: true,
        }
    }
}

// ---------------------------------------------------------------------------
// JobSpec
// ---------------------------------------------------------------------------

/// Declarative shape of one build job. Turned into a [`BuildSpec`] with
/// [`JobSpec::to_buildspec`]; the same shape always yields the same output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    #[serde(default)]
    pub runtime_versions: BTreeMap<String, String>,
    #[serde(default)]
    pub install_commands: Vec<String>,
    #[serde(default)]
    pub pre_build_commands: Vec<String>,
    #[serde(default)]
    pub build_commands: Vec<String>,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, EnvironmentVariable>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runtime_versions: BTreeMap::new(),
            install_commands: Vec::new(),
            pre_build_commands: Vec::new(),
            build_commands: Vec::new(),
            environment_variables: BTreeMap::new(),
        }
    }

    pub fn runtime(mut self, runtime: &str, version: &str) -> Self {
        self.runtime_versions
            .insert(runtime.to_string(), version.to_string());
        self
    }

    pub fn install<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_commands.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn pre_build<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_build_commands
            .extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn build<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_commands.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, name: &str, variable: EnvironmentVariable) -> Self {
        self.environment_variables.insert(name.to_string(), variable);
        self
    }

    pub fn to_buildspec(&self) -> BuildSpec {
        BuildSpec {
            version: BUILDSPEC_VERSION,
            phases: Phases {
                install: phase(Some(&self.runtime_versions), &self.install_commands),
                pre_build: phase(None, &self.pre_build_commands),
                build: phase(None, &self.build_commands),
            },
        }
    }
}

fn phase(runtimes: Option<&BTreeMap<String, String>>, commands: &[String]) -> Option<Phase> {
    let runtime_versions = runtimes.cloned().unwrap_or_default();
    if commands.is_empty() && runtime_versions.is_empty() {
        return None;
    }
    Some(Phase {
        runtime_versions,
        commands: commands.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// BuildSpec (the document the executor reads)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub version: f64,
    pub phases: Phases,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phases {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_build: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Phase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(
        rename = "runtime-versions",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub runtime_versions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

impl BuildSpec {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// BuildSpecSource
// ---------------------------------------------------------------------------

/// Where a project's build spec comes from: rendered inline, or a file in the
/// source artifact maintained outside this crate.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildSpecSource {
    Inline(BuildSpec),
    SourceFile(String),
}

impl BuildSpecSource {
    /// Value for the project's `Source.BuildSpec` property.
    pub fn render(&self) -> Result<String> {
        match self {
            BuildSpecSource::Inline(spec) => spec.to_yaml(),
            BuildSpecSource::SourceFile(path) => Ok(path.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
