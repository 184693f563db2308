use crate::buildspec::{EnvironmentVariable, JobSpec};
use crate::config::EnvironmentConfig;
use crate::error::PipelineError;
use std::fmt;

/// Prefix shared by every build project name.
pub const PROJECT_PREFIX: &str = "cdk-workshop";
/// Python package the linter checks alongside `tests` and the entry point.
pub const APP_PACKAGE: &str = "cdk_workshop";
pub const APP_ENTRY_POINT: &str = "app.py";

pub const PYTHON_VERSION: &str = "3.8";
pub const NODEJS_VERSION: &str = "12";
pub const RUBY_VERSION: &str = "2.7";

pub const GIT_SECRETS_REPO: &str = "https://github.com/awslabs/git-secrets.git";

// ---------------------------------------------------------------------------
// Shared bootstrap sequence
// ---------------------------------------------------------------------------

/// Installs the CDK CLI. Must stay byte-identical across jobs so every gate
/// runs against the same toolchain.
pub const CDK_CLI_COMMANDS: &[&str] = &["npm install -g aws-cdk", "cdk --version"];

/// Creates and activates the virtualenv, then installs declared dependencies.
pub const PYTHON_ENV_COMMANDS: &[&str] = &[
    "python3 -m venv .env",
    "chmod +x .env/bin/activate",
    ". .env/bin/activate",
    "pip3 install -r requirements.txt",
];

pub fn cdk_bootstrap_commands() -> impl Iterator<Item = &'static str> {
    CDK_CLI_COMMANDS
        .iter()
        .chain(PYTHON_ENV_COMMANDS.iter())
        .copied()
}

fn python_and_node(job: JobSpec) -> JobSpec {
    job.runtime("python", PYTHON_VERSION)
        .runtime("nodejs", NODEJS_VERSION)
}

// ---------------------------------------------------------------------------
// QualityCheck
// ---------------------------------------------------------------------------

/// The five independent gates in the code-quality stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityCheck {
    Linter,
    UnitTesting,
    CfnNag,
    DependenciesAudit,
    GitSecrets,
}

impl QualityCheck {
    pub fn all() -> &'static [QualityCheck] {
        &[
            QualityCheck::Linter,
            QualityCheck::UnitTesting,
            QualityCheck::CfnNag,
            QualityCheck::DependenciesAudit,
            QualityCheck::GitSecrets,
        ]
    }

    /// Pipeline action name.
    pub fn action_name(self) -> &'static str {
        match self {
            QualityCheck::Linter => "Linter",
            QualityCheck::UnitTesting => "UnitTesting",
            QualityCheck::CfnNag => "CfnNag",
            QualityCheck::DependenciesAudit => "DependenciesAudit",
            QualityCheck::GitSecrets => "GitSecrets",
        }
    }

    /// Logical id of the build project in the rendered template.
    pub fn logical_id(self) -> &'static str {
        match self {
            QualityCheck::Linter => "LinterStage",
            QualityCheck::UnitTesting => "UnitTestingStage",
            QualityCheck::CfnNag => "CfnNagStage",
            QualityCheck::DependenciesAudit => "PipAudit",
            QualityCheck::GitSecrets => "GitSecretsStage",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityCheck::Linter => "linter",
            QualityCheck::UnitTesting => "unit-testing",
            QualityCheck::CfnNag => "cfn-nag",
            QualityCheck::DependenciesAudit => "dependencies-audit",
            QualityCheck::GitSecrets => "git-secrets",
        }
    }

    pub fn project_name(self) -> String {
        let suffix = match self {
            QualityCheck::Linter => "linter",
            QualityCheck::UnitTesting => "unit-tests",
            QualityCheck::CfnNag => "cfn-nag",
            QualityCheck::DependenciesAudit => "dependency-audit",
            QualityCheck::GitSecrets => "git-secrets",
        };
        format!("{PROJECT_PREFIX}-{suffix}")
    }

    pub fn job_spec(self, cfg: &EnvironmentConfig) -> JobSpec {
        let job = JobSpec::new(self.project_name());
        match self {
            QualityCheck::Linter => python_and_node(job)
                .install(cdk_bootstrap_commands())
                .build([
                    format!("python3 -m pylint {APP_PACKAGE}"),
                    "python3 -m pylint tests".to_string(),
                    format!("python3 -m pylint {APP_ENTRY_POINT}"),
                ]),
            QualityCheck::UnitTesting => python_and_node(job)
                .install(cdk_bootstrap_commands())
                .build(["coverage run -m pytest", "coverage report"]),
            QualityCheck::CfnNag => python_and_node(job)
                .runtime("ruby", RUBY_VERSION)
                .install(cdk_bootstrap_commands())
                .install(["gem install cfn-nag"])
                .pre_build([
                    "ACCOUNT=$(aws sts get-caller-identity | jq -r '.Account')",
                    "cdk synth $STACK_NAME -c account=$ACCOUNT -c environmentType=$ENV >> template.yaml",
                ])
                .build(["cfn_nag_scan --input-path template.yaml"])
                .env("ENV", EnvironmentVariable::plaintext(&cfg.name))
                .env(
                    "STACK_NAME",
                    EnvironmentVariable::plaintext(&cfg.pipeline.target_stack),
                ),
            QualityCheck::DependenciesAudit => job
                .runtime("python", PYTHON_VERSION)
                .install(PYTHON_ENV_COMMANDS.iter().copied())
                .build(["safety check"]),
            QualityCheck::GitSecrets => job
                .install([
                    "SECRETS_FOLDER=git-secrets".to_string(),
                    "mkdir $SECRETS_FOLDER".to_string(),
                    format!("git clone --quiet {GIT_SECRETS_REPO} $SECRETS_FOLDER"),
                    "cd $SECRETS_FOLDER".to_string(),
                    "make install".to_string(),
                    "cd .. && rm -rf $SECRETS_FOLDER".to_string(),
                ])
                .pre_build(["git secrets --install", "git secrets --register-aws"])
                .build(["git secrets --scan"]),
        }
    }
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QualityCheck {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityCheck::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s || c.action_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PipelineError::UnknownJob(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Deploy job
// ---------------------------------------------------------------------------

pub const DEPLOY_ACTION: &str = "CodeBuild";
pub const DEPLOY_LOGICAL_ID: &str = "PipelineProject";

pub fn deploy_project_name() -> String {
    format!("{PROJECT_PREFIX}-deploy")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Context;

    fn qa_config() -> EnvironmentConfig {
        Context::from_json_str(
            r#"{"qa": {
                "region": "us-east-1", "account": "111111111111",
                "github": {"owner": "acme", "repositoryName": "cdk-workshop", "oauthSecretName": "github-oauth-token"},
                "pipeline": {"bucketName": "my-artifacts", "buildSpecLocation": "buildspecs/deploy.yml", "targetStack": "cdk-workshop-stack"}
            }}"#,
        )
        .unwrap()
        .resolve(Some("qa"), None)
        .unwrap()
    }

    #[test]
    fn bootstrap_is_identical_across_cdk_jobs() {
        let cfg = qa_config();
        let expected: Vec<String> = cdk_bootstrap_commands().map(String::from).collect();
        for check in [QualityCheck::Linter, QualityCheck::UnitTesting, QualityCheck::CfnNag] {
            let job = check.job_spec(&cfg);
            assert_eq!(
                &job.install_commands[..expected.len()],
                expected.as_slice(),
                "{check} drifted from the shared bootstrap"
            );
        }
    }

    #[test]
    fn dependency_audit_reuses_python_env_only() {
        let job = QualityCheck::DependenciesAudit.job_spec(&qa_config());
        assert_eq!(job.install_commands, PYTHON_ENV_COMMANDS);
        assert_eq!(job.build_commands, vec!["safety check"]);
        assert!(!job.runtime_versions.contains_key("nodejs"));
    }

    #[test]
    fn linter_covers_package_tests_and_entry_point() {
        let job = QualityCheck::Linter.job_spec(&qa_config());
        assert_eq!(
            job.build_commands,
            vec![
                "python3 -m pylint cdk_workshop",
                "python3 -m pylint tests",
                "python3 -m pylint app.py",
            ]
        );
    }

    #[test]
    fn cfn_nag_is_environment_scoped() {
        let job = QualityCheck::CfnNag.job_spec(&qa_config());
        assert_eq!(job.environment_variables["ENV"].value, "qa");
        assert_eq!(job.environment_variables["STACK_NAME"].value, "cdk-workshop-stack");
        assert_eq!(job.runtime_versions["ruby"], RUBY_VERSION);
        assert_eq!(job.install_commands.last().unwrap(), "gem install cfn-nag");
        assert!(job.pre_build_commands[1].contains("-c environmentType=$ENV"));
    }

    #[test]
    fn git_secrets_installs_from_upstream() {
        let job = QualityCheck::GitSecrets.job_spec(&qa_config());
        assert!(job.runtime_versions.is_empty());
        assert!(job.install_commands.iter().any(|c| c.contains(GIT_SECRETS_REPO)));
        assert_eq!(job.install_commands.last().unwrap(), "cd .. && rm -rf $SECRETS_FOLDER");
        assert_eq!(
            job.pre_build_commands,
            vec!["git secrets --install", "git secrets --register-aws"]
        );
        assert_eq!(job.build_commands, vec!["git secrets --scan"]);

        let yaml = job.to_buildspec().to_yaml().unwrap();
        let install = yaml.find("make install").unwrap();
        let hooks = yaml.find("git secrets --install").unwrap();
        let scan = yaml.find("git secrets --scan").unwrap();
        assert!(install < hooks && hooks < scan);
    }

    #[test]
    fn names_are_distinct() {
        let mut projects: Vec<String> = QualityCheck::all().iter().map(|c| c.project_name()).collect();
        projects.push(deploy_project_name());
        let before = projects.len();
        projects.sort();
        projects.dedup();
        assert_eq!(projects.len(), before);
    }

    #[test]
    fn parse_job_names() {
        assert_eq!("cfn-nag".parse::<QualityCheck>().unwrap(), QualityCheck::CfnNag);
        assert_eq!("GitSecrets".parse::<QualityCheck>().unwrap(), QualityCheck::GitSecrets);
        assert!(matches!(
            "deploy".parse::<QualityCheck>(),
            Err(PipelineError::UnknownJob(_))
        ));
    }
}
