//! IAM statements for the pipeline's execution identities.
//!
//! [`deploy_statements`] is the least-privilege set the deploy job needs to
//! drive the target stack through CloudFormation. Every resource pattern is
//! scoped to a configured prefix or a fixed toolkit convention, except the
//! statements listed in [`ACCOUNT_WIDE_SIDS`].

use crate::config::EnvironmentConfig;
use serde::{Deserialize, Serialize};

pub const POLICY_VERSION: &str = "2012-10-17";

/// Stack created by `cdk bootstrap`.
pub const TOOLKIT_STACK: &str = "CDKToolkit";
/// Lambda functions provisioned by the target stack share this name prefix.
pub const FUNCTION_NAME_PREFIX: &str = "cdk-workshop-function";
pub const CANARY_DEPLOYMENT_CONFIG: &str = "CodeDeployDefault.LambdaCanary10Percent5Minutes";
pub const BOOTSTRAP_PARAMETER_PATH: &str = "cdk-bootstrap";

/// Statements whose resources are account-wide: bucket listing has no
/// resource-level ARN, and REST API ids are assigned at creation.
/// `S3Permissions2` is the bucket-discovery statement.
pub const ACCOUNT_WIDE_SIDS: &[&str] = &["S3Permissions2", "APIGatewayPermissions"];

/// Resource name prefixes owned by the CDK toolkit or the provider rather
/// than by configuration.
const TOOLKIT_PREFIXES: &[&str] = &["cdk", TOOLKIT_STACK, "CodeDeployDefault."];

// ---------------------------------------------------------------------------
// Effect / PolicyStatement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: Effect,
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    #[serde(rename = "Resource")]
    pub resources: Vec<String>,
}

impl PolicyStatement {
    pub fn allow(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            effect: Effect::Allow,
            actions: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Add actions, skipping any already present.
    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for a in actions {
            push_unique(&mut self.actions, a.into());
        }
        self
    }

    /// Add resource patterns, skipping any already present.
    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for r in resources {
            push_unique(&mut self.resources, r.into());
        }
        self
    }

    pub fn is_account_wide(&self) -> bool {
        ACCOUNT_WIDE_SIDS.contains(&self.sid.as_str())
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

// ---------------------------------------------------------------------------
// PolicyDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }

    pub fn statement(&self, sid: &str) -> Option<&PolicyStatement> {
        self.statement.iter().find(|s| s.sid == sid)
    }
}

// ---------------------------------------------------------------------------
// PolicyScope
// ---------------------------------------------------------------------------

/// The configured names every deploy-policy resource pattern is derived from.
#[derive(Debug, Clone, Copy)]
pub struct PolicyScope<'a> {
    pub region: &'a str,
    pub account: &'a str,
    /// Stack that owns the pipeline.
    pub stack_name: &'a str,
    /// Prefix of the application stack the deploy job manages.
    pub target_stack: &'a str,
    pub bucket_name: &'a str,
}

impl<'a> PolicyScope<'a> {
    pub fn from_config(cfg: &'a EnvironmentConfig) -> Self {
        Self {
            region: &cfg.region,
            account: &cfg.account,
            stack_name: cfg.stack_name(),
            target_stack: &cfg.pipeline.target_stack,
            bucket_name: &cfg.pipeline.bucket_name,
        }
    }

    /// True if `resource` is an ARN in this scope's region and account whose
    /// resource name starts with a configured name or a toolkit prefix.
    pub fn is_scoped(&self, resource: &str) -> bool {
        let Some(name) = self.resource_name(resource) else {
            return false;
        };
        [self.stack_name, self.target_stack, self.bucket_name]
            .into_iter()
            .chain(TOOLKIT_PREFIXES.iter().copied())
            .any(|prefix| name.starts_with(prefix))
    }

    /// Name part of an ARN's resource segment, without the resource type:
    /// `stack/web*/abc` gives `web*`, `function:web*` gives `web*`. `None`
    /// for non-ARNs and ARNs in another region or account.
    fn resource_name<'r>(&self, arn: &'r str) -> Option<&'r str> {
        let mut parts = arn.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let (_partition, _service) = (parts.next()?, parts.next()?);
        let (region, account) = (parts.next()?, parts.next()?);
        let resource = parts.next()?;
        if !(region.is_empty() || region == self.region)
            || !(account.is_empty() || account == self.account)
        {
            return None;
        }
        let name = match resource.find(|c: char| c == '/' || c == ':') {
            Some(i) => &resource[i + 1..],
            None => resource,
        };
        name.split('/').next().filter(|n| !n.is_empty())
    }

    fn cloudformation_stack(&self, pattern: &str) -> String {
        format!(
            "arn:aws:cloudformation:{}:{}:stack/{pattern}",
            self.region, self.account
        )
    }

    fn regional(&self, service: &str, rest: &str) -> String {
        format!("arn:aws:{service}:{}:{}:{rest}", self.region, self.account)
    }
}

// ---------------------------------------------------------------------------
// Deploy job statements
// ---------------------------------------------------------------------------

/// Everything the deploy job's role needs to deploy and tear down the target
/// stack and the resource types it provisions. Order is stable.
pub fn deploy_statements(scope: &PolicyScope<'_>) -> Vec<PolicyStatement> {
    let target = scope.target_stack;

    vec![
        PolicyStatement::allow("CloudFormationPermissions")
            .actions([
                "cloudformation:DescribeStacks",
                "cloudformation:GetTemplate",
                "cloudformation:DeleteChangeSet",
                "cloudformation:CreateChangeSet",
                "cloudformation:DescribeChangeSet",
                "cloudformation:ExecuteChangeSet",
                "cloudformation:DescribeStackEvents",
                "cloudformation:DeleteStack",
            ])
            .resources([
                scope.cloudformation_stack(&format!("{}*", scope.stack_name)),
                scope.cloudformation_stack(&format!("{}/*", scope.stack_name)),
                scope.cloudformation_stack(&format!("{target}*")),
                scope.cloudformation_stack(&format!("{target}*/*")),
                scope.cloudformation_stack(&format!("{TOOLKIT_STACK}/*")),
            ]),
        PolicyStatement::allow("S3Permissions")
            .actions(["s3:*"])
            .resources([
                "arn:aws:s3:::cdk*".to_string(),
                format!("arn:aws:s3:::{}", scope.bucket_name),
            ]),
        // Bucket discovery.
        PolicyStatement::allow("S3Permissions2")
            .actions([
                "s3:GetBucketLocation",
                "s3:ListAllMyBuckets",
                "s3:ListBucket",
            ])
            .resources(["*"]),
        PolicyStatement::allow("IAMPermissions")
            .actions(["iam:*"])
            .resources([
                format!("arn:aws:iam::{}:role/{target}*", scope.account),
                format!("arn:aws:iam::{}:role/cdk-*", scope.account),
            ]),
        PolicyStatement::allow("APIGatewayPermissions")
            .actions([
                "apigateway:POST",
                "apigateway:PUT",
                "apigateway:DELETE",
                "apigateway:GET",
                "apigateway:GetResources",
                "apigateway:PATCH",
            ])
            .resources([
                format!("arn:aws:apigateway:{}::/restapis*", scope.region),
                format!("arn:aws:apigateway:{}::/account", scope.region),
            ]),
        PolicyStatement::allow("CodeDeployPermissions")
            .actions([
                "codedeploy:CreateApplication",
                "codedeploy:DeleteApplication",
                "codedeploy:UpdateApplication",
                "codedeploy:CreateDeployment",
                "codedeploy:CreateDeploymentGroup",
                "codedeploy:DeleteDeploymentGroup",
                "codedeploy:UpdateDeploymentGroup",
                "codedeploy:GetDeploymentConfig",
                "codedeploy:GetDeployment",
                "codedeploy:RegisterApplicationRevision",
            ])
            .resources([
                scope.regional("codedeploy", &format!("application:{target}*")),
                scope.regional("codedeploy", &format!("deploymentgroup:{target}*")),
                scope.regional(
                    "codedeploy",
                    &format!("deploymentconfig:{CANARY_DEPLOYMENT_CONFIG}"),
                ),
            ]),
        PolicyStatement::allow("LambdaPermissions")
            .actions([
                "lambda:GetFunction",
                "lambda:DeleteFunction",
                "lambda:CreateFunction",
                "lambda:UpdateFunction",
                "lambda:ListVersionsByFunction",
                "lambda:PublishVersion",
                "lambda:UpdateAlias",
                "lambda:DeleteAlias",
                "lambda:GetAlias",
                "lambda:CreateAlias",
                "lambda:AddPermission",
                "lambda:UpdateFunctionCode",
                "lambda:RemovePermission",
            ])
            .resources([scope.regional(
                "lambda",
                &format!("function:{FUNCTION_NAME_PREFIX}*"),
            )]),
        PolicyStatement::allow("AlarmPermissions")
            .actions([
                "cloudwatch:DescribeAlarms",
                "cloudwatch:DeleteAlarms",
                "cloudwatch:PutMetricAlarm",
            ])
            .resources([scope.regional("cloudwatch", &format!("alarm:{target}*"))]),
        PolicyStatement::allow("SSMPermissions")
            .actions(["ssm:GetParameter"])
            .resources([scope.regional(
                "ssm",
                &format!("parameter/{BOOTSTRAP_PARAMETER_PATH}/*"),
            )]),
    ]
}

// ---------------------------------------------------------------------------
// Baseline statements
// ---------------------------------------------------------------------------

/// What every build project's role gets: its own log group and the pipeline's
/// artifact objects. No deploy-level access.
pub fn project_base_statements(
    region: &str,
    account: &str,
    project_name: &str,
    bucket_name: &str,
) -> Vec<PolicyStatement> {
    let log_group = format!("arn:aws:logs:{region}:{account}:log-group:/aws/codebuild/{project_name}");
    vec![
        PolicyStatement::allow("BuildLogs")
            .actions([
                "logs:CreateLogGroup",
                "logs:CreateLogStream",
                "logs:PutLogEvents",
            ])
            .resources([log_group.clone(), format!("{log_group}:*")]),
        PolicyStatement::allow("ArtifactObjects")
            .actions([
                "s3:GetObject*",
                "s3:GetBucket*",
                "s3:List*",
                "s3:PutObject",
                "s3:Abort*",
            ])
            .resources([
                format!("arn:aws:s3:::{bucket_name}"),
                format!("arn:aws:s3:::{bucket_name}/*"),
            ]),
    ]
}

/// What the pipeline's own role needs: artifact objects and starting the
/// given build projects.
pub fn pipeline_role_statements(
    region: &str,
    account: &str,
    bucket_name: &str,
    project_names: &[&str],
) -> Vec<PolicyStatement> {
    vec![
        PolicyStatement::allow("ArtifactObjects")
            .actions([
                "s3:GetObject*",
                "s3:GetBucket*",
                "s3:List*",
                "s3:PutObject",
                "s3:DeleteObject*",
                "s3:Abort*",
            ])
            .resources([
                format!("arn:aws:s3:::{bucket_name}"),
                format!("arn:aws:s3:::{bucket_name}/*"),
            ]),
        PolicyStatement::allow("StartBuilds")
            .actions([
                "codebuild:BatchGetBuilds",
                "codebuild:StartBuild",
                "codebuild:StopBuild",
            ])
            .resources(
                project_names
                    .iter()
                    .map(|p| format!("arn:aws:codebuild:{region}:{account}:project/{p}")),
            ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
