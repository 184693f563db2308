use crate::error::Result;
use crate::io;
use crate::paths;
use crate::policy::{self, PolicyDocument, PolicyStatement};
use crate::stack::{BuildProject, PipelineStack};
use crate::topology::{Action, ActionKind, Artifact, SourceTrigger};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

const BUCKET_ID: &str = "ArtifactBucket";
const PIPELINE_ID: &str = "Pipeline";
const PIPELINE_ROLE_ID: &str = "PipelineRole";

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// The CloudFormation template handed to the provisioning engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    body: Value,
}

impl Template {
    pub fn render(stack: &PipelineStack) -> Result<Self> {
        let cfg = &stack.config;
        let mut resources = Map::new();

        resources.insert(BUCKET_ID.to_string(), artifact_bucket(&cfg.pipeline.bucket_name));

        for project in &stack.projects {
            let role_id = format!("{}Role", project.logical_id);
            let policy_id = format!("{role_id}DefaultPolicy");
            resources.insert(role_id.clone(), service_role("codebuild.amazonaws.com"));
            resources.insert(
                policy_id.clone(),
                role_policy(&policy_id, &role_id, project.role_statements(cfg))?,
            );
            resources.insert(
                project.logical_id.clone(),
                build_project(project, &role_id, &policy_id)?,
            );
        }

        let pipeline_policy_id = format!("{PIPELINE_ROLE_ID}DefaultPolicy");
        resources.insert(
            PIPELINE_ROLE_ID.to_string(),
            service_role("codepipeline.amazonaws.com"),
        );
        resources.insert(
            pipeline_policy_id.clone(),
            role_policy(
                &pipeline_policy_id,
                PIPELINE_ROLE_ID,
                policy::pipeline_role_statements(
                    &cfg.region,
                    &cfg.account,
                    &cfg.pipeline.bucket_name,
                    &stack.project_names(),
                ),
            )?,
        );
        resources.insert(
            PIPELINE_ID.to_string(),
            pipeline_resource(stack, &pipeline_policy_id),
        );

        for (_, action) in stack.pipeline.actions() {
            if let Some(webhook) = source_webhook(action) {
                let id = format!("{}WebhookResource", logical_fragment(&action.name));
                resources.insert(id, webhook);
            }
        }

        let body = json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": format!(
                "Delivery pipeline for {} ({} environment)",
                cfg.pipeline.target_stack, cfg.name
            ),
            "Resources": resources,
            "Outputs": {
                "PipelineName": { "Value": { "Ref": PIPELINE_ID } },
                "ArtifactBucketName": { "Value": { "Ref": BUCKET_ID } },
            },
        });

        tracing::debug!(resources = body["Resources"].as_object().map_or(0, Map::len), "rendered template");
        Ok(Self { body })
    }

    pub fn as_value(&self) -> &Value {
        &self.body
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.body["Resources"].get(logical_id)
    }

    /// Logical ids of every resource of the given type, in template order.
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.body["Resources"]
            .as_object()
            .map(|m| {
                m.iter()
                    .filter(|(_, r)| r["Type"] == resource_type)
                    .map(|(id, _)| id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }

    /// Write to `{out_dir}/{stack_name}.template.json` and return the path.
    pub fn write(&self, out_dir: &Path, stack_name: &str) -> Result<PathBuf> {
        let path = paths::template_path(out_dir, stack_name);
        let mut data = self.to_json_pretty()?;
        data.push('\n');
        io::atomic_write(&path, data.as_bytes())?;
        tracing::info!(path = %path.display(), "wrote template");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Resource builders
// ---------------------------------------------------------------------------

fn artifact_bucket(bucket_name: &str) -> Value {
    json!({
        "Type": "AWS::S3::Bucket",
        "Properties": {
            "BucketName": bucket_name,
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            },
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [
                    { "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" } }
                ]
            },
        },
        "UpdateReplacePolicy": "Retain",
        "DeletionPolicy": "Retain",
    })
}

fn service_role(principal: &str) -> Value {
    json!({
        "Type": "AWS::IAM::Role",
        "Properties": {
            "AssumeRolePolicyDocument": {
                "Version": policy::POLICY_VERSION,
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": principal },
                    "Action": "sts:AssumeRole",
                }],
            },
        },
    })
}

fn role_policy(policy_id: &str, role_id: &str, statements: Vec<PolicyStatement>) -> Result<Value> {
    let document = serde_json::to_value(PolicyDocument::new(statements))?;
    Ok(json!({
        "Type": "AWS::IAM::Policy",
        "Properties": {
            "PolicyName": policy_id,
            "PolicyDocument": document,
            "Roles": [{ "Ref": role_id }],
        },
    }))
}

fn build_project(project: &BuildProject, role_id: &str, policy_id: &str) -> Result<Value> {
    let variables: Vec<Value> = project
        .environment_variables
        .iter()
        .map(|(name, var)| json!({ "Name": name, "Type": var.kind, "Value": var.value }))
        .collect();

    let mut environment = json!({
        "Type": "LINUX_CONTAINER",
        "Image": project.environment.image,
        "ComputeType": project.environment.compute_type,
        "PrivilegedMode": project.environment.privileged,
        "ImagePullCredentialsType": "CODEBUILD",
    });
    if !variables.is_empty() {
        environment["EnvironmentVariables"] = Value::Array(variables);
    }
    let build_spec = project.spec.render()?;

    Ok(json!({
        "Type": "AWS::CodeBuild::Project",
        "Properties": {
            "Name": project.name,
            "ServiceRole": { "Fn::GetAtt": [role_id, "Arn"] },
            "Source": { "Type": "CODEPIPELINE", "BuildSpec": build_spec },
            "Artifacts": { "Type": "CODEPIPELINE" },
            "Environment": environment,
        },
        "DependsOn": [policy_id],
    }))
}

fn pipeline_resource(stack: &PipelineStack, policy_id: &str) -> Value {
    let stages: Vec<Value> = stack
        .pipeline
        .stages()
        .iter()
        .map(|stage| {
            let actions: Vec<Value> = stage
                .actions
                .iter()
                .map(|a| action_json(stack, a))
                .collect();
            json!({ "Name": stage.name, "Actions": actions })
        })
        .collect();

    json!({
        "Type": "AWS::CodePipeline::Pipeline",
        "Properties": {
            "Name": stack.pipeline.name,
            "RoleArn": { "Fn::GetAtt": [PIPELINE_ROLE_ID, "Arn"] },
            "ArtifactStore": { "Type": "S3", "Location": { "Ref": BUCKET_ID } },
            "Stages": stages,
        },
        "DependsOn": [policy_id],
    })
}

fn artifact_refs(artifacts: &[Artifact]) -> Value {
    Value::Array(
        artifacts
            .iter()
            .map(|a| json!({ "Name": a.name() }))
            .collect(),
    )
}

fn action_json(stack: &PipelineStack, action: &Action) -> Value {
    let mut value = match &action.kind {
        ActionKind::GithubSource {
            owner,
            repo,
            branch,
            oauth_token,
            trigger,
        } => json!({
            "Name": action.name,
            "ActionTypeId": {
                "Category": "Source",
                "Owner": "ThirdParty",
                "Provider": "GitHub",
                "Version": "1",
            },
            "Configuration": {
                "Owner": owner,
                "Repo": repo,
                "Branch": branch,
                "OAuthToken": oauth_token.dynamic_reference(),
                "PollForSourceChanges": *trigger == SourceTrigger::Poll,
            },
        }),
        ActionKind::CodeBuild { project } => {
            let project_ref = match stack.project(project) {
                Some(p) => json!({ "Ref": p.logical_id }),
                None => json!(project),
            };
            json!({
                "Name": action.name,
                "ActionTypeId": {
                    "Category": "Build",
                    "Owner": "AWS",
                    "Provider": "CodeBuild",
                    "Version": "1",
                },
                "Configuration": { "ProjectName": project_ref },
            })
        }
    };

    if !action.inputs.is_empty() {
        value["InputArtifacts"] = artifact_refs(&action.inputs);
    }
    if !action.outputs.is_empty() {
        value["OutputArtifacts"] = artifact_refs(&action.outputs);
    }
    value["RunOrder"] = json!(1);
    value
}

/// Webhook that starts the pipeline on pushes to the source branch. Only
/// webhook-triggered source actions get one.
fn source_webhook(action: &Action) -> Option<Value> {
    let ActionKind::GithubSource {
        branch,
        oauth_token,
        trigger: SourceTrigger::Webhook,
        ..
    } = &action.kind
    else {
        return None;
    };

    Some(json!({
        "Type": "AWS::CodePipeline::Webhook",
        "Properties": {
            "Authentication": "GITHUB_HMAC",
            "AuthenticationConfiguration": { "SecretToken": oauth_token.dynamic_reference() },
            "Filters": [
                { "JsonPath": "$.ref", "MatchEquals": format!("refs/heads/{branch}") }
            ],
            "TargetAction": action.name,
            "TargetPipeline": { "Ref": PIPELINE_ID },
            "TargetPipelineVersion": 1,
            "RegisterWithThirdParty": true,
        },
    }))
}

/// Action names may carry characters CloudFormation rejects in logical ids.
fn logical_fragment(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
