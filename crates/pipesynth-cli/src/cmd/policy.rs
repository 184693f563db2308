use super::Target;
use crate::output::print_json;
use pipesynth_core::policy::{deploy_statements, PolicyDocument, PolicyScope};

/// The deploy policy is always printed as an IAM JSON document.
pub fn run(target: &Target<'_>) -> anyhow::Result<()> {
    let cfg = target.resolve()?;
    let document = PolicyDocument::new(deploy_statements(&PolicyScope::from_config(&cfg)));
    print_json(&document)
}
