use super::Target;
use crate::output::{print_json, print_table};
use anyhow::Context;
use pipesynth_core::stack::PipelineStack;
use pipesynth_core::topology::Artifact;

pub fn run(target: &Target<'_>, json: bool) -> anyhow::Result<()> {
    let cfg = target.resolve()?;
    let stack = PipelineStack::assemble(&cfg, None).context("failed to assemble pipeline")?;

    if json {
        return print_json(&stack.pipeline);
    }

    let join = |artifacts: &[Artifact]| -> String {
        if artifacts.is_empty() {
            return "-".to_string();
        }
        artifacts
            .iter()
            .map(Artifact::name)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let rows: Vec<Vec<String>> = stack
        .pipeline
        .actions()
        .map(|(stage, action)| {
            vec![
                stage.name.clone(),
                action.name.clone(),
                action.project().unwrap_or("(github)").to_string(),
                join(&action.inputs),
                join(&action.outputs),
            ]
        })
        .collect();

    println!(
        "Pipeline '{}' (bucket: {})",
        stack.pipeline.name, stack.pipeline.artifact_bucket
    );
    print_table(&["STAGE", "ACTION", "PROJECT", "INPUTS", "OUTPUTS"], &rows);
    Ok(())
}
