use super::Target;
use crate::output::print_json;
use anyhow::Context;
use pipesynth_core::config::WarnLevel;
use pipesynth_core::stack::PipelineStack;
use pipesynth_core::template::Template;
use std::path::Path;

pub fn run(
    target: &Target<'_>,
    out_dir: &Path,
    source_dir: Option<&Path>,
    stdout: bool,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = target.resolve()?;

    let warnings = cfg.validate();
    for w in &warnings {
        tracing::warn!("{}", w.message);
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("refusing to synthesize: run 'pipesynth validate' for details");
    }

    let stack = PipelineStack::assemble(&cfg, source_dir).context("failed to assemble pipeline")?;
    let template = Template::render(&stack).context("failed to render template")?;

    if stdout {
        println!("{}", template.to_json_pretty()?);
        return Ok(());
    }

    let path = template
        .write(out_dir, cfg.stack_name())
        .with_context(|| format!("failed to write template to {}", out_dir.display()))?;

    if json {
        let value = serde_json::json!({
            "environment": cfg.name,
            "stack": cfg.stack_name(),
            "template": path,
            "stages": stack.pipeline.stages().len(),
            "projects": stack.projects.len(),
        });
        print_json(&value)?;
    } else {
        println!(
            "Synthesized '{}' ({} environment) to {}",
            cfg.stack_name(),
            cfg.name,
            path.display()
        );
    }
    Ok(())
}
