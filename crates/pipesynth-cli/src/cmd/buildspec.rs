use super::Target;
use crate::output::print_json;
use anyhow::Context;
use pipesynth_core::jobs::QualityCheck;

pub fn run(target: &Target<'_>, job: &str, json: bool) -> anyhow::Result<()> {
    let check: QualityCheck = job.parse()?;
    let cfg = target.resolve()?;
    let spec = check.job_spec(&cfg);

    if json {
        return print_json(&spec);
    }

    let yaml = spec
        .to_buildspec()
        .to_yaml()
        .with_context(|| format!("failed to render build spec for {check}"))?;
    print!("{yaml}");
    Ok(())
}
