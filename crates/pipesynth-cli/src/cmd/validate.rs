use super::Target;
use crate::output::print_json;
use pipesynth_core::config::WarnLevel;

pub fn run(target: &Target<'_>, json: bool) -> anyhow::Result<()> {
    let cfg = target.resolve()?;
    let warnings = cfg.validate();

    if json {
        let value = serde_json::json!({
            "environment": cfg.name,
            "config": cfg,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Environment '{}' is valid. No warnings.", cfg.name);
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("context validation found errors");
    }
    Ok(())
}
