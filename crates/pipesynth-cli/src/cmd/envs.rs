use super::Target;
use crate::output::{print_json, print_table};

pub fn run(target: &Target<'_>, json: bool) -> anyhow::Result<()> {
    let ctx = target.load_context()?;
    let default = ctx.environment_type();
    let mut names = ctx.environments();
    names.sort_unstable();

    if json {
        let value = serde_json::json!({
            "default": default,
            "environments": names,
        });
        return print_json(&value);
    }

    if names.is_empty() {
        println!("No environments defined in {}.", target.context.display());
        return Ok(());
    }

    let rows: Vec<Vec<String>> = names
        .iter()
        .map(|name| {
            let marker = if Some(*name) == default { "*" } else { "" };
            vec![marker.to_string(), name.to_string()]
        })
        .collect();
    print_table(&["", "ENVIRONMENT"], &rows);
    Ok(())
}
