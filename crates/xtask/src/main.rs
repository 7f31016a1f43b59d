use anyhow::Context;
use shardline_domain::{lint_world, WorldData};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("world-lint") => {
            let path = args
                .next()
                .context("Usage: cargo xtask world-lint <world.json>")?;
            world_lint(&path)
        }
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  world-lint <world.json>"),
    }
}

fn world_lint(path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let world: WorldData =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let findings = lint_world(&world);
    for finding in &findings {
        println!("{finding}");
    }

    if !findings.is_empty() {
        anyhow::bail!("{} finding(s) in {path}", findings.len());
    }
    println!("{path}: no findings");
    Ok(())
}
