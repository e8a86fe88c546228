use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::open_session;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Project root (defaults to the current directory)
    pub root: Option<PathBuf>,

    /// Print the template map as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn scan(args: ScanArgs) -> Result<()> {
    let session = open_session(args.root).await?;
    let map = session.template_map();

    if args.json {
        let nodes: BTreeMap<String, _> = session
            .files()
            .iter()
            .flat_map(|path| map.file_nodes(path))
            .collect();
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    println!("🔍 {} {}", "Scanned".green().bold(), session.root().display());
    println!();
    for path in session.files() {
        let nodes = map.file_nodes(&path);
        let shown = path.strip_prefix(session.root()).unwrap_or(&path);
        println!("  {} {} ({} elements)", "✓".green(), shown.display(), nodes.len());
    }
    println!();
    println!("   Identities: {}", map.len());
    Ok(())
}
