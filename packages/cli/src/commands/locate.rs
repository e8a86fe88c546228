use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::open_session;

#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Element identity
    pub oid: String,

    /// Project root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Also print the element's source, without identity attributes
    #[arg(long)]
    pub code: bool,
}

pub async fn locate(args: LocateArgs) -> Result<()> {
    let session = open_session(args.root).await?;
    let node = session
        .template_node(&args.oid)
        .ok_or_else(|| anyhow!("no element with identity {}", args.oid))?;

    println!(
        "{}:{}:{}",
        node.path.display(),
        node.start_tag.start.line,
        node.start_tag.start.column
    );
    if let Some(component) = &node.component {
        println!("  {} {}", "component".dimmed(), component);
    }
    if let Some(kind) = node.dynamic_type {
        println!("  {} {:?}", "dynamic".dimmed(), kind);
    }
    if let Some(kind) = node.core_element_type {
        println!("  {} {:?}", "core".dimmed(), kind);
    }

    if args.code {
        if let Some(block) = session.code_block(&args.oid, true).await {
            println!();
            println!("{}", block);
        }
    }
    Ok(())
}
