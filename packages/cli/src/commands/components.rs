use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tessera_workspace::template_map::exported_components;

use super::parse_file;

#[derive(Args, Debug)]
pub struct ComponentsArgs {
    /// Source file
    pub file: PathBuf,
}

pub fn components(args: ComponentsArgs) -> Result<()> {
    let (_, module) = parse_file(&args.file)?;
    for name in exported_components(&module) {
        println!("{}", name);
    }
    Ok(())
}
