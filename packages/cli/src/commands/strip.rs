use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tessera_common::{FileSystem, RealFileSystem};
use tessera_editor::ids;
use tessera_parser::Printer;

use super::parse_file;

#[derive(Args, Debug)]
pub struct StripArgs {
    /// Source file
    pub file: PathBuf,

    /// Rewrite the file in place instead of printing it
    #[arg(long)]
    pub write: bool,
}

pub fn strip(args: StripArgs) -> Result<()> {
    let (source, mut module) = parse_file(&args.file)?;
    let report = ids::strip(&mut module);
    let mut printer = Printer::new(&source);
    printer.mark_dirty_many(report.dirty.iter().cloned());
    let clean = printer.print(&module);

    if !args.write {
        print!("{}", clean);
        return Ok(());
    }
    if report.removed == 0 {
        println!("{} {} has no identities", "✓".green(), args.file.display());
        return Ok(());
    }
    RealFileSystem
        .write_atomic(&args.file, &clean)
        .with_context(|| format!("cannot write {}", args.file.display()))?;
    println!(
        "{} removed {} identities from {}",
        "✓".green(),
        report.removed,
        args.file.display()
    );
    Ok(())
}
