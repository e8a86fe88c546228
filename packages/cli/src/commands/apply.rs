use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::io::Read;
use std::path::{Path, PathBuf};
use tessera_editor::parse_requests;
use tessera_workspace::{CodeDiff, RequestOutcome};

use super::open_session;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// JSON file with an array of edit requests ("-" for stdin)
    pub requests: PathBuf,

    /// Project root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Print the diffs instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

fn read_requests(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut json = String::new();
        std::io::stdin().read_to_string(&mut json)?;
        return Ok(json);
    }
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Unified diff of one file, coloured by line kind
pub fn render_diff(diff: &CodeDiff, root: &Path) -> String {
    let name = diff.path.strip_prefix(root).unwrap_or(&diff.path).display().to_string();
    let text = TextDiff::from_lines(&diff.original, &diff.generated);

    let mut out = format!("{}\n{}\n", format!("--- a/{}", name).bold(), format!("+++ b/{}", name).bold());
    for hunk in text.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header().to_string().cyan()));
        for change in hunk.iter_changes() {
            let value = change.value().trim_end_matches('\n');
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", value).red().to_string(),
                ChangeTag::Insert => format!("+{}", value).green().to_string(),
                ChangeTag::Equal => format!(" {}", value),
            };
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

fn print_outcome(outcome: &RequestOutcome) {
    match outcome {
        RequestOutcome::Applied { oid, warnings, .. } => {
            println!("  {} {}", "✓".green(), oid);
            for warning in warnings {
                println!("    {} {}", "⚠".yellow(), warning);
            }
        }
        RequestOutcome::MissingIdentity { oid } => {
            println!("  {} {}: no element with this identity", "✗".red(), oid);
        }
        RequestOutcome::NotInFile { oid, path } => {
            println!("  {} {}: not found in {}", "✗".red(), oid, path.display());
        }
        RequestOutcome::ParseFailed { oid, path, message } => {
            println!("  {} {}: {} did not parse: {}", "✗".red(), oid, path.display(), message);
        }
        RequestOutcome::ReadFailed { oid, path, message } => {
            println!("  {} {}: cannot read {}: {}", "✗".red(), oid, path.display(), message);
        }
    }
}

pub async fn apply(args: ApplyArgs) -> Result<()> {
    let requests = parse_requests(&read_requests(&args.requests)?)?;
    let session = open_session(args.root).await?;

    if args.dry_run {
        let batch = session.build_diffs(&requests).await;
        for diff in &batch.diffs {
            print!("{}", render_diff(diff, session.root()));
        }
        println!();
        batch.outcomes.iter().for_each(print_outcome);
        if !batch.all_applied() {
            bail!("some requests could not be applied");
        }
        return Ok(());
    }

    let report = session.apply(&requests).await;
    report.batch.outcomes.iter().for_each(print_outcome);
    println!();
    for result in &report.writes.results {
        let shown = result.path.strip_prefix(session.root()).unwrap_or(&result.path);
        match &result.result {
            Ok(()) if result.formatted => println!("  {} wrote {}", "✓".green(), shown.display()),
            Ok(()) => println!("  {} wrote {} (unformatted)", "✓".yellow(), shown.display()),
            Err(e) => println!("  {} {}", "✗".red(), e),
        }
    }

    if !report.success() {
        bail!("some edits were not written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_diff() {
        colored::control::set_override(false);
        let diff = CodeDiff {
            path: PathBuf::from("/app/page.tsx"),
            original: "a\nb\nc\n".to_string(),
            generated: "a\nB\nc\n".to_string(),
        };
        let rendered = render_diff(&diff, Path::new("/app"));
        assert_eq!(
            rendered,
            "--- a/page.tsx\n+++ b/page.tsx\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n"
        );
    }
}
