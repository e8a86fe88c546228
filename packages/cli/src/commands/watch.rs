use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tessera_workspace::ChangeKind;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::StreamExt;

use super::open_session;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Project root (defaults to the current directory)
    pub root: Option<PathBuf>,
}

pub async fn watch(args: WatchArgs) -> Result<()> {
    let session = open_session(args.root).await?;
    let mut changes = session.change_stream();
    session.start_watching().await?;

    println!(
        "👀 {} {} ({} identities)",
        "Watching".green().bold(),
        session.root().display(),
        session.template_map().len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = changes.next() => match change {
                Some(Ok(change)) => {
                    let shown = change.path.strip_prefix(session.root()).unwrap_or(&change.path);
                    let kind = match change.kind {
                        ChangeKind::Modified => "modified".yellow(),
                        ChangeKind::Removed => "removed".red(),
                    };
                    println!(
                        "  {} {} {}",
                        change.timestamp.format("%H:%M:%S").to_string().dimmed(),
                        kind,
                        shown.display()
                    );
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "change notifications dropped");
                }
                None => break,
            },
        }
    }

    println!();
    session.close();
    Ok(())
}
