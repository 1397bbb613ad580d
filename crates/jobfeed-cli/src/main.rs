use anyhow::Result;
use clap::Parser;
use jobfeed_sync::{run_sync_once_from_env, MergeMode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "jobfeed")]
#[command(about = "Aggregate tech and quant job postings into jobs.csv / jobs.json")]
struct Cli {
    /// Union this run's postings with the existing jobs.csv instead of replacing it.
    #[arg(long)]
    merge: bool,
}

impl Cli {
    fn mode(&self) -> MergeMode {
        if self.merge {
            MergeMode::Merge
        } else {
            MergeMode::Replace
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobfeed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::info!(mode = cli.mode().as_str(), "starting jobfeed");
    let summary = run_sync_once_from_env(cli.mode()).await?;

    if summary.persisted {
        println!(
            "sync complete: run_id={} mode={} scraped={} dropped_old={} dropped_closed={} kept={} output={}",
            summary.run_id,
            summary.mode.as_str(),
            summary.total_scraped,
            summary.dropped_stale,
            summary.dropped_closed,
            summary.kept,
            summary.output_csv,
        );
    } else {
        println!("no jobs found; {} left untouched", summary.output_csv);
    }
    if let Some(dir) = &summary.reports_dir {
        println!("report: {dir}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_flag_selects_mode() {
        assert_eq!(Cli::parse_from(["jobfeed"]).mode(), MergeMode::Replace);
        assert_eq!(Cli::parse_from(["jobfeed", "--merge"]).mode(), MergeMode::Merge);
        assert!(Cli::try_parse_from(["jobfeed", "--bogus"]).is_err());
    }
}
