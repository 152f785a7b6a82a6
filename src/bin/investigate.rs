//! One-off investigation from the command line.
//!
//! ```text
//! investigate network <ip|domain|url> [--text]
//! investigate topic <keyword> [--sources reddit,news,rss] [--text]
//! ```
//! Prints the key-sorted JSON export (default) or the text report.

use anyhow::{bail, Context, Result};
use osint_aggregator::{
    config::OsintConfig,
    ingest::types::SourceId,
    init_tracing,
    report::{JsonExport, Renderer, TextReport},
    target::TopicTarget,
    Aggregator,
};

const USAGE: &str = "usage: investigate network <target> [--text]\n       investigate topic <keyword> [--sources a,b] [--text]";

#[derive(Debug, PartialEq)]
enum Command {
    Network(String),
    Topic { keyword: String, sources: Vec<SourceId> },
}

fn parse_args(args: &[String]) -> Result<(Command, bool)> {
    let mut text = false;
    let mut sources = Vec::new();
    let mut positional = Vec::new();

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--text" => text = true,
            "--sources" => {
                let list = it.next().context("--sources needs a value")?;
                for s in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    sources.push(s.parse::<SourceId>().map_err(anyhow::Error::msg)?);
                }
            }
            other if other.starts_with("--") => bail!("unknown flag {other}\n{USAGE}"),
            other => positional.push(other.to_string()),
        }
    }

    let cmd = match positional.as_slice() {
        [kind, rest @ ..] if kind == "network" && !rest.is_empty() => {
            Command::Network(rest.join(" "))
        }
        [kind, rest @ ..] if kind == "topic" && !rest.is_empty() => Command::Topic {
            keyword: rest.join(" "),
            sources,
        },
        _ => bail!("{USAGE}"),
    };
    Ok((cmd, text))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cmd, text) = parse_args(&args)?;

    let cfg = OsintConfig::load_default()?;
    let aggregator = Aggregator::from_config(&cfg)?;

    let record = match cmd {
        Command::Network(target) => aggregator.investigate_network(&target).await?,
        Command::Topic { keyword, sources } => {
            aggregator
                .investigate_topic(TopicTarget::new(&keyword, sources)?)
                .await?
        }
    };

    let artifact = if text {
        TextReport.render(&record)?
    } else {
        JsonExport.render(&record)?
    };
    print!("{}", artifact.content);
    tracing::debug!(renderer = artifact.renderer, sha256 = %artifact.sha256, "rendered");
    Ok(())
}
