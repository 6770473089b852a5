mod cli;
mod commands;
mod mcp;
mod page_range;
mod pdf;
mod query;
mod selection;
mod session;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use pdf::PageRenderer;
use session::Session;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "pagepick=debug,info",
        _ => "trace",
    };
    // stdout carries command output and the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Mcp { render, ai } => {
            let renderer = PageRenderer::with_pdfium(render.into())?;
            let matcher = commands::matcher_from(&ai);
            if matcher.is_none() {
                tracing::warn!("no API key configured; pdf_query will be unavailable");
            }
            mcp::run_server(Session::new(renderer, matcher)).await?;
        }
        Commands::Info { path } => {
            commands::info::run(&path)?;
        }
        Commands::Preview {
            path,
            thumbnails,
            json,
            render,
        } => {
            let renderer = PageRenderer::with_pdfium(render.into())?;
            commands::preview::run(&path, &renderer, thumbnails.as_deref(), json).await?;
        }
        Commands::Query {
            path,
            query,
            render,
            ai,
        } => {
            let matcher = commands::require_matcher(&ai)?;
            let renderer = PageRenderer::with_pdfium(render.into())?;
            commands::query::run(&path, &query, &renderer, &matcher).await?;
        }
        Commands::Export {
            path,
            pages,
            query,
            output,
            render,
            ai,
        } => match (pages, query) {
            (Some(pages), _) => {
                commands::export::run_ranges(&path, &pages, output.as_deref())?;
            }
            (None, Some(query)) => {
                let matcher = commands::require_matcher(&ai)?;
                let renderer = PageRenderer::with_pdfium(render.into())?;
                commands::export::run_query(&path, &query, output.as_deref(), renderer, matcher)
                    .await?;
            }
            (None, None) => anyhow::bail!("Pass --pages or --query"),
        },
    }

    Ok(())
}
