use clap::{ArgAction, Args, Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::pdf::{RenderConfig, RenderPipeline};
use crate::query::client::{AiConfig, ANTHROPIC_API_URL, DEFAULT_MODEL};
use crate::query::DEFAULT_EXCERPT_CHARS;

#[derive(Parser)]
#[command(name = "pagepick")]
#[command(about = "Preview PDF pages, find them with natural-language queries, and export a selection")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server holding one editing session
    Mcp {
        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        ai: AiArgs,
    },

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Render page thumbnails and extract page text
    Preview {
        /// PDF file to preview
        path: PathBuf,

        /// Directory to write page_NNNN.jpg thumbnails into
        #[arg(short, long)]
        thumbnails: Option<PathBuf>,

        /// Print a JSON manifest with data URIs instead of text excerpts
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Ask which pages match a natural-language query
    Query {
        /// PDF file to search
        path: PathBuf,

        /// What to look for
        query: String,

        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        ai: AiArgs,
    },

    /// Export selected pages to a new PDF
    #[command(alias = "cat")]
    Export {
        /// PDF file to extract from
        path: PathBuf,

        /// Page ranges (e.g., "1-5,10,15-end")
        #[arg(short, long, required_unless_present = "query", conflicts_with = "query")]
        pages: Option<String>,

        /// Select pages with a natural-language query instead of ranges
        #[arg(short, long)]
        query: Option<String>,

        /// Output file (default: extracted_<name> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        ai: AiArgs,
    },
}

#[derive(Args, Clone)]
pub struct RenderArgs {
    /// Thumbnail scale relative to the page's native size
    #[arg(long, default_value_t = 0.5)]
    pub scale: f32,

    /// JPEG quality for thumbnails (1-100)
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Render this many pages concurrently (default: one at a time)
    #[arg(long)]
    pub workers: Option<NonZeroUsize>,

    /// Path to the pdfium shared library
    #[arg(long, env = "PDFIUM_LIB")]
    pub pdfium_lib: Option<PathBuf>,
}

impl From<RenderArgs> for RenderConfig {
    fn from(args: RenderArgs) -> Self {
        let pipeline = match args.workers {
            Some(workers) if workers.get() > 1 => RenderPipeline::Concurrent { workers },
            _ => RenderPipeline::Sequential,
        };
        RenderConfig {
            scale: args.scale,
            quality: args.quality,
            pipeline,
            pdfium_library: args.pdfium_lib,
        }
    }
}

#[derive(Args, Clone)]
pub struct AiArgs {
    /// API key for the text-generation service
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for query matching
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Messages endpoint
    #[arg(long, default_value = ANTHROPIC_API_URL)]
    pub api_url: String,

    /// Maximum tokens in the model's reply
    #[arg(long, default_value_t = 1024)]
    pub max_tokens: u32,

    /// Characters of text sent per page
    #[arg(long, default_value_t = DEFAULT_EXCERPT_CHARS)]
    pub excerpt_chars: usize,
}

impl AiArgs {
    /// `None` when no API key was provided.
    pub fn config(&self) -> Option<AiConfig> {
        let api_key = self.api_key.as_deref().filter(|key| !key.trim().is_empty())?;
        Some(AiConfig {
            api_key: api_key.to_string(),
            model: self.model.clone(),
            endpoint: self.api_url.clone(),
            max_tokens: self.max_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_requires_pages_or_query() {
        assert!(Cli::try_parse_from(["pagepick", "export", "a.pdf"]).is_err());
        assert!(Cli::try_parse_from(["pagepick", "export", "a.pdf", "-p", "1", "-q", "x"]).is_err());
        assert!(Cli::try_parse_from(["pagepick", "export", "a.pdf", "-p", "1-2"]).is_ok());
    }

    #[test]
    fn workers_select_the_pipeline() {
        let cli = Cli::try_parse_from(["pagepick", "preview", "a.pdf", "--workers", "4"]).unwrap();
        let Commands::Preview { render, .. } = cli.command else {
            panic!("expected preview");
        };
        let config = RenderConfig::from(render);
        assert!(matches!(config.pipeline, RenderPipeline::Concurrent { workers } if workers.get() == 4));
        assert_eq!(config.quality, 80);
        assert_eq!(config.scale, 0.5);
    }

    #[test]
    fn blank_api_key_means_unconfigured() {
        let args = AiArgs {
            api_key: Some("  ".to_string()),
            model: DEFAULT_MODEL.to_string(),
            api_url: ANTHROPIC_API_URL.to_string(),
            max_tokens: 10,
            excerpt_chars: 10,
        };
        assert!(args.config().is_none());
    }
}
