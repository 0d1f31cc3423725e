//! CLI module - Command-line interface for dramawatch
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

use crate::domain::WorkType;

/// dramawatch - Korean drama and movie availability on Taiwanese streaming platforms
#[derive(Parser)]
#[command(name = "dramawatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with scheduled refreshes
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Scrape platform listings now and update the cache
    #[command(alias = "r")]
    Refresh {
        /// Only refresh these platforms, e.g. "LINE TV-drama"
        #[arg(long = "platform")]
        platforms: Vec<String>,
    },

    /// Show where a title can be watched
    #[command(alias = "l")]
    Lookup {
        /// "drama" or "movie"
        work_type: WorkType,
        /// Exact title as listed by the platforms
        #[arg(required = true)]
        title: Vec<String>,
    },

    /// List the scraped platforms and their cache state
    #[command(alias = "ls")]
    Platforms,

    /// Search the catalog for a drama, or a movie with --movie
    #[command(alias = "s")]
    Search {
        #[arg(long)]
        movie: bool,
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Show one season of a catalog work
    Season {
        /// Catalog work id
        work_id: u64,
        /// Season number
        season: u32,
    },

    /// Fetch all seasons of a work, annotate and store them
    #[command(alias = "i")]
    Ingest {
        /// Catalog work id
        work_id: u64,
        /// Only fetch seasons featuring this actor
        #[arg(long)]
        actor: Option<String>,
    },

    /// Fetch a movie, annotate and store it
    #[command(alias = "im")]
    IngestMovie {
        /// Catalog movie id
        work_id: u64,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
