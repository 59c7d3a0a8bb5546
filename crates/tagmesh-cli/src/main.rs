// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tagmesh CLI entrypoint.
//!
//! Developer commands over snapshot files (JSON arrays of records):
//!
//! ```text
//! tagmesh resolve <snapshot.json> <id> <tag>
//! tagmesh query <snapshot.json> --where tag=value [--where ...]
//! tagmesh diff <previous.json> <current.json>
//! ```
//!
//! The CLI carries no formula evaluator, so formulas print as their source
//! text. Engine config is read from `--config-dir` or the platform config
//! directory; logs go to stderr and honour `RUST_LOG`.

// The CLI is expected to print to stdout.
#![allow(clippy::print_stdout)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tagmesh_config_fs::FsConfigStore;
use tagmesh_core::{
    codec, resolve_display, CalcContext, ConfigService, EngineConfig, Snapshot, TypedValue,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "tagmesh developer CLI")]
struct Args {
    /// Directory holding `engine.json` (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the display value of one tag.
    Resolve {
        /// Snapshot JSON file
        snapshot: PathBuf,
        /// Record id
        id: String,
        /// Tag name
        tag: String,
    },
    /// Print ids of records matching every `tag=value` filter, as JSON.
    Query {
        /// Snapshot JSON file
        snapshot: PathBuf,
        /// Filter in `tag=value` form (repeatable); values use tag-value syntax
        #[arg(long = "where", value_name = "TAG=VALUE", required = true)]
        filters: Vec<String>,
    },
    /// Print added, removed and updated records between two snapshots, as JSON.
    Diff {
        /// Previous snapshot JSON file
        previous: PathBuf,
        /// Current snapshot JSON file
        current: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    match args.command {
        Command::Resolve { snapshot, id, tag } => {
            let ctx = context(&snapshot, args.config_dir.as_deref())?;
            let record = ctx
                .record_by_id(&id)?
                .ok_or_else(|| anyhow!("no record with id {id:?} in {}", snapshot.display()))?;
            println!("{}", resolve_display(&ctx, &record, &tag));
        }
        Command::Query { snapshot, filters } => {
            let ctx = context(&snapshot, args.config_dir.as_deref())?;
            let (tags, values) = parse_filters(&filters)?;
            let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
            let hits = ctx.query(&tags, &values)?;
            info!(matches = hits.len(), "query finished");
            let ids: Vec<&str> = hits.iter().map(|r| r.id()).collect();
            println!("{}", serde_json::to_string(&ids)?);
        }
        Command::Diff { previous, current } => {
            let prev = load_snapshot(&previous)?;
            let curr = load_snapshot(&current)?;
            let delta = tagmesh_core::diff(&prev, &curr);
            println!("{}", serde_json::to_string_pretty(&delta)?);
        }
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Snapshot::from_json(&text).with_context(|| format!("parse {}", path.display()))
}

fn context(snapshot: &Path, config_dir: Option<&Path>) -> Result<CalcContext> {
    let snapshot = load_snapshot(snapshot)?;
    Ok(CalcContext::from_snapshot(&snapshot).with_config(engine_config(config_dir)))
}

fn engine_config(config_dir: Option<&Path>) -> EngineConfig {
    let store = match config_dir {
        Some(dir) => FsConfigStore::with_base(dir),
        None => FsConfigStore::new(),
    };
    match store.and_then(|s| ConfigService::new(s).load_engine_config()) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "using default engine config");
            EngineConfig::default()
        }
    }
}

fn parse_filters(filters: &[String]) -> Result<(Vec<String>, Vec<TypedValue>)> {
    let mut tags = Vec::with_capacity(filters.len());
    let mut values = Vec::with_capacity(filters.len());
    for filter in filters {
        let (tag, value) = filter
            .split_once('=')
            .ok_or_else(|| anyhow!("filter {filter:?} is not in tag=value form"))?;
        tags.push(tag.trim().to_owned());
        values.push(codec::decode(value).unwrap_or_else(|| TypedValue::str(value)));
    }
    Ok((tags, values))
}
