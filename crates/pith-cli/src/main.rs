//! Pith CLI - a small git-compatible object store and HTTP clone client.

use clap::{ArgGroup, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{CatMode, Context, ListFormat};
use config::Config;

/// Pith - content-addressed objects and smart HTTP clone
#[derive(Parser, Debug)]
#[command(name = "pith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Run as if started in this directory
    #[arg(short = 'C', value_name = "DIR", default_value = ".", global = true)]
    dir: PathBuf,

    /// YAML configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty repository
    Init {
        /// Branch HEAD points at
        #[arg(short = 'b', long)]
        initial_branch: Option<String>,
    },

    /// Compute a blob id for a file
    HashObject {
        /// Store the blob in the object database
        #[arg(short)]
        w: bool,
        file: PathBuf,
    },

    /// Show the content, type or size of an object
    #[command(group(ArgGroup::new("mode").required(true)))]
    CatFile {
        /// Pretty-print the content
        #[arg(short, group = "mode")]
        p: bool,
        /// Show the type
        #[arg(short, group = "mode")]
        t: bool,
        /// Show the size
        #[arg(short, group = "mode")]
        s: bool,
        /// Exit with zero status if the object exists
        #[arg(short, group = "mode")]
        e: bool,
        object: String,
    },

    /// List the entries of a tree
    LsTree {
        /// Only show names
        #[arg(long, conflicts_with_all = ["object_only", "long"])]
        name_only: bool,
        /// Only show object ids
        #[arg(long, conflicts_with = "long")]
        object_only: bool,
        /// Show blob sizes
        #[arg(short, long)]
        long: bool,
        tree: String,
    },

    /// Store the work tree as a tree object
    WriteTree,

    /// Create a commit object
    CommitTree {
        tree: String,
        /// Parent commit (repeatable)
        #[arg(short = 'p')]
        parents: Vec<String>,
        /// Commit message
        #[arg(short = 'm')]
        message: String,
    },

    /// Clone a repository over smart HTTP
    Clone {
        url: String,
        /// Destination directory, relative to -C
        #[arg(value_name = "DIR")]
        directory: Option<PathBuf>,
        /// Branch used when the remote does not name its HEAD branch
        #[arg(long)]
        default_branch: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pith={log_level},pith_git={log_level},pith_storage={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Runs the command. `Ok(false)` exits non-zero without a message.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = Config::load(cli.config.as_deref())?;
    let ctx = Context {
        work_tree: cli.dir,
        config,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Init { initial_branch } => {
            commands::init(&ctx, initial_branch.as_deref(), &mut out)?;
        }
        Commands::HashObject { w, file } => commands::hash_object(&ctx, &file, w, &mut out)?,
        Commands::CatFile {
            p,
            t,
            s,
            e: _,
            object,
        } => {
            let mode = if p {
                CatMode::Pretty
            } else if t {
                CatMode::Type
            } else if s {
                CatMode::Size
            } else {
                CatMode::Exists
            };
            if !commands::cat_file(&ctx, mode, &object, &mut out)? {
                return Ok(false);
            }
        }
        Commands::LsTree {
            name_only,
            object_only,
            long,
            tree,
        } => {
            let format = if name_only {
                ListFormat::NameOnly
            } else if object_only {
                ListFormat::ObjectOnly
            } else if long {
                ListFormat::Long
            } else {
                ListFormat::Full
            };
            commands::ls_tree(&ctx, &tree, format, &mut out)?;
        }
        Commands::WriteTree => commands::write_tree_cmd(&ctx, &mut out)?,
        Commands::CommitTree {
            tree,
            parents,
            message,
        } => commands::commit_tree(&ctx, &tree, &parents, &message, &mut out)?,
        Commands::Clone {
            url,
            directory,
            default_branch,
        } => commands::clone(
            &ctx,
            &url,
            directory.as_deref(),
            default_branch.as_deref(),
            &mut out,
        )?,
    }

    out.flush()?;
    Ok(true)
}
