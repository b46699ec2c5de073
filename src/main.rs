// SPDX-License-Identifier: MPL-2.0

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagectx::context::{ContextService, CreateContextRequest, PublishRequest};
use pagectx::graph::{GraphClient, ReqwestTransport};
use pagectx::index::{HttpSemanticIndex, NoopSemanticIndex, SemanticIndex};
use pagectx::state::Settings;
use pagectx::store::Db;
use pagectx::{logging, runtime};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pagectx")]
#[command(about = "Build searchable context documents for Facebook pages", long_about = None)]
struct Cli {
    /// Database file (defaults to the configured or XDG data location)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Semantic index endpoint, overriding settings
    #[arg(long, global = true)]
    index_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store or replace the user's primary access token
    Login {
        username: String,
        #[arg(long)]
        token: String,
    },
    /// List the pages the user manages and remember their page tokens
    Resources { username: String },
    /// Build and inspect page contexts
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },
    /// Publish a post to a page the user manages
    Post {
        username: String,
        resource_id: String,
        message: String,
        /// Link to share with the post
        #[arg(long)]
        link: Option<String>,
    },
    /// Forget the user's session and page tokens
    Logout { username: String },
}

#[derive(Subcommand)]
enum ContextAction {
    /// Fetch a page's profile and recent posts and save the context
    Create {
        username: String,
        resource_id: String,
        /// Page name to use when Graph reports none
        #[arg(long)]
        name: Option<String>,
        /// Number of recent posts to include
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a saved context by id
    Show { id: String },
    /// Print every context the user has built
    List { username: String },
}

fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let mut settings = Settings::load();
    if let Some(path) = cli.database {
        settings.database_path = Some(path);
    }
    if let Some(url) = cli.index_url {
        settings.index_url = Some(url);
    }
    let service = build_service(&settings)?;

    match cli.command {
        Commands::Login { username, token } => {
            print_json(&service.create_session(&username, &token)?)?;
        }
        Commands::Resources { username } => {
            let resources = runtime::block_on(service.list_delegated_resources(&username))?;
            print_json(&resources)?;
        }
        Commands::Context { action } => match action {
            ContextAction::Create {
                username,
                resource_id,
                name,
                limit,
            } => {
                let request = CreateContextRequest {
                    username,
                    resource_id,
                    resource_name: name,
                    post_limit: limit,
                };
                print_json(&runtime::block_on(service.create_context(request))?)?;
            }
            ContextAction::Show { id } => {
                let record = service
                    .get_context(&id)?
                    .with_context(|| format!("no context with id {id}"))?;
                print_json(&record)?;
            }
            ContextAction::List { username } => {
                print_json(&service.contexts_for_user(&username)?)?;
            }
        },
        Commands::Post {
            username,
            resource_id,
            message,
            link,
        } => {
            let request = PublishRequest {
                username,
                resource_id,
                message,
                link,
            };
            print_json(&runtime::block_on(service.publish_post(request))?)?;
        }
        Commands::Logout { username } => {
            if !service.delete_session(&username)? {
                tracing::warn!(username, "no session to remove");
            }
        }
    }

    Ok(())
}

fn build_service(settings: &Settings) -> Result<ContextService> {
    let db = match &settings.database_path {
        Some(path) => Db::open(path),
        None => Db::open_default(),
    }
    .context("failed to open database")?;

    let graph = GraphClient::new(
        Arc::new(ReqwestTransport::new()?),
        &settings.graph_url,
        &settings.graph_version,
    )?;

    let index: Arc<dyn SemanticIndex> = match &settings.index_url {
        Some(url) => Arc::new(HttpSemanticIndex::new(url)?),
        None => Arc::new(NoopSemanticIndex),
    };

    let default_limit = NonZeroUsize::new(settings.default_post_limit)
        .context("default_post_limit in settings must be positive")?;

    Ok(ContextService::new(db, graph, index)
        .with_default_post_limit(default_limit)
        .with_malformed_post_policy(settings.malformed_posts)
        .with_session_ttl(settings.session_ttl()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
