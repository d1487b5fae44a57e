use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod eid;
mod news;
mod providers;
mod sanitize;
mod search;
mod semantic;
mod store;
#[cfg(test)]
mod tests;
mod web;

use config::Config;
use news::NewsAggregator;
use providers::{OpenAiEmbeddings, OpenAiNewsSearch};
use search::{EntitySearchRequest, SearchService};
use semantic::{EmbeddingClient, RankOptions};
use store::BackendCsv;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wire providers and the CSV store from config.
fn build_service(config: &Config) -> anyhow::Result<SearchService> {
    let embeddings = OpenAiEmbeddings::new(
        &config.embeddings.base_url,
        &config.embeddings.model,
        config.embeddings.api_key.clone(),
        Duration::from_secs(config.embeddings.timeout_secs),
    )?;
    let news = OpenAiNewsSearch::new(
        &config.news.base_url,
        &config.news.model,
        config.news.api_key.clone(),
        Duration::from_secs(config.news.timeout_secs),
    )?;

    let embeddings = EmbeddingClient::new(Box::new(embeddings));
    let news = NewsAggregator::new(Box::new(news));
    if !embeddings.is_configured() {
        log::warn!("no embeddings api key configured, entity search is unavailable");
    }
    if !news.is_configured() {
        log::warn!("no news api key configured, news search is unavailable");
    }

    let store = Arc::new(BackendCsv::load(config.base_path())?);

    Ok(SearchService::new(
        embeddings,
        news,
        store,
        RankOptions {
            threshold: config.search.default_threshold,
            limit: config.search.default_limit,
        },
    ))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let user_id = args.user_id();

    let config = Config::load()?;
    let service = build_service(&config)?;

    match args.command {
        cli::Command::Daemon { listen } => {
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            web::start_daemon(service, &listen)?;
        }

        cli::Command::News { query } => {
            print_json(&service.search_news(&user_id, &query)?)?;
        }

        cli::Command::Search {
            kind,
            query,
            limit,
            threshold,
        } => {
            let req = EntitySearchRequest {
                kind,
                query,
                limit,
                threshold,
            };
            print_json(&service.search_entities(&user_id, req)?)?;
        }

        cli::Command::AddPost { author, content, id } => {
            print_json(&service.save_post(&author, &content, id)?)?;
        }

        cli::Command::AddUser {
            username,
            email,
            id,
        } => {
            print_json(&service.save_user(&username, &email, id)?)?;
        }

        cli::Command::History { limit } => {
            print_json(&service.history(&user_id, limit)?)?;
        }

        cli::Command::Compare { a, b } => {
            let similarity = service.compare_texts(&a, &b)?;
            print_json(&serde_json::json!({ "similarity": similarity }))?;
        }
    };

    Ok(())
}
