use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use clap::Parser;
use serde_json::json;

use mvi_paging::config::{Config, DemoConfig};
use mvi_paging::logging::init_tracing;
use mvi_paging::paging::{
    ConcatPagingContainer, PageSource, PagingContainer, PagingState, PagingStateKind, RequestType,
};

/// Drive a concatenated in-memory feed to its end, printing every state.
#[derive(Debug, Parser)]
#[command(name = "mvi-paging-demo", version)]
struct Cli {
    /// Config file (defaults to the per-user config path).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of concatenated sources.
    #[arg(long)]
    sources: Option<usize>,
    /// Pages served by each source.
    #[arg(long)]
    pages: Option<usize>,
    /// Items per page.
    #[arg(long)]
    page_size: Option<usize>,
    /// Simulated fetch latency in milliseconds.
    #[arg(long)]
    latency_ms: Option<u64>,
    /// Fail the first fetch of this page (1-based) of the first source.
    #[arg(long)]
    fail_page: Option<usize>,
    /// Print one JSON object per state instead of text.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, demo: &mut DemoConfig) {
        if let Some(sources) = self.sources {
            demo.sources = sources;
        }
        if let Some(pages) = self.pages {
            demo.pages_per_source = pages;
        }
        if let Some(page_size) = self.page_size {
            demo.page_size = page_size;
        }
        if let Some(latency_ms) = self.latency_ms {
            demo.latency_ms = latency_ms;
        }
        if self.fail_page.is_some() {
            demo.fail_page = self.fail_page;
        }
    }
}

/// Numbered pages of strings served from memory.
struct DemoSource {
    label: String,
    pages: usize,
    page_size: usize,
    latency: Duration,
    fail_page: Option<usize>,
    failed: AtomicBool,
    loaded_pages: AtomicUsize,
}

impl DemoSource {
    fn new(label: String, demo: &DemoConfig, fail_page: Option<usize>) -> Self {
        Self {
            label,
            pages: demo.pages_per_source,
            page_size: demo.page_size,
            latency: Duration::from_millis(demo.latency_ms),
            fail_page,
            failed: AtomicBool::new(false),
            loaded_pages: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageSource for DemoSource {
    type Item = String;
    type Request = usize;
    type Page = Vec<String>;

    async fn get_request(&self, request_type: RequestType) -> anyhow::Result<usize> {
        Ok(match request_type {
            RequestType::Refresh => 1,
            RequestType::NextPage => self.loaded_pages.load(Ordering::SeqCst) + 1,
        })
    }

    async fn get_items(&self, page: &usize) -> anyhow::Result<Vec<String>> {
        tokio::time::sleep(self.latency).await;
        if self.fail_page == Some(*page) && !self.failed.swap(true, Ordering::SeqCst) {
            return Err(anyhow!("{}: page {} unavailable", self.label, page));
        }
        if *page > self.pages {
            return Ok(Vec::new());
        }
        let first = (page - 1) * self.page_size;
        Ok((first..first + self.page_size)
            .map(|n| format!("{} #{}", self.label, n + 1))
            .collect())
    }

    async fn page_to_items(&self, page: &usize, items: &Vec<String>) -> anyhow::Result<Vec<String>> {
        self.loaded_pages.store(*page, Ordering::SeqCst);
        Ok(items.clone())
    }

    fn is_last_page(&self, page: &usize, _raw: &Vec<String>, items: &[String]) -> bool {
        items.is_empty() || *page >= self.pages
    }
}

fn build_feed(config: &Config) -> anyhow::Result<ConcatPagingContainer<String>> {
    let mut builder = ConcatPagingContainer::builder().config(config.container.named("feed"));
    for index in 0..config.demo.sources {
        let label = format!("source-{}", index + 1);
        // A failed refresh of a later child cannot be retried through the feed.
        let fail_page = config.demo.fail_page.filter(|_| index == 0);
        let pager = PagingContainer::with_config(
            DemoSource::new(label.clone(), &config.demo, fail_page),
            config.container.named(label),
            &tokio::runtime::Handle::current(),
        );
        builder = builder.child(pager, move |item: &String| format!("[{}] {}", index + 1, item));
    }
    builder.build().context("failed to assemble feed")
}

fn print_state(state: &PagingState<String>, as_json: bool) {
    let (page, error) = match state {
        PagingState::LoadedNextPage { page, .. } | PagingState::LoadedLastPage { page, .. } => {
            (Some(page.len()), None)
        }
        PagingState::Failed { cause, .. } | PagingState::FailedNextPage { cause, .. } => {
            (None, Some(cause.to_string()))
        }
        _ => (None, None),
    };

    if as_json {
        let line = json!({
            "state": state.kind().to_string(),
            "items": state.items().len(),
            "page": page,
            "error": error,
            "last_item": state.items().last(),
        });
        println!("{line}");
        return;
    }

    let mut line = format!("{:<16} items={}", state.kind().to_string(), state.items().len());
    if let Some(page) = page {
        line.push_str(&format!(" page={page}"));
    }
    if let Some(error) = error {
        line.push_str(&format!(" error=\"{error}\""));
    }
    println!("{line}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config.demo);
    config.validate()?;
    init_tracing(&config.logging)?;

    let feed = build_feed(&config)?;
    let mut states = feed.states();
    feed.refresh();

    while let Some(state) = states.recv().await {
        print_state(&state, cli.json);
        match state.kind() {
            PagingStateKind::Empty | PagingStateKind::LoadedLastPage => break,
            PagingStateKind::Failed => {
                feed.refresh();
            }
            PagingStateKind::Loaded
            | PagingStateKind::LoadedNextPage
            | PagingStateKind::FailedNextPage => {
                feed.load_next_page(false);
            }
            PagingStateKind::Idle
            | PagingStateKind::Refreshing
            | PagingStateKind::LoadingNextPage => {}
        }
    }

    feed.close();
    Ok(())
}
