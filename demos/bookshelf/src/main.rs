//! Bookshelf example binary
//!
//! Builds the bookshelf store from environment configuration, runs a few
//! fetches and counter steps, and prints JSON snapshots along the way.

use anyhow::Context;
use bookshelf::config::Config;
use bookshelf::library::Library;
use bookshelf::{
    AppAction, AppEnvironment, AppReducer, AppState, Book, CounterAction, CounterEnvironment,
    app_reducer, selectors,
};
use slicekit_core::environment::{RequestIds, UuidRequestIds};
use slicekit_core::slice::{EntityAction, SliceEnvironment};
use slicekit_runtime::{LoggingMiddleware, Store, dispatch_fetch};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

const WAIT: Duration = Duration::from_secs(10);

fn build_store(config: &Config, library: Library) -> AppStore {
    let mut books = SliceEnvironment::with_source(Arc::new(library));
    if let Some(timeout) = config.fetch_timeout() {
        books = books.with_fetch_timeout(timeout);
    }
    let env = AppEnvironment {
        books,
        counter: CounterEnvironment::new(config.source_delay()),
        ..AppEnvironment::default()
    };

    Store::with_config(AppState::default(), app_reducer(), env, config.store_config())
        .with_middleware(LoggingMiddleware::new("bookshelf"))
}

async fn print_snapshot(label: &str, store: &AppStore) -> anyhow::Result<()> {
    let snapshot = store.snapshot().await;
    let json = serde_json::to_string_pretty(&*snapshot).context("serializing snapshot")?;
    println!("\n--- {label} ---\n{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate().context("invalid configuration")?;
    tracing::info!(config = ?config, "Starting bookshelf");

    println!("=== Bookshelf Example: Slicekit ===");

    let ids = UuidRequestIds;
    let store = build_store(&config, Library::sample().with_delay(config.source_delay()));

    // Local edits
    store
        .send(AppAction::Books(EntityAction::Add(Book::new(3, "Parable of the Sower"))))
        .await?;
    store.send(AppAction::Books(EntityAction::Remove(99))).await?;
    print_snapshot("after local edits", &store).await?;

    // Two overlapping fetches: the second finds the first pending
    let (first, second) = tokio::join!(
        dispatch_fetch(&store, ids.next_id(), WAIT),
        dispatch_fetch(&store, ids.next_id(), WAIT),
    );
    println!("\nfirst fetch:  {:?}", first?);
    println!("second fetch: {:?}", second?);
    print_snapshot("after fetch", &store).await?;

    let books = selectors::ShelfSelectors::new();
    let titles: Vec<String> = store
        .state(|state| books.all_books(state).iter().map(|b| b.title.clone()).collect())
        .await;
    println!("\ntitles: {titles:?}");

    // Thunk-style counter steps
    let done = |action: &AppAction| {
        matches!(
            action,
            AppAction::Counter(
                CounterAction::IncrementFulfilled(_)
                    | CounterAction::DecrementFulfilled(_)
                    | CounterAction::Rejected(_)
            )
        )
    };
    for step in [
        CounterAction::IncrementRequested(None),
        CounterAction::IncrementRequested(Some(2)),
        CounterAction::DecrementRequested(Some(2)),
    ] {
        store
            .send_and_wait_for(AppAction::Counter(step), done, WAIT)
            .await?;
    }
    let counter = store.state(|state| Arc::clone(&state.counter)).await;
    println!("\ncounter: {} ({:?})", counter.value, counter.status);

    store
        .shutdown_with_default_timeout()
        .await
        .context("shutting down store")?;

    // A source that always fails
    let failing = build_store(&config, Library::sample().failing("Uh oh"));
    let outcome = dispatch_fetch(&failing, ids.next_id(), WAIT).await?;
    println!("\nfailing fetch: {outcome:?}");
    let error = failing
        .state(|state| selectors::books_error(state).map(str::to_string))
        .await;
    println!("recorded error: {error:?}");
    failing.shutdown_with_default_timeout().await?;

    println!("\n=== Done ===");
    Ok(())
}
