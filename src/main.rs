use std::{
    process,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use freshstack::{
    cache::{DataMeta, FreshnessCache},
    config::{self, FetchArgs, InspectArgs, Settings},
    error::AppError,
    infra::{
        console::ConsoleWindows, file_store::FileStore, http_client::HttpTransport, telemetry,
    },
    notify::{NotificationFeed, PopupStack},
    transport::ApiClient,
};
use futures::future::join_all;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Fetch(args) => run_fetch(&settings, args).await,
        config::Command::Prefetch => run_prefetch(&settings).await,
        config::Command::Inspect(args) => run_inspect(&settings, &args),
        config::Command::Sweep => run_sweep(&settings),
        config::Command::Clear => run_clear(&settings),
        config::Command::Watch => run_watch(settings).await,
    }
}

fn open_cache(settings: &Settings) -> Result<FreshnessCache<FileStore>, AppError> {
    let store = FileStore::open(&settings.store.directory, settings.store.quota_bytes)?;
    Ok(FreshnessCache::new(store, settings.cache.clone())?)
}

fn http_transport(settings: &Settings) -> Result<Arc<HttpTransport>, AppError> {
    let base_url = settings.api.base_url.clone().ok_or_else(|| {
        AppError::validation(
            "api base URL is required (use --api-base-url or FRESHSTACK__API__BASE_URL)",
        )
    })?;
    Ok(Arc::new(HttpTransport::new(base_url, settings.api.timeout)?))
}

fn api_client(settings: &Settings) -> Result<ApiClient<FileStore, HttpTransport>, AppError> {
    Ok(ApiClient::new(
        open_cache(settings)?,
        http_transport(settings)?,
        settings.api.action_path.clone(),
    ))
}

fn print_json(value: &Value) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");
    Ok(())
}

fn describe_delivery(meta: DataMeta) -> Value {
    json!({
        "from_cache": meta.from_cache,
        "is_fresh": meta.is_fresh,
        "is_stale": meta.is_stale,
        "rate_limited": meta.rate_limited,
    })
}

async fn run_fetch(settings: &Settings, args: FetchArgs) -> Result<(), AppError> {
    let client = api_client(settings)?;
    let params: Vec<(&str, String)> = args
        .params
        .iter()
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();

    let delivered = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&delivered);
    let on_data = move |value: &Value, meta: DataMeta| {
        seen.store(true, Ordering::SeqCst);
        let delivery = json!({"meta": describe_delivery(meta), "data": value});
        if let Err(err) = print_json(&delivery) {
            warn!(error = %err, "Failed to print delivery");
        }
    };

    let result = client
        .fetch_action(&args.action, &params, on_data, |_| {})
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(error) if delivered.load(Ordering::SeqCst) => {
            warn!(error = %error, "Refresh failed; showing cached data");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

async fn run_prefetch(settings: &Settings) -> Result<(), AppError> {
    let client = api_client(settings)?;
    let today = OffsetDateTime::now_utc().date();

    let outcomes = join_all(client.prefetch_common_ranges(today)).await;
    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    info!(
        ranges = outcomes.len(),
        failed,
        "Prefetched common dashboard ranges"
    );
    Ok(())
}

fn run_inspect(settings: &Settings, args: &InspectArgs) -> Result<(), AppError> {
    let cache = open_cache(settings)?;
    let keys = match args.key.as_ref() {
        Some(key) => vec![key.clone()],
        None => cache.keys(),
    };

    let entries: Vec<Value> = keys
        .iter()
        .filter_map(|key| cache.get(key))
        .map(|entry| {
            json!({
                "key": entry.key,
                "stored_at": entry.stored_at.unix_timestamp(),
                "is_fresh": entry.is_fresh,
                "is_stale": entry.is_stale,
                "value": entry.value,
            })
        })
        .collect();

    if args.key.is_some() && entries.is_empty() {
        return Err(AppError::validation("no usable cache entry for that key"));
    }
    print_json(&Value::Array(entries))
}

fn run_sweep(settings: &Settings) -> Result<(), AppError> {
    let removed = open_cache(settings)?.sweep();
    print_json(&json!({"removed": removed}))
}

fn run_clear(settings: &Settings) -> Result<(), AppError> {
    open_cache(settings)?.clear();
    Ok(())
}

async fn run_watch(settings: Settings) -> Result<(), AppError> {
    let transport = http_transport(&settings)?;
    let (stack, mut events) = PopupStack::new(ConsoleWindows::default(), settings.popups.clone());
    let feed = Arc::new(NotificationFeed::new(
        transport,
        stack.clone(),
        settings.feed.clone(),
    ));

    let poller = {
        let feed = Arc::clone(&feed);
        tokio::spawn(async move { feed.run().await })
    };
    let receipts = {
        let feed = Arc::clone(&feed);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                info!(id = event.id(), event = ?event, "Popup event");
                feed.handle_event(&event).await;
            }
        })
    };

    let result = tokio::signal::ctrl_c()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to listen for shutdown: {err}")));

    poller.abort();
    let _ = poller.await;
    stack.shutdown();
    receipts.abort();
    let _ = receipts.await;

    result
}
