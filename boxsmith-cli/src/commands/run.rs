use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use boxsmith_core::{
    ArtworkSource, CacheStore, CatalogMode, CollectionProvider, ForwardMode, LibraryService,
    MemoryCache, RequestService, RunConfig,
};
use boxsmith_jellyfin::JellyfinClient;
use boxsmith_lib::{EventSink, Reconciler, RunError, RunReport, drive_with_events};
use boxsmith_seerr::SeerrClient;
use boxsmith_tmdb::{
    CatalogProvider, JsonFileCache, LookupClient, SnapshotProvider, TmdbClient, default_cache_path,
};

use crate::cli_types::RunArgs;
use crate::config::{self, ConfigFile, Settings};
use crate::error::CliError;
use crate::progress::{RunProgress, spinner};

use super::summary;

type Provider = CatalogProvider<Arc<dyn CacheStore>>;

/// Run the reconcile command.
pub(crate) fn run_reconcile(
    args: RunArgs,
    config_file: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let file = config::load_config_file(config_file.as_deref())?;
    let run_config = config::run_config(&args, file.as_ref())?;
    let settings = Settings::resolve(&args, file.as_ref(), |k| std::env::var(k).ok());
    settings.validate(&run_config)?;

    let rt = tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))?;
    let report = rt.block_on(execute(&args, file.as_ref(), &settings, &run_config, quiet))?;

    summary::print_report(&report);

    if !args.no_log {
        let path = boxsmith_lib::log_file_path(&config::log_dir(&args, file.as_ref()));
        match boxsmith_lib::write_audit_log(&report, &path) {
            Ok(()) => log::info!("  Run log written to {}", path.display()),
            Err(e) => log::warn!("Warning: could not write run log: {}", e),
        }
    }
    Ok(())
}

async fn execute(
    args: &RunArgs,
    file: Option<&ConfigFile>,
    settings: &Settings,
    run_config: &RunConfig,
    quiet: bool,
) -> Result<RunReport, CliError> {
    log::info!(
        "{} ({} catalog{})",
        if run_config.dry_run {
            "Dry run, no changes will be made"
        } else {
            "Applying changes to Jellyfin"
        }
        .if_supports_color(Stdout, |t| t.bold()),
        run_config.catalog,
        match run_config.forward {
            ForwardMode::Disabled => String::new(),
            mode => format!(", forwarding: {}", mode),
        },
    );
    log::info!("");

    let cache = open_cache(args)?;
    let library = connect_jellyfin(settings, quiet).await?;
    let provider = build_provider(args, file, settings, run_config, &cache, quiet).await?;
    let requests = match run_config.forward {
        ForwardMode::Disabled => None,
        _ => Some(connect_jellyseerr(settings)?),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing the current stage...");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let (sink, rx) = EventSink::channel();
    let reconciler = Reconciler::new(run_config, &library, &provider, &*cache)
        .with_artwork(&provider)
        .with_cancel_flag(cancel)
        .with_events(sink);

    let progress = RunProgress::new(quiet);
    let result = match &requests {
        Some(seerr) => drive(reconciler.with_requests(seerr), rx, &progress).await,
        None => drive(reconciler, rx, &progress).await,
    };
    progress.finish();
    Ok(result?)
}

async fn drive<L, P, A, R>(
    reconciler: Reconciler<'_, L, P, A, R>,
    rx: tokio::sync::mpsc::UnboundedReceiver<boxsmith_lib::RunEvent>,
    progress: &RunProgress,
) -> Result<RunReport, RunError>
where
    L: LibraryService,
    P: CollectionProvider,
    A: ArtworkSource,
    R: RequestService,
{
    let run = async move { reconciler.run().await };
    drive_with_events(run, rx, |event| progress.handle(event)).await
}

fn open_cache(args: &RunArgs) -> Result<Arc<dyn CacheStore>, CliError> {
    if args.no_cache {
        log::debug!("Using an in-memory cache for this run");
        return Ok(Arc::new(MemoryCache::new()));
    }
    let path = match &args.cache.cache_file {
        Some(p) => p.clone(),
        None => default_cache_path().map_err(|e| CliError::cache(e.to_string()))?,
    };
    Ok(Arc::new(JsonFileCache::open(path)))
}

async fn connect_jellyfin(settings: &Settings, quiet: bool) -> Result<JellyfinClient, CliError> {
    let url = settings.jellyfin_url.get().unwrap_or_default();
    let key = settings.jellyfin_api_key.get().unwrap_or_default();
    let user = settings.jellyfin_user_id.get().map(str::to_string);

    let pb = spinner(quiet, "Connecting to Jellyfin...");
    let result = JellyfinClient::connect(url, key, user).await;
    pb.finish_and_clear();

    let client =
        result.map_err(|e| CliError::service(format!("Failed to connect to Jellyfin: {e}")))?;
    log::info!(
        "{} Connected to Jellyfin at {} (user {})",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        url,
        client.user_id(),
    );
    Ok(client)
}

async fn build_provider(
    args: &RunArgs,
    file: Option<&ConfigFile>,
    settings: &Settings,
    run_config: &RunConfig,
    cache: &Arc<dyn CacheStore>,
    quiet: bool,
) -> Result<Provider, CliError> {
    match run_config.catalog {
        CatalogMode::Snapshot => {
            let dir = config::snapshot_dir(args, file);
            let snapshot = SnapshotProvider::load(&dir)
                .map_err(|e| RunError::snapshot(format!("{}: {}", dir.display(), e)))?;
            log::info!(
                "{} Loaded snapshot from {} ({} collections, {} movies)",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                dir.display(),
                snapshot.collection_count(),
                snapshot.movie_count(),
            );
            Ok(CatalogProvider::Snapshot(snapshot))
        }
        CatalogMode::Live => {
            let key = settings.tmdb_api_key.get().unwrap_or_default();
            let mut client =
                TmdbClient::new(key).map_err(|e| CliError::service(format!("TMDb: {e}")))?;
            if let Some(language) = config::tmdb_language(file) {
                client = client.with_language(language);
            }

            let pb = spinner(quiet, "Checking TMDb API key...");
            let validated = client.validate().await;
            pb.finish_and_clear();
            validated.map_err(|e| CliError::service(format!("TMDb check failed: {e}")))?;
            log::info!(
                "{} Connected to TMDb",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            );

            let lookup =
                LookupClient::new(client, cache.clone()).with_retry_policy(run_config.retry.clone());
            Ok(CatalogProvider::Live(lookup))
        }
    }
}

fn connect_jellyseerr(settings: &Settings) -> Result<SeerrClient, CliError> {
    let url = settings.jellyseerr_url.get().unwrap_or_default();
    let key = settings.jellyseerr_api_key.get().unwrap_or_default();
    SeerrClient::new(url, key).map_err(|e| CliError::service(format!("Jellyseerr: {e}")))
}
