use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tide_times::{
    AppConfig, GeocoderClient, Location, PreferenceStore, SystemClock, TideApiClient, TideEvent,
    TideKind, TidePhase, TideSession,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "tide-times")]
#[command(about = "Tide predictions for a searched or saved location")]
struct Args {
    /// Free-text place to look up (defaults to the saved location)
    query: Option<String>,

    /// Latitude in decimal degrees (skips the search; requires --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Display name to go with --lat/--lon
    #[arg(long)]
    name: Option<String>,

    /// Toggle favorite status for the resolved location
    #[arg(long)]
    favorite: bool,

    /// Print recent and favorite locations, then exit
    #[arg(long)]
    locations: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .parse_lossy("tide_times=info");

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    rt.block_on(run(args, config))
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let store = PreferenceStore::open(config.storage.resolved_data_dir());

    if args.locations {
        print_location_lists(&store);
        return Ok(());
    }

    let location = resolve_location(&args, &config, &store).await?;

    let client = TideApiClient::new(&config.api, &config.network)?;
    let session = TideSession::new(client, store, Arc::new(SystemClock));

    if args.favorite {
        let member = session.toggle_favorite(&location);
        if member {
            println!("Added {} to favorites.", location.name);
        } else {
            println!("Removed {} from favorites.", location.name);
        }
    }

    let mut updates = session.subscribe();
    session.select(location.clone());

    // Wait out Loading; watch may coalesce it away entirely.
    let phase = loop {
        updates
            .changed()
            .await
            .context("session state channel closed")?;
        let snapshot = updates.borrow().clone();
        match snapshot.phase {
            TidePhase::Idle | TidePhase::Loading => continue,
            terminal => break terminal,
        }
    };

    match phase {
        TidePhase::Loaded(events) if events.is_empty() => {
            println!("No tide events for {} in the next 24 hours.", location.name);
        }
        TidePhase::Loaded(events) => {
            println!("Tides for {}", location.name);
            print_series(&events);
        }
        TidePhase::Failed(err) => {
            if err.is_retryable() {
                eprintln!("{err}. Run the command again to retry.");
            } else {
                eprintln!("{err}.");
                eprintln!("Try searching for a location closer to the coast.");
                suggest_alternatives(&session.snapshot().recents, &location);
            }
            bail!("could not load tides for {}", location.name);
        }
        TidePhase::Idle | TidePhase::Loading => unreachable!("loop breaks on terminal phases"),
    }

    Ok(())
}

/// Pick the location to fetch for: explicit coordinates beat a search
/// query, which beats the persisted saved location.
async fn resolve_location(
    args: &Args,
    config: &AppConfig,
    store: &PreferenceStore,
) -> Result<Location> {
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let name = args
            .name
            .clone()
            .unwrap_or_else(|| format!("{lat:.4}, {lon:.4}"));
        return Ok(Location::from_coordinates(name, lat, lon));
    }

    if let Some(query) = &args.query {
        let geocoder = GeocoderClient::new(&config.geocoder, &config.network)?;
        let candidates = geocoder
            .search(query)
            .await
            .with_context(|| format!("search for {query:?} failed"))?;

        let Some(first) = candidates.first() else {
            bail!("no locations found for {query:?}");
        };
        if candidates.len() > 1 {
            tracing::info!(
                "{} candidates for {query:?}, using {}",
                candidates.len(),
                first.name
            );
        }
        return Ok(first.clone());
    }

    match store.saved() {
        Some(saved) => Ok(saved),
        None => bail!("no saved location yet; pass a place name to search for"),
    }
}

fn print_series(events: &[TideEvent]) {
    for event in events {
        let local = event.time.with_timezone(&chrono::Local);
        let label = match event.kind {
            TideKind::High => "High",
            TideKind::Low => "Low",
            TideKind::Current => "Now",
        };
        println!(
            "  {}  {:>6.2} m  {}",
            local.format("%a %H:%M"),
            event.height,
            label
        );
    }
}

fn print_location_lists(store: &PreferenceStore) {
    let recents = store.recents();
    let favorites = store.favorites();

    if recents.is_empty() && favorites.is_empty() {
        println!("No recent or favorite locations yet.");
        return;
    }

    if !recents.is_empty() {
        println!("Recent:");
        for location in &recents {
            println!("  {}", location.name);
        }
    }
    if !favorites.is_empty() {
        println!("Favorites:");
        for location in &favorites {
            println!("  {}", location.name);
        }
    }
}

fn suggest_alternatives(recents: &[Location], current: &Location) {
    let others: Vec<&Location> = recents.iter().filter(|r| r.id != current.id).collect();
    if !others.is_empty() {
        eprintln!("Previously used locations:");
        for location in others {
            eprintln!("  {}", location.name);
        }
    }
}
