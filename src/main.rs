use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gym_locator::geo::{Coordinate, DistanceUnit};
use gym_locator::gym::{self, Gym, NewGym, DEFAULT_CENTER};
use gym_locator::places::{GeocodeCache, GymFinder, MapsClient, PlacesError, SearchOptions};
use gym_locator::ranking::rank_optional;
use gym_locator::server;
use serde::Serialize;
use std::path::PathBuf;

/// gymloc: find gyms near you.
///
/// Computes great-circle distances, ranks a gym directory by proximity,
/// and discovers gyms through the Google Maps Places API.
///
/// Examples:
///   gymloc distance 37.7749,-122.4194 34.0522,-118.2437 --unit imperial
///   gymloc rank --directory gyms.json --origin 37.7749,-122.4194 --query iron
///   gymloc search "Toronto downtown" --radius 3000
///   gymloc geocode "1 Market St, San Francisco"
///   gymloc serve --directory gyms.json --port 8080
#[derive(Parser)]
#[command(name = "gymloc", version, about, long_about = None)]
struct Cli {
    /// Google Maps API key (Geocoding + Places).
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Offline mode: only use the geocode cache.
    #[arg(long, global = true)]
    offline: bool,

    /// Geocode cache file. Defaults to ~/.gymloc/geocode.json.
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Distance between two "lat,lng" points.
    Distance {
        #[arg(allow_hyphen_values = true)]
        from: Coordinate,
        #[arg(allow_hyphen_values = true)]
        to: Coordinate,
        /// "metric" or "imperial".
        #[arg(long, default_value = "metric")]
        unit: DistanceUnit,
    },
    /// Rank a gym directory (JSON array) around an origin.
    Rank {
        #[arg(long)]
        directory: PathBuf,
        /// Origin as "lat,lng". Without it the directory order is kept.
        #[arg(long, allow_hyphen_values = true)]
        origin: Option<Coordinate>,
        /// Filter by name, address or city.
        #[arg(long, short = 'q')]
        query: Option<String>,
        #[arg(long, default_value = "metric")]
        unit: DistanceUnit,
    },
    /// Geocode one or more addresses.
    Geocode {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Reverse-geocode a "lat,lng" point.
    Reverse {
        #[arg(allow_hyphen_values = true)]
        point: Coordinate,
    },
    /// Full Places record for a place id.
    Details { place_id: String },
    /// Search gyms in an area via the Places API.
    Search {
        area: String,
        /// Search radius in meters (max 50000 for nearby search).
        #[arg(long, default_value_t = gym_locator::places::finder::DEFAULT_RADIUS_M)]
        radius: u32,
        /// Rank the results around this "lat,lng" point.
        #[arg(long, allow_hyphen_values = true)]
        near: Option<Coordinate>,
    },
    /// Serve the HTTP JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Gym directory served by /api/gyms.
        #[arg(long)]
        directory: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct DistanceOutput {
    from: Coordinate,
    to: Coordinate,
    kilometers: f64,
    miles: f64,
    formatted: String,
}

#[derive(Serialize)]
struct RankedGym<T> {
    #[serde(flatten)]
    gym: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<String>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Distance { from, to, unit } => {
            let d = from.distance_to(&to);
            eprintln!("  {} \u{2192} {}: {}", from, to, d.format(unit));
            print_json(&DistanceOutput {
                from,
                to,
                kilometers: d.kilometers(),
                miles: d.miles(),
                formatted: d.format(unit),
            })
        }
        Command::Rank {
            ref directory,
            origin,
            ref query,
            unit,
        } => {
            let gyms = gym::load_directory(directory)?;
            let matching = gym::filter(gyms, query.as_deref().unwrap_or("").trim());
            if origin.is_none() {
                eprintln!("  No origin given; keeping directory order.");
            }
            print_json(&ranked_output::<Gym>(origin, matching, unit))
        }
        Command::Geocode { ref addresses } => {
            if let [address] = addresses.as_slice() {
                let mut finder = build_finder(&cli)?;
                let result = finder.geocode(address)?;
                eprintln!(
                    "  \u{1F4CD} {}",
                    result.formatted_address.as_deref().unwrap_or(address)
                );
                print_json(&result)
            } else {
                let client = online_client(&cli, "batch geocoding")?;
                print_json(&client.geocode_addresses(addresses))
            }
        }
        Command::Reverse { point } => {
            let client = online_client(&cli, &point.to_string())?;
            let address = client.reverse_geocode(point)?;
            print_json(&address)
        }
        Command::Details { ref place_id } => {
            let client = online_client(&cli, place_id)?;
            let place = client.place_details(place_id)?;
            eprintln!("  \u{1F3CB}\u{FE0F}  {}, {}", place.name, place.address());
            print_json(&place)
        }
        Command::Search {
            ref area,
            radius,
            near,
        } => {
            let mut finder = build_finder(&cli)?;
            let found = finder.search_area(area, &SearchOptions { radius_m: radius })?;
            let origin = near.or_else(|| found.center.as_ref().map(|c| c.coordinate()));
            eprintln!("  Found {} gyms in '{}'", found.places.len(), area);
            let drafts: Vec<NewGym> = found.places.iter().map(NewGym::from_place).collect();
            print_json(&ranked_output(origin, drafts, DistanceUnit::Metric))
        }
        Command::Serve {
            ref host,
            port,
            ref directory,
        } => {
            let gyms = match directory {
                Some(path) => gym::load_directory(path)?,
                None => Vec::new(),
            };
            let finder = build_finder(&cli)?;
            log::info!(
                "serving {} gyms (default center {})",
                gyms.len(),
                DEFAULT_CENTER
            );
            let app = server::build_router(gyms, finder);
            let rt = tokio::runtime::Runtime::new().context("cannot start tokio runtime")?;
            rt.block_on(server::start(host, port, app))
                .with_context(|| format!("server on {}:{} failed", host, port))
        }
    }
}

/// A client for lookups that have no cached answer.
fn online_client(cli: &Cli, what: &str) -> anyhow::Result<MapsClient> {
    if cli.offline {
        bail!(PlacesError::Offline(what.to_string()));
    }
    Ok(MapsClient::new(cli.api_key.clone().unwrap_or_default())?)
}

fn build_finder(cli: &Cli) -> anyhow::Result<GymFinder<MapsClient>> {
    let mut cache = match &cli.cache {
        Some(path) => GeocodeCache::load_from(path.clone()),
        None => GeocodeCache::load(),
    };
    let pruned = cache.prune();
    if pruned > 0 {
        log::debug!("pruned {} expired geocodes", pruned);
    }
    let client = match cli.api_key.as_deref() {
        Some(key) => Some(MapsClient::new(key)?),
        None => {
            log::warn!("no Google Maps API key; only cached geocodes are available");
            None
        }
    };
    let mut finder = GymFinder::new(client, cache);
    finder.set_offline(cli.offline);
    Ok(finder)
}

fn ranked_output<T>(
    origin: Option<Coordinate>,
    entities: Vec<T>,
    unit: DistanceUnit,
) -> Vec<RankedGym<T>>
where
    T: gym_locator::ranking::Locatable,
{
    rank_optional(origin, entities)
        .into_iter()
        .map(|r| RankedGym {
            distance: r.distance.filter(|d| d.is_finite()).map(|d| d.format(unit)),
            gym: r.entity,
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
