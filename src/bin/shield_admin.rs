use anyhow::Result;
use clap::{Parser, Subcommand};
use log::error;
use smart_shield::admin::{
    AdminMap, BroadcastRequest, CenterResolver, FixedPosition, SearchMode, SearchState,
};
use smart_shield::client::ApiClient;
use smart_shield::config;
use smart_shield::db::models::RegistrationFilter;
use smart_shield::geo::{Distance, LatLng};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Admin map client for the SmartShield registry
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Base URL of the registry API
    #[arg(long, env = "SMART_SHIELD_API", default_value = "http://localhost:5000")]
    api_url: String,

    /// Configuration file supplying map defaults
    #[arg(long, env = "SMART_SHIELD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registrations
    List {
        #[arg(long)]
        pincode: Option<String>,
        #[arg(long)]
        locality: Option<String>,
    },
    /// Search the admin map and show cameras around the result
    Search {
        #[command(subcommand)]
        by: SearchBy,
        /// Search radius in kilometers
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Show the unfiltered map at its default view
    Reset,
    /// Message the owner of one camera
    Message {
        #[arg(long)]
        camera_id: Uuid,
        #[arg(long)]
        text: String,
    },
    /// Message every owner within a radius
    Broadcast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Radius in meters (100 to 5000)
        #[arg(long, default_value_t = 500.0)]
        radius_m: f64,
        #[arg(long)]
        text: String,
        /// Restrict to these cameras
        #[arg(long = "camera-id")]
        camera_ids: Vec<Uuid>,
    },
}

#[derive(Subcommand, Debug)]
enum SearchBy {
    Address { query: String },
    Pincode { pincode: String },
    /// Around a known position
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
}

fn print_summary(map: &AdminMap) {
    let view = map.view();
    let stats = map.stats();
    println!(
        "View {} zoom {} | {} of {} cameras ({}%)",
        view.center, view.zoom, stats.filtered, stats.total, stats.coverage
    );
}

async fn search(
    client: ApiClient,
    map_config: config::MapConfig,
    by: SearchBy,
    radius_km: Option<f64>,
) -> Result<()> {
    let (mode, position) = match by {
        SearchBy::Address { query } => (SearchMode::Address(query), None),
        SearchBy::Pincode { pincode } => (SearchMode::Pincode(pincode), None),
        SearchBy::Nearby { lat, lng } => (SearchMode::Nearby, Some(LatLng::new(lat, lng)?)),
    };

    let mut map = AdminMap::new(map_config);
    if let Some(km) = radius_km {
        map.set_radius(Distance::km(km));
    }
    map.replace_cameras(client.admin_cameras(None).await?);

    let resolver = CenterResolver::new(Arc::new(client), Arc::new(FixedPosition(position)));
    match map.search(&resolver, mode).await? {
        SearchState::Results { center, radius, .. } => {
            println!("Center {} (radius {})", center, radius);
        }
        SearchState::Error(message) => {
            println!("{}", message);
            return Ok(());
        }
        other => println!("{:?}", other),
    }

    print_summary(&map);
    for ranked in map.visible_ranked() {
        println!(
            "{}  {:<28} {:>9}  {}",
            ranked.item.id, ranked.item.name, ranked.distance.to_string(), ranked.item.location
        );
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = config::load_config(args.config.as_deref())?;
    let client = ApiClient::new(&args.api_url)?;

    match args.command {
        Command::List { pincode, locality } => {
            let users = client
                .list_users(&RegistrationFilter { pincode, locality })
                .await?;
            for user in &users {
                println!(
                    "{}  {:<28} {:<14} {:<12} {}",
                    user.id,
                    user.name,
                    user.phone,
                    user.camera_type.label(),
                    user.location_label()
                );
            }
            println!("{} registrations", users.len());
        }
        Command::Search { by, radius_km } => {
            search(client, config.map, by, radius_km).await?;
        }
        Command::Reset => {
            let mut map = AdminMap::new(config.map);
            map.replace_cameras(client.admin_cameras(None).await?);
            map.reset();
            print_summary(&map);
            for camera in map.visible() {
                println!("{}  {:<28} {}", camera.id, camera.name, camera.location);
            }
        }
        Command::Message { camera_id, text } => {
            let delivery = client.message_single(camera_id, &text).await?;
            println!("Message queued for {} owner", delivery.recipients);
        }
        Command::Broadcast {
            lat,
            lng,
            radius_m,
            text,
            camera_ids,
        } => {
            let request = BroadcastRequest {
                center: LatLng::new(lat, lng)?,
                radius: radius_m,
                message: text,
                camera_ids: (!camera_ids.is_empty()).then_some(camera_ids),
            };
            let delivery = client.message_broadcast(&request).await?;
            println!("Broadcast queued for {} owners", delivery.recipients);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Args::parse()).await {
        error!("{:#}", e);
        eprintln!("Error: {}", smart_shield::Error::from_anyhow(e).user_message());
        std::process::exit(1);
    }
}
