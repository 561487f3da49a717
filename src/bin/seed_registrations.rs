use anyhow::Result;
use clap::Parser;
use log::{error, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use smart_shield::config;
use smart_shield::db;
use smart_shield::db::models::{CameraType, CoverageArea, NewRegistration};
use smart_shield::geo::LatLng;
use std::path::PathBuf;

/// Replace the registry contents with sample Jaipur registrations
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML or JSON)
    #[arg(long, env = "SMART_SHIELD_CONFIG")]
    config: Option<PathBuf>,

    /// Generated registrations on top of the named ones
    #[arg(long, default_value_t = 94)]
    generated: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Keep existing registrations instead of clearing them
    #[arg(long)]
    keep: bool,
}

struct Named {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    camera_type: CameraType,
    coverage_area: CoverageArea,
    lat: f64,
    lng: f64,
}

const NAMED: [Named; 6] = [
    Named { name: "Aarav Mehta", email: "aarav.mehta1@example.com", phone: "9000000001", camera_type: CameraType::Dome, coverage_area: CoverageArea::FrontGate, lat: 26.9124, lng: 75.7873 },
    Named { name: "Priya Sharma", email: "priya.sharma2@example.com", phone: "9000000002", camera_type: CameraType::Bullet, coverage_area: CoverageArea::Parking, lat: 26.9230, lng: 75.7960 },
    Named { name: "Rohan Singh", email: "rohan.singh3@example.com", phone: "9000000003", camera_type: CameraType::Ptz, coverage_area: CoverageArea::StreetFacing, lat: 26.9100, lng: 75.8095 },
    Named { name: "Sneha Gupta", email: "sneha.gupta4@example.com", phone: "9000000004", camera_type: CameraType::Ip, coverage_area: CoverageArea::InsidePremises, lat: 26.9180, lng: 75.8210 },
    Named { name: "Ankit Verma", email: "ankit.verma5@example.com", phone: "9000000005", camera_type: CameraType::Analog, coverage_area: CoverageArea::FullCoverage, lat: 26.9050, lng: 75.7970 },
    Named { name: "Pooja Joshi", email: "pooja.joshi6@example.com", phone: "9000000006", camera_type: CameraType::Other, coverage_area: CoverageArea::CornerView, lat: 26.9150, lng: 75.8100 },
];

/// Jaipur neighbourhoods as (name, lat, lng)
const AREAS: [(&str, f64, f64); 20] = [
    ("Mansarovar", 26.9105, 75.7805),
    ("Vaishali Nagar", 26.9235, 75.7991),
    ("Malviya Nagar", 26.9126, 75.8339),
    ("Jhotwara", 26.9500, 75.7400),
    ("Pratap Nagar", 26.9010, 75.7870),
    ("C-Scheme", 26.9183, 75.8231),
    ("Civil Lines", 26.9190, 75.8250),
    ("Sitapura", 26.8420, 75.8190),
    ("Sanganer", 26.8310, 75.7900),
    ("Shyam Nagar", 26.9130, 75.8030),
    ("Panchyawala", 26.9480, 75.7560),
    ("Shipra Path", 26.9100, 75.7850),
    ("Sindhi Camp", 26.9190, 75.8060),
    ("Kishanpura", 26.9000, 75.8030),
    ("Sodala", 26.9129, 75.7784),
    ("Ajmer Road", 26.9310, 75.8280),
    ("Tonk Road", 26.9050, 75.8180),
    ("Kalwar Road", 26.9340, 75.6650),
    ("Gopalpura", 26.9005, 75.8070),
    ("Bapu Nagar", 26.9312, 75.8055),
];

const SURNAMES: [&str; 6] = ["Kumar", "Singh", "Sharma", "Verma", "Patel", "Mehta"];

fn pick<T: Copy + Default>(rng: &mut StdRng, options: &[T]) -> T {
    // One extra slot stands for "not specified"
    match rng.gen_range(0..=options.len()) {
        i if i < options.len() => options[i],
        _ => T::default(),
    }
}

fn sample_registrations(generated: usize, rng: &mut StdRng) -> Vec<NewRegistration> {
    let mut samples: Vec<NewRegistration> = NAMED
        .iter()
        .map(|n| NewRegistration {
            name: n.name.to_string(),
            email: Some(n.email.to_string()),
            phone: n.phone.to_string(),
            camera_type: n.camera_type,
            coverage_area: n.coverage_area,
            pincode: String::new(),
            locality: String::new(),
            location: LatLng {
                lat: n.lat,
                lng: n.lng,
            },
        })
        .collect();

    for i in 0..generated {
        let number = NAMED.len() + 1 + i;
        let (area, lat, lng) = *AREAS.choose(rng).unwrap_or(&AREAS[0]);
        let surname = SURNAMES.choose(rng).copied().unwrap_or("Kumar");
        let slug: String = area.to_lowercase().split_whitespace().collect();

        samples.push(NewRegistration {
            name: format!("User{} {}", number, surname),
            email: Some(format!("user{}.{}@example.com", number, slug)),
            phone: format!("9{:09}", 100 + number),
            camera_type: pick(rng, &CameraType::ALL),
            coverage_area: pick(rng, &CoverageArea::ALL),
            pincode: String::new(),
            locality: area.to_string(),
            location: LatLng { lat, lng },
        });
    }

    samples
}

async fn run(args: Args) -> Result<()> {
    let config = config::load_config(args.config.as_deref())?;
    let store = db::open_store(&config.database).await?;

    if !args.keep {
        let removed = store.clear().await?;
        info!("Removed {} existing registrations", removed);
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let samples = sample_registrations(args.generated, &mut rng);
    let total = samples.len();
    for sample in samples {
        store.insert(&sample.into_registration()).await?;
    }

    info!("Seeded {} registrations", total);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()).await {
        error!("Seeding failed: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn samples_have_unique_emails_and_valid_positions() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples = sample_registrations(94, &mut rng);
        assert_eq!(samples.len(), 100);

        let emails: HashSet<_> = samples.iter().filter_map(|s| s.email.clone()).collect();
        assert_eq!(emails.len(), 100);

        for sample in &samples {
            assert!(LatLng::new(sample.location.lat, sample.location.lng).is_ok());
            assert_eq!(sample.phone.len(), 10);
        }
        assert_eq!(samples[0].name, "Aarav Mehta");
        assert!(samples[6].name.starts_with("User7 "));
    }
}
