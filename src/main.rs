use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use cdews_client::analysis::groupings;
use cdews_client::config::Config;
use cdews_client::dashboard::{Dashboard, Services};
use cdews_client::diseases;
use cdews_client::ingest::predict::HttpPredictionService;
use cdews_client::ingest::{self, assistant, fixture::FixtureReportSource};
use cdews_client::ingest::reports::{HttpReportSource, ReportSource};
use cdews_client::logging::{self, DataSource, LogLevel};
use cdews_client::model::{Coordinates, ImageUpload};
use cdews_client::planner::{Climate, PlanForm, SoilType};
use cdews_client::submission::{run_submission, FixedGeolocator, Submission, SubmissionState};
use cdews_client::verify;

#[derive(Parser)]
#[command(name = "cdews", about = "Crop Disease Early Warning System client", version)]
struct Cli {
    /// Config file (defaults to ./cdews.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overrides [logging] level: debug, info, warning, error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch outbreak reports and list the map markers
    Map {
        /// Read reports from a JSON file instead of the backend
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Write markers as a GeoJSON FeatureCollection
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// Estimate water, fertilizer and cost for a crop
    Plan {
        /// Land size in acres
        #[arg(long)]
        land_size: String,
        #[arg(long)]
        crop: String,
        #[arg(long, default_value = "loamy")]
        soil: SoilType,
        #[arg(long, default_value = "temperate")]
        climate: Climate,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit a leaf image for classification
    Submit {
        #[arg(long)]
        image: PathBuf,
        /// Position of the report; without it the submission is refused
        #[arg(long, requires = "long", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        long: Option<f64>,
    },
    /// Ask the farming assistant a question
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Check that the backend is reachable and serving reports
    Verify,
}

const WAIT: Duration = Duration::from_secs(120);

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let level = cli
        .log_level
        .as_deref()
        .and_then(LogLevel::parse)
        .unwrap_or_else(|| config.logging.log_level());
    logging::init_logger(level, config.logging.file.as_deref());
    logging::debug(
        DataSource::Config,
        None,
        &format!("backend {}", config.api.base_url),
    );

    match cli.command {
        Command::Map { fixture, geojson } => run_map(&config, fixture, geojson),
        Command::Plan {
            land_size,
            crop,
            soil,
            climate,
            json,
        } => run_plan(land_size, crop, soil, climate, json),
        Command::Submit { image, lat, long } => {
            let position = lat.zip(long).map(|(lat, long)| Coordinates::new(lat, long));
            run_submit(&config, image, position)
        }
        Command::Ask { query } => run_ask(&config, &query.join(" ")),
        Command::Verify => {
            let report = verify::run_full_verification(&config.api.base_url, config.api.timeout_secs)?;
            if report.is_healthy() {
                Ok(())
            } else {
                Err("backend verification failed".into())
            }
        }
    }
}

fn services(
    config: &Config,
    reports: Arc<dyn ReportSource + Send + Sync>,
    position: Option<Coordinates>,
) -> Result<Services, Box<dyn Error>> {
    let client = ingest::build_client(config.api.timeout_secs)?;
    Ok(Services {
        reports,
        geolocator: Arc::new(FixedGeolocator(position)),
        predictor: Arc::new(HttpPredictionService::new(client, &config.api.base_url)),
    })
}

fn run_map(
    config: &Config,
    fixture: Option<PathBuf>,
    geojson: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let source: Arc<dyn ReportSource + Send + Sync> = match fixture {
        Some(path) => Arc::new(FixtureReportSource::new(path)),
        None => {
            let client = ingest::build_client(config.api.timeout_secs)?;
            Arc::new(HttpReportSource::new(client, &config.api.base_url))
        }
    };

    let mut dashboard = Dashboard::new(
        services(config, source, None)?,
        config.map.view(),
        config.refresh.max_age_minutes,
    );
    dashboard.mount();
    if !dashboard.wait_idle(WAIT) {
        return Err("timed out waiting for reports".into());
    }

    if let Some(err) = dashboard.store().last_error() {
        println!("Could not load reports: {}", err);
    }

    let map = dashboard.map();
    let view = map.view();
    println!(
        "Map centred on ({:.4}, {:.4}) at zoom {}",
        view.center.lat, view.center.long, view.zoom
    );

    println!("\nLegend:");
    for entry in map.legend() {
        println!("  {:<8} {}", entry.marker.to_string(), entry.text);
    }

    println!("\nMarkers ({}):", map.markers().len());
    for marker in map.markers() {
        println!(
            "  #{:<6} ({:>9.4}, {:>9.4})  {:<7} {}",
            marker.report_id.to_string(),
            marker.position.lat,
            marker.position.long,
            marker.descriptor.marker.to_string(),
            marker.popup()
        );
    }
    for warning in map.warnings() {
        println!("  ⚠ {}", warning);
    }

    let counts = groupings::group_by_disease(dashboard.store().reports());
    if !counts.is_empty() {
        println!("\nReports by disease:");
        for row in counts {
            println!("  {:>4}  {}", row.count, row.display_name);
        }
    }

    if let Some(path) = geojson {
        std::fs::write(&path, map.to_geojson().to_string())?;
        println!("\nWrote GeoJSON to {}", path.display());
    }

    dashboard.unmount();
    Ok(())
}

fn run_plan(
    land_size: String,
    crop: String,
    soil: SoilType,
    climate: Climate,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let form = PlanForm {
        land_size,
        crop_type: crop,
        soil_type: soil,
        climate,
    };
    let plan = cdews_client::planner::plan(&form)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "Plan for {} acre(s) of {} ({}, {})",
        plan.land_size_acres, plan.crop, plan.soil_type, plan.climate
    );
    if plan.used_default_crop {
        println!("  (no data for '{}'; showing {} figures)", plan.crop, plan.requirements_crop);
    }
    println!("\nWater:       {}", plan.total_water);
    println!("             crop baseline {} per acre", plan.water_per_acre);
    println!("\nFertilizer (per acre):");
    println!("  Nitrogen:   {}", plan.fertilizer.nitrogen);
    println!("  Phosphorus: {}", plan.fertilizer.phosphorus);
    println!("  Potassium:  {}", plan.fertilizer.potassium);
    println!("\nChemicals:");
    for chemical in &plan.chemicals {
        println!("  - {}", chemical);
    }
    println!("\nExpected yield:   {}", plan.expected_yield);
    println!("Investment:       {}", plan.total_investment);
    println!("Expected profit:  {}", plan.expected_profit);
    println!("\nRecommendations:");
    for rec in &plan.recommendations {
        println!("  - {}", rec);
    }
    Ok(())
}

fn run_submit(
    config: &Config,
    image_path: PathBuf,
    position: Option<Coordinates>,
) -> Result<(), Box<dyn Error>> {
    let image = ImageUpload::from_path(&image_path)?;
    let client = ingest::build_client(config.api.timeout_secs)?;
    let predictor = HttpPredictionService::new(client, &config.api.base_url);

    let mut submission = Submission::new();
    submission.select_image(image)?;

    run_submission(&mut submission, &FixedGeolocator(position), &predictor);

    match submission.state() {
        SubmissionState::SubmitSucceeded(result) => {
            let advice = result.advisory_or_local();
            println!("Diagnosis:  {}", diseases::display_label(&result.label));
            println!("Confidence: {}", result.confidence_percent());
            println!("\n{}\n{}", advice.title, advice.overview);
            println!("\n{}", advice.prevention.title);
            for step in &advice.prevention.steps {
                println!("  - {}", step);
            }
            println!("\n{}", advice.cure.title);
            for step in &advice.cure.steps {
                println!("  - {}", step);
            }
            Ok(())
        }
        _ => {
            let message = submission
                .user_message()
                .unwrap_or_else(|| "Submission did not complete.".to_string());
            Err(message.into())
        }
    }
}

fn run_ask(config: &Config, query: &str) -> Result<(), Box<dyn Error>> {
    let client = ingest::build_client(config.api.timeout_secs)?;
    match assistant::ask(&client, &config.api.base_url, query) {
        Ok(answer) => {
            println!("{}", answer);
            Ok(())
        }
        Err(e) => {
            logging::warn(DataSource::Assistant, None, &e.to_string());
            Err(e.user_message().into())
        }
    }
}
