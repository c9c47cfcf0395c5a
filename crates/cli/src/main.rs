use clap::{Args, Parser, Subcommand};
use moonlight_core::{
    config::{
        data_dir_from_env_value, page_size_from_env_value, utc_offset_from_env_value,
    },
    BoundingBox, CoreConfig, HospitalSearch, Profiler, Services, StatusToken,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "moonlight")]
#[command(about = "Hospital availability and survey CLI")]
struct Cli {
    /// Directory holding the collection files (defaults to MOONLIGHT_DATA_DIR or hospital_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct BoxArgs {
    swlng: String,
    swlat: String,
    nelng: String,
    nelat: String,
    /// openToday, openNow or openSunday
    #[arg(long)]
    status: Option<String>,
}

impl BoxArgs {
    fn bbox(&self) -> Result<BoundingBox, moonlight_core::CoreError> {
        BoundingBox::from_params(
            Some(&self.swlng),
            Some(&self.swlat),
            Some(&self.nelng),
            Some(&self.nelat),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's day key, clock reading and holiday flag
    DayKey,
    /// Show one hospital with its current status
    Hospital {
        /// Hospital id (hpid)
        hospital_id: String,
    },
    /// Sample pediatric-capable hospitals inside a box
    Search {
        #[command(flatten)]
        area: BoxArgs,
        /// Only facilities whose name marks them as pediatric
        #[arg(long)]
        pedonly: bool,
    },
    /// List moonlight clinics inside a box
    Moonlights {
        #[command(flatten)]
        area: BoxArgs,
    },
    /// Summarise the surveys submitted for a hospital
    SurveySummary {
        /// Hospital id (hpid)
        hospital_id: String,
    },
    /// Print the survey questionnaire
    Questions,
}

fn services(data_dir: Option<PathBuf>) -> Result<Services, Box<dyn std::error::Error>> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => data_dir_from_env_value(std::env::var("MOONLIGHT_DATA_DIR").ok())?,
    };
    let offset = utc_offset_from_env_value(std::env::var("MOONLIGHT_UTC_OFFSET").ok())?;
    let page_size = page_size_from_env_value(std::env::var("MOONLIGHT_PAGE_SIZE").ok())?;

    let cfg = Arc::new(CoreConfig::new(data_dir, offset, page_size)?);
    Ok(Services::open(cfg, Arc::new(Profiler::new()))?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'moonlight --help' for commands");
        return Ok(());
    };

    // The questionnaire is compiled in; no data directory needed.
    if let Commands::Questions = command {
        return print_json(&moonlight_core::SurveySchema::standard().to_response());
    }

    let services = services(cli.data_dir)?;

    match command {
        Commands::DayKey => {
            let day = services.hospitals.resolve_day();
            println!(
                "Day key: {}, Now: {}, Holiday: {}",
                day.day_key,
                day.now.to_colon_string(),
                day.is_holiday
            );
        }
        Commands::Hospital { hospital_id } => {
            match services.hospitals.get_hospital(&hospital_id) {
                Ok(res) => print_json(&res)?,
                Err(e) => eprintln!("Error finding hospital {}: {}", hospital_id, e),
            }
        }
        Commands::Search { area, pedonly } => {
            let search = HospitalSearch {
                bbox: area.bbox()?,
                status: StatusToken::parse(area.status.as_deref()),
                pediatric_only: pedonly,
            };
            match services.hospitals.search_hospitals(search) {
                Ok(res) => {
                    print_json(&res)?;
                    if res.total_count > res.pageable_count {
                        println!("More hospitals match; repeat to sample again.");
                    }
                }
                Err(e) => eprintln!("Error searching hospitals: {}", e),
            }
        }
        Commands::Moonlights { area } => {
            let status = StatusToken::parse(area.status.as_deref());
            match services.hospitals.list_moonlights(area.bbox()?, status) {
                Ok(res) => print_json(&res)?,
                Err(e) => eprintln!("Error listing moonlights: {}", e),
            }
        }
        Commands::SurveySummary { hospital_id } => {
            match services.surveys.summary(&hospital_id) {
                Ok(res) => print_json(&res)?,
                Err(e) => eprintln!("Error summarising surveys: {}", e),
            }
        }
        Commands::Questions => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_parses_box_and_flags() {
        let cli = Cli::try_parse_from([
            "moonlight", "search", "126", "37", "128", "38", "--status", "openNow", "--pedonly",
        ])
        .unwrap();
        let Some(Commands::Search { area, pedonly }) = cli.command else {
            panic!("expected search");
        };
        assert!(pedonly);
        assert_eq!(area.status.as_deref(), Some("openNow"));
        assert_eq!(area.bbox().unwrap().north_east, [128.0, 38.0]);
    }

    #[test]
    fn malformed_box_is_rejected() {
        let cli = Cli::try_parse_from(["moonlight", "moonlights", "x", "37", "128", "38"]).unwrap();
        let Some(Commands::Moonlights { area }) = cli.command else {
            panic!("expected moonlights");
        };
        assert!(area.bbox().is_err());
    }
}
