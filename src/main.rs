//! Night-storage heater charge controller entry point.

use std::path::{Path, PathBuf};
use std::process;

use chrono::Local;
use tracing_subscriber::EnvFilter;

use night_charger::config::{ConfigProvider, FileConfig, HeaterConfig, StaticConfig};
use night_charger::control::calendar::{CalendarSource, FileCalendar};
use night_charger::forecast::{FixedForecast, OwmForecast};
use night_charger::io::export::export_csv;
use night_charger::io::gpio::GpioHeater;
use night_charger::reporting::DaySummary;
use night_charger::runner::{ControlLoop, TickReport, WallClock};
use night_charger::sim::clock::SimClock;
use night_charger::sim::heater::SimulatedHeater;
use night_charger::telemetry::{HttpTelemetry, NullTelemetry, TelemetrySink};

/// Temperature assumed when simulating without `--sim-temp`.
const DEFAULT_SIM_TEMP: f64 = 10.0;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    blackout_path: Option<String>,
    vacation_path: Option<String>,
    sim: bool,
    sim_temp: Option<f64>,
    history_out: Option<String>,
}

fn print_help() {
    eprintln!("night-charger — night-storage heater charge controller");
    eprintln!();
    eprintln!("Usage: night-charger [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>       Load configuration from TOML file (re-read every tick)");
    eprintln!("  --blackout <path>     Blackout season table (JSON, DD-MM month-day ranges)");
    eprintln!("  --vacation <path>     Vacation table (JSON, DD-MM-YYYY date ranges)");
    eprintln!("  --sim                 Simulate one day instead of driving hardware");
    eprintln!("  --sim-temp <°C>       Forecast temperature used in simulation (default: 10)");
    eprintln!("  --history-out <path>  Export simulated ticks to CSV");
    eprintln!("  --help                Show this help message");
    eprintln!();
    eprintln!("Without --config, built-in defaults are used. The forecast API key is");
    eprintln!("taken from the config file or the OWM_API_KEY environment variable.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        blackout_path: None,
        vacation_path: None,
        sim: false,
        sim_temp: None,
        history_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --config requires a path argument");
                    process::exit(1);
                }
                cli.config_path = Some(args[i].clone());
            }
            "--blackout" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --blackout requires a path argument");
                    process::exit(1);
                }
                cli.blackout_path = Some(args[i].clone());
            }
            "--vacation" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --vacation requires a path argument");
                    process::exit(1);
                }
                cli.vacation_path = Some(args[i].clone());
            }
            "--sim" => {
                cli.sim = true;
            }
            "--sim-temp" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --sim-temp requires a temperature argument");
                    process::exit(1);
                }
                if let Ok(t) = args[i].parse::<f64>() {
                    cli.sim_temp = Some(t);
                } else {
                    eprintln!(
                        "error: --sim-temp value \"{}\" is not a valid number",
                        args[i]
                    );
                    process::exit(1);
                }
            }
            "--history-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --history-out requires a path argument");
                    process::exit(1);
                }
                cli.history_out = Some(args[i].clone());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Simulates one day against a fixed forecast and prints the record.
fn run_simulation<P, S>(cli: &CliArgs, provider: P, calendar: S)
where
    P: ConfigProvider,
    S: CalendarSource,
{
    let start = Local::now().naive_local();
    let heater = SimulatedHeater::new();
    let forecast = FixedForecast {
        temperature: cli.sim_temp.unwrap_or(DEFAULT_SIM_TEMP),
    };

    let mut controller =
        match ControlLoop::start(heater, forecast, NullTelemetry, provider, calendar, start) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        };

    let mut clock = SimClock::one_day(start);
    let mut reports: Vec<TickReport> = Vec::new();
    let outcome = controller.run(&mut clock, |report| {
        println!("{report}");
        reports.push(*report);
    });
    if let Err(e) = outcome {
        eprintln!("error: {e}");
        process::exit(1);
    }

    println!("\n{}", DaySummary::from_reports(&reports, 60));

    if let Some(ref path) = cli.history_out {
        if let Err(e) = export_csv(&reports, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("History written to {path}");
    }
}

/// Drives the real heater until killed.
fn run_live<P, S, T>(cfg: &HeaterConfig, provider: P, calendar: S, telemetry: T)
where
    P: ConfigProvider,
    S: CalendarSource,
    T: TelemetrySink,
{
    let api_key = if cfg.forecast.api_key.is_empty() {
        match std::env::var("OWM_API_KEY") {
            Ok(key) => key,
            Err(_) => {
                eprintln!("error: no forecast API key in config or OWM_API_KEY");
                process::exit(1);
            }
        }
    } else {
        cfg.forecast.api_key.clone()
    };
    let forecast = OwmForecast::new(api_key, cfg.forecast.location_id);

    let heater = match GpioHeater::new(&cfg.gpio) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let now = Local::now().naive_local();
    let mut controller =
        match ControlLoop::start(heater, forecast, telemetry, provider, calendar, now) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        };

    let mut clock = WallClock::new(cfg.run.tick_secs);
    if let Err(e) = controller.run(&mut clock, |_| {}) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn dispatch<P: ConfigProvider>(cli: &CliArgs, cfg: &HeaterConfig, provider: P) {
    let calendar = FileCalendar::new(
        cli.blackout_path.as_ref().map(PathBuf::from),
        cli.vacation_path.as_ref().map(PathBuf::from),
    );

    if cli.sim {
        run_simulation(cli, provider, calendar);
    } else if let Some(ref url) = cfg.telemetry.url {
        run_live(cfg, provider, calendar, HttpTelemetry::new(url.clone()));
    } else {
        run_live(cfg, provider, calendar, NullTelemetry);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_args();

    let cfg = match cli.config_path {
        Some(ref path) => match HeaterConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => HeaterConfig::default(),
    };

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    match cli.config_path {
        Some(ref path) => dispatch(&cli, &cfg, FileConfig::new(path.clone())),
        None => dispatch(&cli, &cfg, StaticConfig(cfg.clone())),
    }
}
