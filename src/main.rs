use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::BufRead;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fraudguard::config::FraudGuardConfig;
use fraudguard::credentials::Authenticator;
use fraudguard::dashboard::{render_login, LiveDashboard};
use fraudguard::output;
use fraudguard::report;
use fraudguard::scorer::FraudScorer;
use fraudguard::session::Session;
use fraudguard::simulation::Simulation;
use fraudguard::sweep::{self, SweepEngine};

const PASSWORD_ENV: &str = "FRAUDGUARD_PASSWORD";

#[derive(Parser)]
#[command(name = "fraudguard", about = "Real-time financial fraud detection demo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LoginArgs {
    /// Login identifier (see `fraudguard users`)
    #[arg(long)]
    user: String,

    /// Secret; falls back to FRAUDGUARD_PASSWORD, then one line of stdin
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args)]
struct ParamArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transactions per second (1-10)
    #[arg(long)]
    speed: Option<u32>,

    /// Injected fraud rate in percent (0-100)
    #[arg(long)]
    fraud_rate: Option<u32>,

    /// Probability that the detector is consulted (0.0-1.0)
    #[arg(long)]
    sensitivity: Option<f64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the accepted login identifiers
    Users,

    /// Log in and run the live terminal dashboard
    Run {
        #[command(flatten)]
        login: LoginArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// Stop after this many ticks (runs until interrupted otherwise)
        #[arg(long)]
        ticks: Option<u64>,

        /// Write an HTML dashboard snapshot when the loop ends
        #[arg(long)]
        report: Option<PathBuf>,

        /// Append frames instead of clearing the screen
        #[arg(long)]
        no_clear: bool,
    },

    /// Log in and run without sleeping, writing all outputs to a directory
    Batch {
        #[command(flatten)]
        login: LoginArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// Number of ticks to simulate
        #[arg(long, default_value = "500")]
        ticks: u64,

        /// Output directory
        #[arg(long, default_value = "output/batch")]
        output_dir: PathBuf,
    },

    /// Evaluate detection over a grid of fraud rates and sensitivities
    Sweep {
        /// TOML configuration file (detector section is used)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ticks per combination
        #[arg(long, default_value = "500")]
        ticks: u64,

        /// Comma-separated fraud rates in percent
        #[arg(long, default_value = "0,10,25,50,100")]
        fraud_rates: String,

        /// Comma-separated sensitivities
        #[arg(long, default_value = "0.0,0.3,0.7,1.0")]
        sensitivities: String,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output CSV
        #[arg(long, default_value = "output/sweep.csv")]
        output: PathBuf,
    },
}

fn boxed(e: Box<dyn std::error::Error>) -> anyhow::Error {
    anyhow!("{}", e)
}

fn parse_list<T>(text: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.split(',')
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("invalid list value '{}'", v.trim()))
        })
        .collect()
}

fn load_config(path: Option<&PathBuf>) -> Result<FraudGuardConfig> {
    match path {
        Some(p) => FraudGuardConfig::load(p)
            .with_context(|| format!("loading config from {}", p.display())),
        None => Ok(FraudGuardConfig::default()),
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(args: &ParamArgs) -> Result<FraudGuardConfig> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(speed) = args.speed {
        config.params.speed = speed;
    }
    if let Some(rate) = args.fraud_rate {
        config.params.fraud_rate = rate;
    }
    if let Some(sensitivity) = args.sensitivity {
        config.params.sensitivity = sensitivity;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("invalid simulation parameters")?;
    Ok(config)
}

fn read_secret(args: &LoginArgs) -> Result<String> {
    if let Some(p) = &args.password {
        return Ok(p.clone());
    }
    if let Ok(p) = std::env::var(PASSWORD_ENV) {
        return Ok(p);
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

fn login(args: &LoginArgs, capacity: usize) -> Result<Session> {
    let secret = read_secret(args)?;
    match Authenticator::default().login(&args.user, &secret, capacity) {
        Some(session) => Ok(session),
        None => bail!("Login failed: invalid credentials for '{}'", args.user),
    }
}

fn start_simulation(login_args: &LoginArgs, config: &FraudGuardConfig) -> Result<Simulation> {
    let session = login(login_args, config.session.capacity)?;
    let scorer = FraudScorer::fit(&config.detector).context("fitting anomaly model")?;
    Ok(Simulation::new(session, scorer, config.seed))
}

fn run_live(
    login_args: &LoginArgs,
    params: &ParamArgs,
    ticks: Option<u64>,
    report_path: Option<PathBuf>,
    no_clear: bool,
) -> Result<()> {
    let config = resolve_config(params)?;
    let mut simulation = start_simulation(login_args, &config)?.with_metrics(report_path.is_some());

    let stdout = std::io::stdout();
    let mut dashboard = LiveDashboard::new(stdout.lock()).with_clear(!no_clear);
    dashboard
        .run(&mut simulation, &config.params, ticks)
        .map_err(boxed)
        .context("running live dashboard")?;

    if let Some(path) = report_path {
        if let Some(state) = simulation.state() {
            let html = report::generate_report(
                state,
                &simulation.metrics,
                &config,
                simulation.session().user(),
            );
            report::save_report(&html, &path).map_err(boxed)?;
            info!(path = %path.display(), "report written");
        }
    }
    Ok(())
}

fn run_batch(
    login_args: &LoginArgs,
    params: &ParamArgs,
    ticks: u64,
    output_dir: PathBuf,
) -> Result<()> {
    let config = resolve_config(params)?;
    let mut simulation = start_simulation(login_args, &config)?.with_metrics(true);

    let pb = ProgressBar::new(ticks);
    pb.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} ticks [{elapsed_precise}]")?,
    );

    simulation.run_clocked_with(ticks, &config.params, Local::now().naive_local(), |_| {
        pb.inc(1)
    })?;
    pb.finish_and_clear();

    output::save_all(&simulation, &config, &output_dir).map_err(boxed)?;
    if let Some(state) = simulation.state() {
        let html = report::generate_report(
            state,
            &simulation.metrics,
            &config,
            simulation.session().user(),
        );
        report::save_report(&html, &output_dir.join("dashboard.html")).map_err(boxed)?;
    }

    let summary = output::compute_summary(&simulation.metrics);
    println!("{}", output::summary_line(&summary));
    println!("Outputs written to {}", output_dir.display());
    Ok(())
}

fn run_sweep(
    config_path: Option<PathBuf>,
    ticks: u64,
    fraud_rates: &str,
    sensitivities: &str,
    seed: u64,
    output_path: PathBuf,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let rates: Vec<u32> = parse_list(fraud_rates)?;
    let sens: Vec<f64> = parse_list(sensitivities)?;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .context("invalid sweep start time")?;
    let engine = SweepEngine::new(ticks, seed, &config.detector, start)
        .context("fitting anomaly model")?;

    println!(
        "Sweeping {} fraud rates x {} sensitivities ({} ticks each)",
        rates.len(),
        sens.len(),
        ticks
    );
    let results = engine.run_grid(&rates, &sens)?;
    print!("{}", sweep::format_table(&results));

    sweep::save_sweep_csv(&results, &output_path).map_err(boxed)?;
    println!("Saved sweep results to {}", output_path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fraudguard=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Users => {
            let auth = Authenticator::default();
            print!("{}", render_login(&auth.store().identifiers()));
            Ok(())
        }

        Commands::Run {
            login,
            params,
            ticks,
            report,
            no_clear,
        } => run_live(&login, &params, ticks, report, no_clear),

        Commands::Batch {
            login,
            params,
            ticks,
            output_dir,
        } => run_batch(&login, &params, ticks, output_dir),

        Commands::Sweep {
            config,
            ticks,
            fraud_rates,
            sensitivities,
            seed,
            output,
        } => run_sweep(config, ticks, &fraud_rates, &sensitivities, seed, output),
    }
}
