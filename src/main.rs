use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use nav_kalman_rs::types::parse_fixes;
use nav_kalman_rs::{NavigationConfig, NavigationFilter, NavigationState, PositionFix};

#[derive(Parser, Debug)]
#[command(name = "nav_tracker")]
#[command(about = "Track 2D position fixes with a 6-state Kalman filter", long_about = None)]
struct Args {
    /// Fix stream (JSON array or JSON lines of {"x", "y"}); built-in demo track if omitted
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Filter tuning (JSON, any subset of fields)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Time step in seconds (overrides the config file)
    #[arg(long)]
    dt: Option<f64>,

    /// Extra open-loop predictions after the last fix
    #[arg(long, default_value = "0")]
    coast: usize,

    /// Emit one JSON object per step instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NavigationConfig::from_json_file(path)?,
        None => NavigationConfig::default(),
    };
    if let Some(dt) = args.dt {
        config.dt = dt;
    }

    let fixes = match &args.input {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_fixes(&raw).with_context(|| format!("Malformed fix stream in {}", path.display()))?
        }
        None => demo_track(),
    };

    let mut tracker = NavigationFilter::with_config(config)?;
    log::info!(
        "[{}] nav_tracker: {} fixes, dt={}s, coast={}",
        ts_now(),
        fixes.len(),
        tracker.dt(),
        args.coast
    );

    let mut previous: Option<&PositionFix> = None;
    for fix in &fixes {
        if let Some(gap) = previous.and_then(|prev| fix.interval_since(prev)) {
            // F is built for a fixed dt; irregular fixes degrade the motion model
            if (gap - tracker.dt()).abs() > 0.5 * tracker.dt() {
                log::warn!(
                    "Fix at t={:.3} arrived {:.3}s after the previous one (dt={}s)",
                    fix.timestamp.unwrap_or_default(),
                    gap,
                    tracker.dt()
                );
            }
        }
        previous = Some(fix);

        tracker.predict();
        if let Err(e) = tracker.update(&fix.as_vector()) {
            // The filter is untouched on error; keep tracking on prediction alone
            log::warn!("Skipping fix ({}, {}): {}", fix.x, fix.y, e);
        }
        report(&tracker.snapshot(), args.json)?;
    }

    for _ in 0..args.coast {
        tracker.predict();
        report(&tracker.snapshot(), args.json)?;
    }

    log::info!(
        "[{}] done: {} updates, {} predictions",
        ts_now(),
        tracker.update_count(),
        tracker.predict_count()
    );
    Ok(())
}

fn demo_track() -> Vec<PositionFix> {
    vec![
        PositionFix::new(0.0, 0.0),
        PositionFix::new(1.1, 0.9),
        PositionFix::new(2.3, 2.1),
        PositionFix::new(3.2, 2.9),
    ]
}

fn report(state: &NavigationState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(state)?);
        return Ok(());
    }

    println!("Position: ({:.3}, {:.3})", state.position.0, state.position.1);
    println!("Velocity: ({:.3}, {:.3})", state.velocity.0, state.velocity.1);
    println!("Speed: {:.3} m/s", state.speed);
    println!("Heading: {:.1} degrees", state.heading_deg);
    println!("Uncertainty: {:.2} m", state.uncertainty_m);
    println!("------------------------");
    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
