//! Scene placement binary - runs one optimizer round-trip for a scene file.
//!
//! Usage: cargo run --release --bin place_scene -- --scene <FILE> [OPTIONS]
//!
//! Options:
//!   --scene <FILE>    Scene description JSON (required)
//!   --config <FILE>   Session config JSON (default: built-in defaults)
//!   --addr <ADDR>     Optimizer address, overrides the config
//!   --env <NAME>      Environment to activate, overrides the scene file
//!
//! Captures source and target at the scene's viewer pose, requests an
//! optimization and prints the resolved element poses.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use arplace::scene::SceneDescription;
use arplace::session::{Command, Session, SessionConfig};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(scene_path) = parse_path_arg(&args, "--scene") else {
        eprintln!("Usage: place_scene --scene <FILE> [--config <FILE>] [--addr <ADDR>] [--env <NAME>]");
        return ExitCode::FAILURE;
    };

    match run(&args, scene_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String], scene_path: PathBuf) -> arplace::core::Result<()> {
    let mut config = match parse_path_arg(args, "--config") {
        Some(path) => SessionConfig::load(&path)?,
        None => SessionConfig::default(),
    };
    if let Some(addr) = parse_str_arg(args, "--addr") {
        config.optimizer_addr = addr;
    }

    let mut scene = SceneDescription::load(&scene_path)?;
    if let Some(env) = parse_str_arg(args, "--env") {
        scene.active_environment = Some(env);
    }

    println!("=== Arplace Scene Placement ===");
    println!("Scene:     {}", scene_path.display());
    println!("Optimizer: {}", config.optimizer_addr);
    println!("Cell size: {:?}", config.cell_size);
    println!();

    let mut session = Session::from_scene(config, scene)?;
    session.connect().await?;

    let start = Instant::now();
    session.dispatch(Command::CaptureSource)?;
    session.dispatch(Command::CaptureTarget)?;
    session.dispatch(Command::Optimize)?;
    println!(
        "Sent {} elements over {} cells ({} occlusions, {} obstructed)",
        session.elements().len(),
        session.grid().len(),
        session.occlusions().len(),
        session.obstructions().len()
    );

    let placements = session.await_placement().await?;
    println!("Optimizer answered in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    println!();

    for placement in &placements {
        let element = &session.elements()[placement.element];
        let p = placement.pose.position;
        let f = placement.pose.forward();
        println!(
            "{:<24} pos ({:>7.3}, {:>7.3}, {:>7.3})  fwd ({:>6.3}, {:>6.3}, {:>6.3}){}",
            element.name,
            p.x, p.y, p.z,
            f.x, f.y, f.z,
            if placement.snap { "  snap" } else { "" }
        );
    }

    session.disconnect();
    Ok(())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.clone())
}

fn parse_path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    parse_str_arg(args, flag).map(PathBuf::from)
}
