use clap::Parser;
use jarfill::prelude::*;
use jarfill::ParticleSet;
use std::path::PathBuf;
use std::process::ExitCode;

/// Fill a spice jar and log what was placed.
#[derive(Parser, Debug)]
#[command(name = "jarfill")]
struct Args {
    /// JSON session config; a three-layer preset is used when omitted
    config: Option<PathBuf>,

    /// seed for reproducible fills (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// segments around the jar
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u32).range(3..))]
    segments: u32,

    /// fill all substances from one shared pool
    #[arg(long)]
    mixed: bool,
}

/// Straight-walled jar with a rounded shoulder and a closed bottom.
fn spice_jar(segments: u32) -> ContainerSurface {
    let profile = [
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 7.0),
        (0.95, 7.6),
        (0.8, 8.0),
        (0.7, 8.2),
        (0.7, 9.0),
    ];
    ContainerSurface::lathe(&profile, segments)
}

fn default_config() -> SessionConfig {
    SessionConfig {
        fill: FillConfig::default(),
        substances: vec![
            Substance::new("salt", 60.0)
                .with_band(0.0, 25.0)
                .with_size(0.04, 0.3)
                .with_color(Vec3::new(0.95, 0.95, 0.93), 0.15),
            Substance::new("paprika", 60.0)
                .with_band(25.0, 45.0)
                .with_size(0.05, 0.4)
                .with_color(Vec3::new(0.75, 0.2, 0.08), 0.3),
            Substance::new("peppercorn", 8.0)
                .with_band(45.0, 60.0)
                .with_visual(VisualKind::InstancedMesh)
                .with_size(0.12, 0.3)
                .with_rotation(Vec3::new(3.1, 3.1, 3.1), 1.0),
        ],
    }
}

fn summary(name: &str, set: &ParticleSet, bytes: usize) {
    if set.shortfall() > 0 {
        log::warn!(
            "{:>12}: {:>6}/{:<6} particles, {} short, {} bytes",
            name,
            set.instances().len(),
            set.requested(),
            set.shortfall(),
            bytes
        );
    } else {
        log::info!(
            "{:>12}: {:>6} particles, {} attempts, {} bytes",
            name,
            set.instances().len(),
            set.attempts(),
            bytes
        );
    }
}

fn run(args: Args) -> Result<(), FillError> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => default_config(),
    };
    if args.seed.is_some() {
        config.fill.seed = args.seed;
    }

    let mut session = FillSession::from_config(spice_jar(args.segments), config);
    if session.is_empty() {
        log::warn!("No usable substances, nothing to fill");
        return Ok(());
    }

    if args.mixed {
        session.fill_mixed();
    } else {
        session.recompute_all();
    }

    if let Some(cap) = session.cap() {
        log::info!(
            "Cap at height {:.3}: {} ring vertices, {} triangles, area {:.3}",
            cap.height(),
            cap.ring().len(),
            cap.indices().len(),
            cap.area()
        );
    }

    for &id in session.ids() {
        let renderable = session.emit(id)?;
        if let (Some(substance), Some(set)) = (session.substance(id), session.particles(id)) {
            summary(&substance.name, set, renderable.as_bytes().len());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
