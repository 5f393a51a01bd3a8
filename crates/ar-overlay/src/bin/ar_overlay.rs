//! Offline overlay renderer: replays recorded detector output onto a frame.
//!
//! Reads a JSON file holding an array of frames, each an array of marker
//! observations, runs the full track/resolve/project pipeline over them and
//! writes the final composited frame as an image.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use log::{info, LevelFilter};

use ar_overlay::{convert, AssetRegister, FrameBuffer, MarkerObservation, OverlaySession, SessionParams};
use ar_overlay_mesh::{load_obj, ObjLoadOptions};

#[derive(Parser, Debug)]
#[command(name = "ar-overlay", about = "Replay recorded marker detections into a composited frame")]
struct Args {
    /// JSON file: array of frames, each an array of marker observations.
    observations: PathBuf,

    /// Fallback OBJ model used when a marker class has no asset mapping.
    #[arg(long)]
    model: PathBuf,

    /// Texture image for the fallback model.
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Asset map JSON; referenced models preload from its directory.
    #[arg(long)]
    map: Option<PathBuf>,

    /// Background frame image. Defaults to a blank frame.
    #[arg(long)]
    frame: Option<PathBuf>,

    /// Blank-frame width when no background is given.
    #[arg(long, default_value_t = 1280)]
    width: usize,

    /// Blank-frame height when no background is given.
    #[arg(long, default_value_t = 720)]
    height: usize,

    /// Freeze animation frame advancement.
    #[arg(long)]
    freeze: bool,

    /// Smooth rotation vectors with a moving average.
    #[arg(long)]
    smooth: bool,

    /// Output image path.
    #[arg(short, long, default_value = "overlay.png")]
    output: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    ar_overlay::core::init_with_level(level)?;

    let fallback = load_obj(
        &args.model,
        &ObjLoadOptions {
            texture: args.texture.clone(),
            ..ObjLoadOptions::default()
        },
    )?;
    let mut register = AssetRegister::new(Arc::new(fallback));
    if let Some(map_path) = &args.map {
        let added = register.load_map_file(map_path)?;
        let root = map_path.parent().unwrap_or_else(|| Path::new("."));
        let loaded = register.preload(root)?;
        info!("asset map: {added} entries, {loaded} sequence(s) loaded");
    }

    let mut frame = match &args.frame {
        Some(path) => convert::load_frame(path)?,
        None => FrameBuffer::new(args.width, args.height),
    };

    let text = std::fs::read_to_string(&args.observations)?;
    let frames: Vec<Vec<MarkerObservation>> = serde_json::from_str(&text)?;

    let params = SessionParams {
        smooth_rotation: args.smooth,
        ..SessionParams::default()
    };
    let mut session = OverlaySession::new(params, register);
    if args.freeze {
        session.toggle_frozen();
    }

    for (index, observations) in frames.iter().enumerate() {
        let stats = session.process_frame(&mut frame, observations);
        info!(
            "frame {index}: {} tracked, {} augmented, {} skipped",
            stats.tracked, stats.augmented, stats.skipped
        );
    }

    convert::save_frame(&frame, &args.output)?;
    info!("wrote {}", args.output.display());
    Ok(())
}
