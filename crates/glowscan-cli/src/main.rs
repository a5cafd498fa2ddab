use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glowscan_core::{
    find_occasion, recommend, Cheekbones, EyeDistance, EyeShape, FaceProportions, FaceShape,
    FaceWidthSampling, FacialFeatures, FeatureClassifier, ForeheadHeight, Jawline, LandmarkSet,
    LipFullness, NoseBridge, Occasion,
};
use glowscan_hw::sim::{ScriptStep, ScriptedDetector, SyntheticCamera};
use glowscan_hw::FacingMode;
use glowscan_session::{spawn_session, Config, ScanStatus, Store};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "glowscan", about = "Glowscan facial analysis and makeup recommendations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a landmark set (JSON array of {x, y, z} points)
    Classify {
        /// Landmark file, or "-" for stdin
        file: PathBuf,
        /// Sample face width the way older builds did
        #[arg(long)]
        legacy_width: bool,
        /// Also print the recommendations for the classified features
        #[arg(long)]
        recommend: bool,
    },
    /// Print recommendations for a face and eye shape
    Recommend {
        #[arg(long, default_value = "oval")]
        face_shape: FaceShape,
        #[arg(long, default_value = "almond")]
        eye_shape: EyeShape,
        /// Print only this occasion's routine
        #[arg(short, long)]
        occasion: Option<Occasion>,
    },
    /// List the supported occasions
    Occasions,
    /// Run a simulated scan with the synthetic camera
    Scan {
        /// Config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Camera to start with (user or environment)
        #[arg(long)]
        facing: Option<FacingMode>,
        /// Simulate the user refusing camera access
        #[arg(long)]
        deny_permission: bool,
        /// Simulate a detector that never finds a face
        #[arg(long)]
        no_face: bool,
        /// Cheekbone width over face height of the simulated face
        #[arg(long, default_value_t = 0.82)]
        width_to_height: f32,
        /// Jaw width over forehead width of the simulated face
        #[arg(long, default_value_t = 0.8)]
        jaw_to_forehead: f32,
        /// Distance between eye centroids of the simulated face
        #[arg(long, default_value_t = 0.17)]
        eye_distance: f32,
        /// Occasion to select before scanning
        #[arg(short, long)]
        occasion: Option<Occasion>,
    },
}

#[derive(Serialize)]
struct OccasionEntry {
    occasion: Occasion,
    name: &'static str,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            file,
            legacy_width,
            recommend: with_recommendations,
        } => {
            let landmarks = read_landmarks(&file)?;
            let sampling = if legacy_width {
                FaceWidthSampling::Legacy
            } else {
                FaceWidthSampling::Cheekbones
            };
            let features = FeatureClassifier::new(sampling).classify(&landmarks);
            tracing::info!(
                points = landmarks.len(),
                face_shape = %features.face_shape,
                "classified"
            );

            if with_recommendations {
                let recommendations = recommend(&features);
                print_json(&serde_json::json!({
                    "features": features,
                    "recommendations": recommendations,
                }))?;
            } else {
                print_json(&features)?;
            }
        }
        Commands::Recommend {
            face_shape,
            eye_shape,
            occasion,
        } => {
            let recommendations = recommend(&features_for(face_shape, eye_shape));
            match occasion {
                Some(occasion) => {
                    let routine = find_occasion(&recommendations, occasion)
                        .with_context(|| format!("no routine for {occasion}"))?;
                    print_json(routine)?;
                }
                None => print_json(&recommendations)?,
            }
        }
        Commands::Occasions => {
            let entries: Vec<_> = Occasion::ALL
                .iter()
                .map(|&occasion| OccasionEntry {
                    occasion,
                    name: occasion.display_name(),
                })
                .collect();
            print_json(&entries)?;
        }
        Commands::Scan {
            config,
            facing,
            deny_permission,
            no_face,
            width_to_height,
            jaw_to_forehead,
            eye_distance,
            occasion,
        } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(facing) = facing {
                config.facing_mode = facing;
            }
            let proportions = FaceProportions {
                width_to_height,
                jaw_to_forehead,
                eye_distance,
            };
            run_scan(config, proportions, deny_permission, no_face, occasion).await?;
        }
    }

    Ok(())
}

/// Features for a face and eye shape, with every other field at its default.
fn features_for(face_shape: FaceShape, eye_shape: EyeShape) -> FacialFeatures {
    FacialFeatures {
        face_shape,
        eye_distance: EyeDistance::Average,
        eye_shape,
        nose_bridge: NoseBridge::Average,
        lip_fullness: LipFullness::Average,
        cheekbones: Cheekbones::Average,
        jawline: Jawline::Average,
        forehead_height: ForeheadHeight::Average,
    }
}

fn read_landmarks(file: &Path) -> Result<LandmarkSet> {
    let text = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?
    };
    serde_json::from_str(&text).context("invalid landmark set")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_scan(
    config: Config,
    proportions: FaceProportions,
    deny_permission: bool,
    no_face: bool,
    occasion: Option<Occasion>,
) -> Result<()> {
    let camera = SyntheticCamera::new();
    camera.probe().set_permission(!deny_permission);

    let detector = if no_face {
        ScriptedDetector::new(vec![ScriptStep::NoFace])
    } else {
        ScriptedDetector::steady(LandmarkSet::synthetic(&proportions))
    };
    let detector = detector.with_frame_interval(config.frame_interval());

    let store = Store::new();
    let handle = spawn_session(&config, Box::new(camera), Box::new(detector), store.clone());
    if let Some(occasion) = occasion {
        handle.select_occasion(occasion);
    }

    let status = handle.start_scan().await?;
    if status == ScanStatus::PermissionDenied {
        bail!("camera permission denied");
    }

    let mut rx = store.subscribe();
    let mut last_line = String::new();
    let state = loop {
        let state = rx.borrow_and_update().clone();
        let line = format!(
            "[{:>3}%] {} ({})",
            state.scan.progress, state.scan.message, state.scan_status
        );
        if line != last_line {
            eprintln!("{line}");
            last_line = line;
        }
        if state.scan_status.is_terminal() {
            break state;
        }
        rx.changed().await.context("scan session ended unexpectedly")?;
    };

    match state.scan_status {
        ScanStatus::Completed => {
            print_json(&state)?;
            Ok(())
        }
        status => bail!("scan ended in {status}"),
    }
}
