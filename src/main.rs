mod annotate;
mod capture;
mod config;
mod corners;
mod detect;
mod fen;
mod preview;
mod report;
mod router;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, Command};
use dialoguer::{Confirm, Input};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::annotate::AnnotateOutcome;
use crate::capture::CapturedImage;
use crate::config::Config;
use crate::corners::{ChessboardCorners, Point, Size};
use crate::detect::{DetectError, DetectionClient, DetectionResult};
use crate::router::{Router, Screen};

#[derive(Clone, Debug)]
enum Source {
    File(PathBuf),
    Screen,
}

struct RunOptions {
    source: Option<Source>,
    display: Option<Size>,
    preview: bool,
    json: bool,
}

fn cli() -> Command {
    Command::new("fensnap")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Photograph a chessboard, tag its corners, and read the position back as FEN")
        .arg(
            Arg::new("image")
                .long("image")
                .value_name("PATH")
                .help("Photo of the board to submit")
                .value_parser(clap::value_parser!(PathBuf))
                .conflicts_with("screen"),
        )
        .arg(
            Arg::new("screen")
                .long("screen")
                .help("Capture the primary display instead of loading a photo")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("corners")
                .long("corners")
                .value_name("POINTS")
                .help("Four corners `x,y` in TL TR BR BL order; runs once without prompts")
                .value_parser(parse_corners_arg),
        )
        .arg(
            Arg::new("display")
                .long("display")
                .value_name("WxH")
                .help("Size of the view the corner coordinates were read from (default: image size)")
                .value_parser(parse_display_arg),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("Base URL of the detection backend"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .default_value(config::DEFAULT_CONFIG_PATH)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .help("Write the effective configuration to --config and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("preview")
                .long("preview")
                .help("Save an annotated preview next to the capture")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the detection result as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug logging (overrides RUST_LOG)")
                .action(ArgAction::SetTrue),
        )
}

fn parse_corners_arg(s: &str) -> Result<Vec<Point>, String> {
    corners::parse_corner_list(s).map_err(|e| e.to_string())
}

fn parse_display_arg(s: &str) -> Result<Size, String> {
    s.parse::<Size>().map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let config = config::load_config(&config_path)?
        .with_env_overrides()
        .with_api_url_override(matches.get_one::<String>("api-url").cloned());

    if matches.get_flag("write-config") {
        config::save_config(&config_path, &config)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let source = if matches.get_flag("screen") {
        Some(Source::Screen)
    } else {
        matches.get_one::<PathBuf>("image").cloned().map(Source::File)
    };
    let options = RunOptions {
        source,
        display: matches.get_one::<Size>("display").copied(),
        preview: matches.get_flag("preview"),
        json: matches.get_flag("json"),
    };

    let client = DetectionClient::new(&config).context("Failed to set up detection client")?;
    tracing::debug!(endpoint = %client.endpoint(), "detection backend");

    match matches.get_one::<Vec<Point>>("corners") {
        Some(points) => run_once(&config, &client, &options, points).await,
        None => run_interactive(&config, &client, options).await,
    }
}

/// One pass through Capture → Result with corners given on the command line.
async fn run_once(
    config: &Config,
    client: &DetectionClient,
    options: &RunOptions,
    points: &[Point],
) -> Result<()> {
    let Some(source) = &options.source else {
        bail!("--corners needs a photo (--image) or --screen");
    };
    let image = capture(config, source)?;
    let corners = annotate::annotate_from_list(&image, points, options.display)?;

    let outcome = submit(client, &corners).await;
    show(config, options, &image, &corners, &outcome)?;
    if let Err(e) = outcome {
        bail!("Detection failed: {}", e.user_message());
    }
    Ok(())
}

async fn run_interactive(config: &Config, client: &DetectionClient, options: RunOptions) -> Result<()> {
    let mut router = Router::new();
    let mut pending_source = options.source.clone();

    loop {
        match router.screen() {
            Screen::Capture => {
                let source = match pending_source.take() {
                    Some(source) => source,
                    None => match prompt_source()? {
                        Some(source) => source,
                        None => return Ok(()),
                    },
                };
                match capture(config, &source) {
                    Ok(image) => router.on_image_captured(image),
                    Err(e) => {
                        tracing::error!(error = %format!("{:#}", e), "capture failed");
                        println!("Capture failed: {:#}", e);
                    }
                }
            }
            Screen::CornerSelection => {
                let Some(image) = router.captured().cloned() else {
                    router.on_back();
                    continue;
                };
                match annotate::annotate_interactive(&image, options.display)? {
                    AnnotateOutcome::Confirmed(corners) => router.on_corners_confirmed(corners),
                    AnnotateOutcome::Back => router.on_back(),
                }
            }
            Screen::Result => {
                let (Some(image), Some(corners)) =
                    (router.captured().cloned(), router.corners().cloned())
                else {
                    router.on_retry();
                    continue;
                };
                let outcome = submit(client, &corners).await;
                show(config, &options, &image, &corners, &outcome)?;

                let again = Confirm::new()
                    .with_prompt("Capture new image?")
                    .default(true)
                    .interact()
                    .context("Failed to read answer")?;
                if !again {
                    return Ok(());
                }
                router.on_retry();
            }
        }
    }
}

/// `None` when the user quits.
fn prompt_source() -> Result<Option<Source>> {
    let answer: String = Input::new()
        .with_prompt("Image path (empty = capture screen, q = quit)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read image path")?;
    Ok(match answer.trim() {
        "q" | "quit" => None,
        "" => Some(Source::Screen),
        path => Some(Source::File(PathBuf::from(path))),
    })
}

fn capture(config: &Config, source: &Source) -> Result<CapturedImage> {
    match source {
        Source::File(path) => capture::capture_from_file(path, &config.capture_dir, config.jpeg_quality),
        Source::Screen => capture::capture_screen(&config.capture_dir, config.jpeg_quality),
    }
}

async fn submit(client: &DetectionClient, corners: &ChessboardCorners) -> Result<DetectionResult, DetectError> {
    tracing::info!("analyzing chessboard...");
    let outcome = client.detect(corners).await;
    match &outcome {
        Ok(result) => {
            if !fen::check_fen(&result.fen).is_valid() {
                tracing::warn!(fen = %result.fen, "backend returned an unusable FEN");
            }
            if fen::matrix_agrees(result) == Some(false) {
                tracing::warn!(fen = %result.fen, "board matrix disagrees with FEN placement");
            }
        }
        Err(e) => tracing::error!(error = %e, "detection failed"),
    }
    outcome
}

fn show(
    config: &Config,
    options: &RunOptions,
    image: &CapturedImage,
    corners: &ChessboardCorners,
    outcome: &Result<DetectionResult, DetectError>,
) -> Result<()> {
    let rendered = match outcome {
        Ok(result) if options.json => report::render_json(corners, result),
        Err(e) if options.json => report::render_json_error(corners, e),
        _ => Ok(report::render_result(corners, outcome)),
    };
    println!("{}", rendered.context("Failed to serialize result")?);

    if options.preview {
        let canvas = Size::new(config.preview_size, config.preview_size);
        let saved = image
            .decode()
            .and_then(|decoded| preview::save_preview(&decoded, corners, canvas));
        match saved {
            Ok(path) if !options.json => println!("Preview: {}", path.display()),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %format!("{:#}", e), "could not save preview"),
        }
    }
    Ok(())
}
