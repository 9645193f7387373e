use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::{BackendKind, GeometryRequest, PlaybackPhase, PropertyMask, Vec2};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use widget::{Config, RenderCommand, ThemeData, Transform, VideoComponent, create_backend};

#[derive(Parser)]
#[command(name = "vidpreview")]
#[command(about = "Preview host for the looping video widget", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/vidwidget/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the widget with a clip and print state changes
    Play(PlayArgs),

    /// Resolve a size request against a native video size
    Geometry {
        /// Native size, e.g. 1920x1080
        #[arg(long, value_parser = parse_size)]
        native: Vec2,

        /// Resize target; 0 on an axis keeps the aspect ratio
        #[arg(long, value_parser = parse_size, conflicts_with = "max_size")]
        resize: Option<Vec2>,

        /// Bounding box to fit into
        #[arg(long, value_parser = parse_size)]
        max_size: Option<Vec2>,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[derive(Args)]
struct PlayArgs {
    /// Video file
    video: String,

    /// Fallback image
    #[arg(short, long)]
    image: Option<String>,

    /// Start delay in milliseconds (overrides config and theme)
    #[arg(short, long)]
    delay_ms: Option<u64>,

    /// Theme file to apply before playing
    #[arg(long)]
    theme: Option<PathBuf>,

    /// Theme view holding the element
    #[arg(long, default_value = "detailed")]
    view: String,

    /// Theme element name
    #[arg(long, default_value = "md_video")]
    element: String,

    /// Decoder backend (software, hardware)
    #[arg(short, long)]
    backend: Option<String>,

    /// How long to run
    #[arg(short, long, default_value = "5")]
    seconds: f32,

    /// Update rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Resize target, e.g. 640x0
    #[arg(long, value_parser = parse_size, conflicts_with = "max_size")]
    resize: Option<Vec2>,

    /// Bounding box, e.g. 640x480
    #[arg(long, value_parser = parse_size)]
    max_size: Option<Vec2>,

    /// Origin, e.g. 0.5,0.5
    #[arg(long, value_parser = parse_origin)]
    origin: Option<Vec2>,

    /// Print status lines as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct GeometryReport {
    request: GeometryRequest,
    native: Vec2,
    size: Vec2,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.as_str()),
    )
    .init();

    match cli.command {
        Commands::Play(args) => run_play(&config, args).await,
        Commands::Geometry {
            native,
            resize,
            max_size,
        } => run_geometry(native, resize, max_size),
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_play(config: &Config, args: PlayArgs) -> Result<()> {
    let kind = match &args.backend {
        Some(name) => BackendKind::from_name(name)
            .with_context(|| format!("Unknown backend: {} (expected software or hardware)", name))?,
        None => config.backend_kind(),
    };

    let mut video = VideoComponent::new(create_backend(kind))
        .with_path_resolver(config.path_resolver())
        .with_settings(config.to_settings())
        .with_fade_duration(config.fade_duration());

    if let Some(theme_path) = &args.theme {
        let theme = ThemeData::load_from_path(theme_path)?;
        if !video.apply_theme(&theme, &args.view, &args.element, PropertyMask::ALL) {
            log::warn!(
                "Theme element {}.{} not applied",
                args.view,
                args.element
            );
        }
    }

    if let Some(ms) = args.delay_ms {
        let mut settings = video.settings().clone();
        settings.start_delay = Duration::from_millis(ms);
        video.set_settings(settings);
    }

    if let Some(size) = args.resize {
        video.set_resize(size.x, size.y);
    } else if let Some(bounds) = args.max_size {
        video.set_max_size(bounds.x, bounds.y);
    }
    if let Some(origin) = args.origin {
        video.set_origin(origin.x, origin.y);
    }
    if let Some(image) = &args.image {
        video.set_image(image);
    }

    log::debug!("Help prompts: {:?}", video.help_prompts());

    if !video.set_video(&args.video) {
        log::warn!("{} is not playable, showing the fallback image", args.video);
    }

    let frame_time = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let run_for = Duration::try_from_secs_f32(args.seconds.max(0.0)).unwrap_or(Duration::ZERO);

    let mut interval = tokio::time::interval(frame_time);
    let started = Instant::now();
    let mut last_tick = started;
    let mut last_phase: Option<PlaybackPhase> = None;
    let mut last_layer = "";

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }

        let now = Instant::now();
        video.update(now - last_tick);
        last_tick = now;

        let command = video.render(&Transform::IDENTITY);
        let phase = video.phase();
        if last_phase != Some(phase) || command.kind() != last_layer {
            report(&video, &command, now - started, args.json)?;
            last_phase = Some(phase);
            last_layer = command.kind();
        }

        if now - started >= run_for {
            break;
        }
    }

    video.on_hide();
    report(
        &video,
        &video.render(&Transform::IDENTITY),
        started.elapsed(),
        args.json,
    )?;

    Ok(())
}

fn report(
    video: &VideoComponent,
    command: &RenderCommand,
    at: Duration,
    json: bool,
) -> Result<()> {
    let status = video.status();
    if json {
        println!("{}", serde_json::to_string(&status)?);
        return Ok(());
    }

    let layer = match command {
        RenderCommand::Nothing => "nothing".to_string(),
        RenderCommand::Fallback(draw) => format!(
            "fallback {} at {:.0},{:.0} ({:.0}x{:.0})",
            draw.path.display(),
            draw.rect.top_left.x,
            draw.rect.top_left.y,
            draw.rect.size.x,
            draw.rect.size.y
        ),
        RenderCommand::Video(draw) => format!(
            "video at {:.0},{:.0} ({:.0}x{:.0}, opacity {})",
            draw.rect.top_left.x,
            draw.rect.top_left.y,
            draw.rect.size.x,
            draw.rect.size.y,
            draw.opacity
        ),
    };

    let phase = format!("{:?}", status.phase);
    println!(
        "{:>7.2}s  {:<12}  loops={}  {}",
        at.as_secs_f32(),
        phase,
        status.loops,
        layer
    );
    Ok(())
}

fn run_geometry(native: Vec2, resize: Option<Vec2>, max_size: Option<Vec2>) -> Result<()> {
    let request = match (resize, max_size) {
        (Some(target), _) => GeometryRequest::ResizeTo(target),
        (None, Some(bounds)) => GeometryRequest::MaxSize(bounds),
        (None, None) => GeometryRequest::None,
    };

    let size = widget::geometry::resolve(request, Some(native))?;
    let report = GeometryReport {
        request,
        native,
        size,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Parse `WIDTHxHEIGHT`
fn parse_size(s: &str) -> Result<Vec2, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Invalid size: {} (expected WIDTHxHEIGHT)", s))?;
    let w: f32 = w.trim().parse().map_err(|_| format!("Invalid width: {}", w))?;
    let h: f32 = h.trim().parse().map_err(|_| format!("Invalid height: {}", h))?;
    if w < 0.0 || h < 0.0 {
        return Err(format!("Size must not be negative: {}", s));
    }
    Ok(Vec2::new(w, h))
}

/// Parse `X,Y`
fn parse_origin(s: &str) -> Result<Vec2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("Invalid origin: {} (expected X,Y)", s))?;
    let x: f32 = x.trim().parse().map_err(|_| format!("Invalid x: {}", x))?;
    let y: f32 = y.trim().parse().map_err(|_| format!("Invalid y: {}", y))?;
    Ok(Vec2::new(x, y))
}
