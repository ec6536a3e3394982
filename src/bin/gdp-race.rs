use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gdp-race", version, about = "Render a GDP bar-chart race to MP4")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the whole race as an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single year as a PNG.
    Frame(FrameArgs),
    /// Render every animation step as numbered PNGs.
    Frames(FramesArgs),
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Input CSV: one row per country, one column per year.
    #[arg(long, default_value = "gdp.csv")]
    csv: PathBuf,

    /// JSON configuration; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that relative icon paths resolve against.
    /// Defaults to the config file's directory, else the current directory.
    #[arg(long)]
    assets_root: Option<PathBuf>,

    /// Output frame rate: `9/5`, `1.8` or `30`.
    #[arg(long)]
    fps: Option<gdp_race::Fps>,

    /// Extra steps that hold the final year.
    #[arg(long)]
    repeat_frames: Option<u32>,

    /// TrueType/OpenType font for labels and title.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Draw bars and icons only; no font is needed.
    #[arg(long, default_value_t = false)]
    no_text: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output MP4 path.
    #[arg(long, default_value = "gdp_animation.mp4")]
    out: PathBuf,

    /// Fail instead of overwriting an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Year to render.
    #[arg(long)]
    year: i32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct FramesArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory for `frame_NNNN.png` files.
    #[arg(long)]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Frames(args) => cmd_frames(args),
        Command::Config => cmd_config(),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

struct Loaded {
    race: gdp_race::Race,
    renderer: gdp_race::CpuRenderer,
    icons: gdp_race::IconStore,
}

fn load(common: &CommonArgs) -> anyhow::Result<Loaded> {
    let mut cfg = match &common.config {
        Some(path) => gdp_race::RaceConfig::load(path)?,
        None => gdp_race::RaceConfig::default(),
    };
    if let Some(fps) = common.fps {
        cfg.fps = fps;
    }
    if let Some(n) = common.repeat_frames {
        cfg.repeat_frames = n;
    }
    if let Some(font) = &common.font {
        cfg.font = Some(font.clone());
    }
    if common.no_text {
        cfg.draw_text = false;
    }

    let assets_root = match (&common.assets_root, &common.config) {
        (Some(root), _) => root.clone(),
        (None, Some(config)) => config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
        (None, None) => PathBuf::from("."),
    };

    let race = gdp_race::Race::load(&common.csv, cfg)?;
    let icons = race
        .prepare_icons(&assets_root)
        .with_context(|| format!("prepare icons under '{}'", assets_root.display()))?;
    let renderer = gdp_race::CpuRenderer::new(&race.config)?;
    Ok(Loaded {
        race,
        renderer,
        icons,
    })
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let Loaded {
        race,
        mut renderer,
        icons,
    } = load(&args.common)?;

    let opts = gdp_race::RenderToMp4Opts {
        overwrite: !args.no_overwrite,
    };
    let stats = gdp_race::render_to_mp4(&race, &args.out, opts, &mut renderer, &icons)?;

    eprintln!(
        "wrote {} ({} frames, {} rendered)",
        args.out.display(),
        stats.frames_total,
        stats.frames_rendered
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let Loaded {
        race,
        mut renderer,
        icons,
    } = load(&args.common)?;

    let frame = gdp_race::render_frame(&race, args.year, &mut renderer, &icons)?;
    gdp_race::write_png(&args.out, &frame)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let Loaded {
        race,
        mut renderer,
        icons,
    } = load(&args.common)?;

    let stats = gdp_race::render_frames_to_dir(&race, &args.out_dir, &mut renderer, &icons)?;

    eprintln!(
        "wrote {} frames to {}",
        stats.frames_total,
        args.out_dir.display()
    );
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&gdp_race::RaceConfig::default())
        .context("serialize default config")?;
    println!("{json}");
    Ok(())
}
