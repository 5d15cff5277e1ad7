use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use thumbkit::{
    AlphaPassthrough, AspectRatio, Compositor, DirFontProvider, DirectorySink, DownloadSink,
    EditorConfig, ExportOutcome, FontGate, RenderOutcome, RenderTarget, SceneDef, SessionStore,
    encode_png, export_dimensions, export_file_name, preview_box, preview_scale,
};

#[derive(Parser, Debug)]
#[command(name = "thumbkit", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene document and write the PNG.
    Export(ExportArgs),
    /// Print export and preview dimensions per aspect ratio.
    Dims(DimsArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Scene document (JSON). Image paths are relative to its directory.
    #[arg(long)]
    scene: PathBuf,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Editor configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render at preview size instead of export size.
    #[arg(long)]
    preview: bool,
}

#[derive(Parser, Debug)]
struct DimsArgs {
    /// Only this aspect ratio (16:9, 1:1 or 9:16).
    #[arg(long)]
    aspect: Option<AspectRatio>,

    /// Editor configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Dims(args) => cmd_dims(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    let cfg = match path {
        Some(p) => EditorConfig::from_path(p)
            .with_context(|| format!("load config '{}'", p.display()))?,
        None => EditorConfig::default(),
    };
    Ok(cfg.with_env_overrides())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let def = SceneDef::from_path(&args.scene)
        .with_context(|| format!("load scene '{}'", args.scene.display()))?;
    let root = args.scene.parent().unwrap_or_else(|| Path::new("."));
    let loaded = def.load_assets(root)?;

    let mut store = SessionStore::new(cfg.clone())?;
    store.apply_def(&loaded);
    if !store.export_available()
        && let Some(original) = loaded.original.clone()
    {
        pollster::block_on(store.ingest_image(original, &AlphaPassthrough));
    }
    if !store.export_available() {
        anyhow::bail!("scene has no usable subject (set `cutout` or a decodable `original`)");
    }

    let mut fonts = FontGate::new(DirFontProvider::from_config(&cfg.fonts)?);
    let mut compositor = Compositor::from_config(&cfg)?;
    let mut sink = DirectorySink::new(&args.out_dir);

    if args.preview {
        let scene = store.snapshot();
        let outcome = pollster::block_on(compositor.render(
            &scene,
            RenderTarget::Preview,
            &mut fonts,
        ))?;
        let rendered = match outcome {
            RenderOutcome::Rendered(r) => r,
            RenderOutcome::Unavailable => anyhow::bail!("export unavailable"),
            RenderOutcome::Aborted(reason) => anyhow::bail!("preview aborted: {reason}"),
        };
        let name = export_file_name(&cfg.export_file_prefix, scene.aspect_ratio)
            .replace(".png", "-preview.png");
        sink.deliver(&name, &encode_png(&rendered.frame)?)?;
    } else {
        match pollster::block_on(store.export(&mut compositor, &mut fonts, &mut sink))? {
            ExportOutcome::Exported(_) => {}
            ExportOutcome::Unavailable => anyhow::bail!("export unavailable"),
            ExportOutcome::Aborted(reason) => anyhow::bail!("export aborted: {reason}"),
        }
    }

    for path in sink.written() {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_dims(args: DimsArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let ratios = match args.aspect {
        Some(ar) => vec![ar],
        None => AspectRatio::ALL.to_vec(),
    };
    for ar in ratios {
        let export = export_dimensions(ar);
        let preview = preview_box(ar, cfg.preview_bounds);
        println!(
            "{ar}\texport {}x{}\tpreview {}x{}\tscale {}",
            export.width,
            export.height,
            preview.width,
            preview.height,
            preview_scale(ar, cfg.preview_bounds)
        );
    }
    Ok(())
}
