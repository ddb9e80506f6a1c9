use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use ndarray::{Axis, concatenate, s};
use posebatch::{BatchSource as _, DatasetIndex, FlowConfig, IndexFlow, Prefetch, RegisterConfig};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "posebatch", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw one batch and write `images.png` and `stickmen.png`.
    Preview(FlowArgs),
    /// Draw one batch and write its soft masks to `masks.png`.
    Masks(FlowArgs),
    /// Register each sample of one batch onto the next sample's pose; writes `registered.png`.
    Register(RegisterArgs),
}

#[derive(Parser, Debug)]
struct FlowArgs {
    /// Dataset index JSON.
    #[arg(long)]
    index: PathBuf,

    /// Directory receiving the PNGs.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Flow settings JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Samples per batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Target image height.
    #[arg(long)]
    height: Option<usize>,

    /// Target image width.
    #[arg(long)]
    width: Option<usize>,

    /// 1 (grayscale) or 3 (RGB).
    #[arg(long)]
    channels: Option<usize>,

    /// Dataset split to draw from.
    #[arg(long, value_enum, default_value_t = Split::Train)]
    split: Split,

    /// Image directory (defaults to the dataset layout next to the index).
    #[arg(long)]
    image_root: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RegisterArgs {
    #[command(flatten)]
    flow: FlowArgs,

    /// Registration settings JSON.
    #[arg(long)]
    register_config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Split {
    Train,
    Test,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Preview(args) => cmd_preview(args),
        Command::Masks(args) => cmd_masks(args),
        Command::Register(args) => cmd_register(args),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON"))
}

fn flow_config(args: &FlowArgs) -> anyhow::Result<FlowConfig> {
    let mut cfg = match &args.config {
        Some(path) => read_json(path, "flow config")?,
        None => FlowConfig::default(),
    };
    if let Some(v) = args.batch_size {
        cfg.batch_size = v;
    }
    if let Some(v) = args.height {
        cfg.height = v;
    }
    if let Some(v) = args.width {
        cfg.width = v;
    }
    if let Some(v) = args.channels {
        cfg.channels = v;
    }
    if args.image_root.is_some() {
        cfg.image_root.clone_from(&args.image_root);
    }
    cfg.train = args.split == Split::Train;
    Ok(cfg)
}

fn open_flow(args: &FlowArgs, cfg: FlowConfig) -> anyhow::Result<Prefetch<IndexFlow>> {
    let flow = IndexFlow::open(&args.index, cfg)
        .with_context(|| format!("open dataset index '{}'", args.index.display()))?;
    tracing::info!(samples = flow.len(), shape = ?flow.shape(), "opened dataset split");
    Ok(Prefetch::new(flow)?)
}

fn out_path(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output dir '{}'", dir.display()))?;
    Ok(dir.join(name))
}

fn write_plot(batch: ndarray::ArrayView4<'_, f32>, dir: &Path, name: &str) -> anyhow::Result<()> {
    let path = out_path(dir, name)?;
    posebatch::plot_batch(batch, &path)
        .with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_preview(args: FlowArgs) -> anyhow::Result<()> {
    let cfg = flow_config(&args)?;
    let mut flow = open_flow(&args, cfg)?;
    let batch = flow.next_batch()?;
    write_plot(batch.images.view(), &args.out_dir, "images.png")?;
    write_plot(batch.stickmen.view(), &args.out_dir, "stickmen.png")?;
    Ok(())
}

fn cmd_masks(args: FlowArgs) -> anyhow::Result<()> {
    let mut cfg = flow_config(&args)?;
    cfg.apply_mask = true;
    let mut flow = open_flow(&args, cfg)?;
    let batch = flow.next_batch()?;
    let masks = batch
        .masks
        .context("masked flow returned a batch without masks")?;
    // [0, 1] masks onto the [-1, 1] range plot_batch expects
    let masks = masks.mapv(|m| 2.0 * m - 1.0);
    write_plot(masks.view(), &args.out_dir, "masks.png")
}

fn cmd_register(args: RegisterArgs) -> anyhow::Result<()> {
    let register_cfg: RegisterConfig = match &args.register_config {
        Some(path) => read_json(path, "register config")?,
        None => RegisterConfig::default(),
    };
    register_cfg.validate()?;

    let cfg = flow_config(&args.flow)?;
    let shape = cfg.image_shape()?;
    let mut flow = open_flow(&args.flow, cfg)?;
    let batch = flow.next_batch()?;
    let masks = match batch.masks.clone() {
        Some(masks) => masks,
        None => {
            // batch joints are blanked, so render from the full index joints
            let index = DatasetIndex::load(&args.flow.index)
                .with_context(|| format!("load dataset index '{}'", args.flow.index.display()))?;
            index.pose_masks(&batch.indices, shape)?
        }
    };

    // sample i is aligned onto the pose of sample i + 1
    let target = concatenate(
        Axis(0),
        &[batch.joints.slice(s![1.., .., ..]), batch.joints.slice(s![..1, .., ..])],
    )
    .context("rotate target poses")?;

    let out = posebatch::register(
        batch.images.view(),
        masks.view(),
        batch.joints.view(),
        target.view(),
        flow.joint_order(),
        &register_cfg,
    )?;

    let aligned = out.alignments.iter().filter(|a| a.is_aligned()).count();
    let flipped = out.alignments.iter().filter(|a| a.flipped()).count();
    tracing::info!(
        aligned,
        fallback = out.alignments.len() - aligned,
        flipped,
        "registered batch"
    );

    write_plot(out.images.view(), &args.flow.out_dir, "registered.png")
}
