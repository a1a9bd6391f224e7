// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Workbench
//!
//! Inspect what the descriptor core makes of a `prism.toml` without starting the renderer.
//!
//! - `layouts` prints every shared layout, who uses it, and each pipeline's push constants.
//! - `simulate` allocates every pipeline's sets for a few frames and shows pool growth.  Run it
//!   twice to see the warm start.
//! - `capacity` prints the persisted capacity file.
//!
//! Logging follows `RUST_LOG`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prism_lib::{
    self as prism,
    assets::AssetDirs,
    config::CONFIG_FILE,
    prelude::*,
    vulkan::{
        binding::stage_names, capacity::PersistedCapacity, context::VkContext,
        headless::HeadlessDevice, layout::LayoutSet,
    },
};

#[derive(Parser, Debug)]
#[command(name = "workbench")]
#[command(about = "Inspect descriptor layouts and pool sizing for a renderer configuration.", long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Renderer configuration
    #[arg(long, short, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print shared layouts and their users
    Layouts,
    /// Allocate every pipeline's sets and report pool growth
    Simulate(SimulateArgs),
    /// Show the persisted descriptor capacity
    Capacity,
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// How many times every pipeline's sets are allocated
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Use a real Vulkan device instead of the headless one
    #[arg(long)]
    gpu: bool,
}

#[derive(Debug, thiserror::Error)]
enum WorkbenchError {
    #[error("{0}")]
    Prism(#[from] prism::PrismError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("no command given")]
    NoCommand,
}

fn main() -> Result<(), WorkbenchError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RendererConfig::load(&args.config)?;

    match args.command {
        None => Err(WorkbenchError::NoCommand),
        Some(Command::Layouts) => cmd_layouts(&config),
        Some(Command::Simulate(a)) => cmd_simulate(&config, a),
        Some(Command::Capacity) => cmd_capacity(&config.capacity_file()),
    }
}

fn build_layouts(config: &RendererConfig) -> Result<LayoutSet, PrismError> {
    let assets = AssetDirs::new();
    PipelineCatalog::new().build(config, &assets)
}

fn cmd_layouts(config: &RendererConfig) -> Result<(), WorkbenchError> {
    let set = build_layouts(config)?;

    for (i, info) in set.layouts().iter().enumerate() {
        println!("layout#{i} {}", info.signature());
        for b in info.bindings() {
            println!(
                "  binding {} {}[{}] {}",
                b.binding,
                b.kind,
                b.count,
                stage_names(b.stages)
            );
        }
        let users: Vec<String> = info
            .users()
            .iter()
            .map(|u| format!("{}:{}", u.pipeline, u.set))
            .collect();
        println!("  users: {}", users.join(", "));
    }

    for pipeline in set.pipelines() {
        let ids = set.pipeline_layouts(pipeline)?;
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let push = set.push_constant_range(pipeline)?;
        print!("pipeline {pipeline}: [{}]", ids.join(", "));
        if push.is_empty() {
            println!();
        } else {
            println!(
                " push constants {}..{} {}",
                push.offset,
                push.offset + push.size,
                stage_names(push.stages)
            );
        }
    }
    Ok(())
}

fn cmd_simulate(config: &RendererConfig, args: SimulateArgs) -> Result<(), WorkbenchError> {
    let set = build_layouts(config)?;
    let capacity_file = config.capacity_file();

    if args.gpu {
        let context = VkContext::new().map_err(PrismError::from)?;
        let result = simulate(context.device(), set, &capacity_file, args.frames);
        context.destroy();
        result
    } else {
        simulate(&HeadlessDevice::new(), set, &capacity_file, args.frames)
    }
}

fn simulate<D: DescriptorDevice>(
    device: &D,
    set: LayoutSet,
    capacity_file: &Path,
    frames: u32,
) -> Result<(), WorkbenchError> {
    let pipelines: Vec<String> = set.pipelines().map(str::to_owned).collect();
    let mut core = DescriptorCore::startup(device, set, capacity_file)?;

    // The core owns device objects, so it is shut down even when a frame fails.
    if let Err(e) = run_frames(device, &mut core, &pipelines, frames) {
        core.shutdown(device)?;
        return Err(e);
    }

    for (i, pool) in core.allocator().pools().iter().enumerate() {
        println!("pool {i}: capacity {} remaining {}", pool.capacity, pool.remaining);
    }

    match core.shutdown(device)? {
        Some(persisted) => println!(
            "persisted {} to {}",
            persisted.counts,
            capacity_file.display()
        ),
        None => println!("nothing allocated, capacity file untouched"),
    }
    Ok(())
}

fn run_frames<D: DescriptorDevice>(
    device: &D,
    core: &mut DescriptorCore,
    pipelines: &[String],
    frames: u32,
) -> Result<(), WorkbenchError> {
    for frame in 0..frames {
        let before = core.allocator().pools().len();
        for pipeline in pipelines {
            core.allocate_pipeline(device, pipeline)?;
        }
        let after = core.allocator().pools().len();
        println!(
            "frame {frame}: pools {before} -> {after}, allocated {}",
            core.allocator().allocated()
        );
    }
    Ok(())
}

fn cmd_capacity(path: &Path) -> Result<(), WorkbenchError> {
    match PersistedCapacity::load(path) {
        Some(capacity) => {
            println!("{}", path.display());
            print!("{}", capacity.to_text());
        }
        None => println!("no usable capacity file at {}", path.display()),
    }
    Ok(())
}
