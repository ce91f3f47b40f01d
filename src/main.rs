//! gltfforge CLI
//!
//! Command-line interface for inspecting, validating, and repacking glTF 2.0
//! scene files.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gltfforge_export::{ExportOptions, GltfExporter};
use gltfforge_import::{GltfImporter, ImportOptions};
use gltfforge_schema::{Glb, GltfRoot};

/// gltfforge - bidirectional glTF 2.0 scene serialization toolkit
#[derive(Parser)]
#[command(name = "gltfforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document statistics
    Info(InfoArgs),

    /// Validate container layout and accessor invariants
    Validate(ValidateArgs),

    /// Re-serialize a file through the import/export pipeline
    Repack(RepackArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Input .gltf or .glb file
    input: PathBuf,
}

#[derive(Args)]
struct ValidateArgs {
    /// Input .gltf or .glb file
    input: PathBuf,
}

#[derive(Args)]
struct RepackArgs {
    /// Input .gltf or .glb file
    input: PathBuf,

    /// Output path; .glb writes a binary container, anything else
    /// writes .gltf + .bin
    output: PathBuf,

    /// Build mesh attribute arrays on worker threads
    #[arg(long)]
    multithreaded: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn,gltfforge=info",
        1 => "info,gltfforge=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Info(args) => cmd_info(&args),
        Commands::Validate(args) => cmd_validate(&args),
        Commands::Repack(args) => cmd_repack(&args),
    }
}

fn load_document(path: &PathBuf) -> Result<(GltfRoot, Option<Vec<u8>>)> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if Glb::sniff(&data) {
        let glb = Glb::parse(&data).context("parsing GLB container")?;
        let root = GltfRoot::from_json_slice(&glb.json).context("parsing JSON chunk")?;
        Ok((root, glb.bin))
    } else {
        let root = GltfRoot::from_json_slice(&data).context("parsing glTF JSON")?;
        Ok((root, None))
    }
}

fn cmd_info(args: &InfoArgs) -> Result<()> {
    let (root, bin) = load_document(&args.input)?;

    println!("{}", args.input.display());
    println!("  generator:  {}", root.asset.generator.as_deref().unwrap_or("-"));
    println!("  scenes:     {}", root.scenes.len());
    println!("  nodes:      {}", root.nodes.len());
    println!("  meshes:     {}", root.meshes.len());
    println!("  materials:  {}", root.materials.len());
    println!("  textures:   {}", root.textures.len());
    println!("  images:     {}", root.images.len());
    println!("  accessors:  {}", root.accessors.len());
    println!("  animations: {}", root.animations.len());
    println!("  buffers:    {}", root.buffers.len());
    if let Some(bin) = bin {
        println!("  GLB chunk:  {} bytes", bin.len());
    }
    if !root.extensions_used.is_empty() {
        println!("  extensions: {}", root.extensions_used.join(", "));
    }
    Ok(())
}

fn cmd_validate(args: &ValidateArgs) -> Result<()> {
    let (root, _) = load_document(&args.input)?;

    let mut errors = Vec::new();
    for (index, accessor) in root.accessors.iter().enumerate() {
        let Some(view_id) = accessor.buffer_view else {
            continue;
        };
        match root.buffer_views.get(view_id.index()) {
            Some(view) => {
                if let Err(e) = accessor.validate(index, view) {
                    errors.push(e.to_string());
                }
            }
            None => errors.push(format!("accessor {index}: buffer view {view_id} out of range")),
        }
    }
    for (index, view) in root.buffer_views.iter().enumerate() {
        match root.buffers.get(view.buffer.index()) {
            Some(buffer) => {
                if view.byte_offset + view.byte_length > buffer.byte_length {
                    errors.push(format!("buffer view {index} exceeds buffer length"));
                }
            }
            None => errors.push(format!("buffer view {index}: buffer out of range")),
        }
    }

    if errors.is_empty() {
        println!("{}: OK", args.input.display());
        Ok(())
    } else {
        for error in &errors {
            eprintln!("{error}");
        }
        bail!("{} validation errors", errors.len());
    }
}

fn cmd_repack(args: &RepackArgs) -> Result<()> {
    let scene = GltfImporter::import_file(
        &args.input,
        ImportOptions {
            multithreaded: args.multithreaded,
            ..Default::default()
        },
    )
    .with_context(|| format!("importing {}", args.input.display()))?;

    tracing::info!(
        nodes = scene.node_count(),
        meshes = scene.meshes.len(),
        materials = scene.materials.len(),
        "scene imported"
    );

    let exporter = GltfExporter::new(&scene, ExportOptions::default());
    let document = exporter.export().context("exporting scene")?;

    let is_glb = args
        .output
        .extension()
        .map(|e| e.eq_ignore_ascii_case("glb"))
        .unwrap_or(false);
    if is_glb {
        document.write_glb(&args.output)?;
    } else {
        document.write_gltf(&args.output)?;
    }
    println!("wrote {}", args.output.display());
    Ok(())
}
