//! Manifest loading and sprite frame resolution

use anyhow::{Context, Result, anyhow};
use clap::Args;
use frame_models::DirectoryArchive;
use serde::Deserialize;
use sprite_models::frame::frame_from_char;
use sprite_models::generation::record_meshes;
use sprite_models::{
    ClassResolver, ClassTable, GenerationSource, ModelGeneration, RenderSettings, SpriteId,
};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::{add_table_row, create_table, format_flags, format_frame, frame_letter};

#[derive(Args)]
pub struct ResolveArgs {
    /// JSON manifest with classes, sprites, voxels and model definitions
    pub manifest: PathBuf,

    /// Directory used as the resource archive (defaults to the manifest's directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Actor class to resolve; omit to list classes with models
    #[arg(short, long)]
    pub class: Option<String>,

    /// Restrict to one sprite
    #[arg(short, long)]
    pub sprite: Option<String>,

    /// Frame letters to resolve, e.g. "ABCD"
    #[arg(short, long)]
    pub frames: Option<String>,

    /// Resolve the dropped variant of voxel replacements
    #[arg(long)]
    pub dropped: bool,

    /// Ignore voxel replacements
    #[arg(long)]
    pub no_voxels: bool,
}

/// Everything a generation is loaded from
#[derive(Debug, Deserialize)]
struct Manifest {
    classes: ClassTable,
    #[serde(flatten)]
    source: GenerationSource,
    #[serde(default)]
    settings: RenderSettings,
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid manifest {}", path.display()))
}

pub fn execute(args: &ResolveArgs) -> Result<()> {
    let manifest = read_manifest(&args.manifest)?;
    let root = match &args.root {
        Some(root) => root.clone(),
        None => args
            .manifest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    };
    let archive = DirectoryArchive::open(&root)
        .with_context(|| format!("Failed to read directory {}", root.display()))?;

    let mut generation =
        ModelGeneration::load(&archive, &manifest.classes, &manifest.source, manifest.settings);
    if args.no_voxels {
        generation.set_settings(RenderSettings {
            draw_voxels: false,
            ..manifest.settings
        });
    }

    let summary = generation.summary();
    println!(
        "Generation {}: {} meshes, {} voxel records, {} model records, {} skipped definitions",
        generation.generation(),
        summary.meshes,
        summary.voxel_records,
        summary.definition_records,
        summary.skipped_definitions
    );

    match &args.class {
        Some(class) => resolve_class(&generation, &manifest, class, args),
        None => {
            list_classes(&generation, &manifest.classes);
            Ok(())
        }
    }
}

fn list_classes(generation: &ModelGeneration, classes: &ClassTable) {
    let mut table = create_table(&["Class", "Has model"]);
    for i in 0..classes.len() {
        let id = sprite_models::ClassId(i as u32);
        let name = classes.name(id).unwrap_or_default().to_string();
        let has_model = if generation.has_model(id) { "yes" } else { "no" };
        add_table_row(&mut table, vec![name, has_model.to_string()]);
    }
    table.printstd();
}

fn resolve_class(
    generation: &ModelGeneration,
    manifest: &Manifest,
    class_name: &str,
    args: &ResolveArgs,
) -> Result<()> {
    let class = manifest
        .classes
        .resolve(class_name)
        .ok_or_else(|| anyhow!("Unknown actor class '{class_name}'"))?;

    let sprites: Vec<SpriteId> = match &args.sprite {
        Some(name) => vec![
            manifest
                .source
                .sprites
                .find(name)
                .ok_or_else(|| anyhow!("Unknown sprite '{name}'"))?,
        ],
        None => manifest.source.sprites.iter().map(|(id, _)| id).collect(),
    };

    let wanted: Option<Vec<u8>> = match &args.frames {
        Some(letters) => Some(
            letters
                .chars()
                .map(|ch| frame_from_char(ch).ok_or_else(|| anyhow!("Invalid frame character '{ch}'")))
                .collect::<Result<_>>()?,
        ),
        None => None,
    };

    let mut table = create_table(&["Sprite", "Frame", "Record", "Meshes", "Slot frames", "Flags"]);
    let mut found = 0;
    for sprite in sprites {
        let Some(def) = manifest.source.sprites.get(sprite) else {
            continue;
        };
        let frames = wanted
            .clone()
            .unwrap_or_else(|| (0..def.frames.len().min(29)).map(|f| f as u8).collect());

        for frame in frames {
            let Some(id) = generation.find_id(class, sprite, frame, args.dropped) else {
                continue;
            };
            let Some(record) = generation.index().get(id) else {
                continue;
            };
            let meshes: Vec<String> = record_meshes(record)
                .filter_map(|mesh| generation.registry().get(mesh))
                .map(|mesh| mesh.file_name().to_string())
                .collect();
            let slot_frames: Vec<String> = record
                .used_slots()
                .map(|(slot, model)| format!("{slot}:{}", format_frame(model.frame)))
                .collect();

            add_table_row(
                &mut table,
                vec![
                    def.name.clone(),
                    frame_letter(frame).to_string(),
                    id.0.to_string(),
                    meshes.join(", "),
                    slot_frames.join(" "),
                    format_flags(record.flags),
                ],
            );
            found += 1;
        }
    }

    if found == 0 {
        println!("No model associations for '{class_name}'");
    } else {
        table.printstd();
    }
    Ok(())
}
