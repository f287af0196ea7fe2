//! Model file inspection commands

use anyhow::{Context, Result, anyhow};
use frame_models::{
    CanonicalMesh, DirectoryArchive, GeometryHandle, GeometryUploader, InterleavedVertex, MeshId,
    ModelRegistry, SkinTexture,
};
use std::path::{Path, PathBuf};

use crate::utils::{add_table_row, create_table, format_bytes, format_frame};

/// Uploader that only keeps track of what it was given
#[derive(Debug, Default)]
struct SizeUploader {
    buffers: Vec<usize>,
}

impl GeometryUploader for SizeUploader {
    fn upload(&mut self, vertices: &[InterleavedVertex]) -> frame_models::Result<GeometryHandle> {
        self.buffers.push(vertices.len());
        Ok(GeometryHandle((self.buffers.len() - 1) as u64))
    }

    fn release(&mut self, _handle: GeometryHandle) {}
}

/// Index the directory containing `path` and load the model from it
fn open_model(path: &Path) -> Result<(DirectoryArchive, ModelRegistry, MeshId)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid model path: {}", path.display()))?;

    let archive = DirectoryArchive::open(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    let mut registry = ModelRegistry::new();
    let id = registry
        .load_model(&archive, "", file)
        .with_context(|| format!("Failed to load model from {}", path.display()))?;
    Ok((archive, registry, id))
}

fn mesh(registry: &ModelRegistry, id: MeshId) -> Result<&CanonicalMesh> {
    registry
        .get(id)
        .ok_or_else(|| anyhow!("Mesh #{} missing from registry", id.0))
}

pub fn handle_info(path: &Path, show_skins: bool) -> Result<()> {
    let (_archive, registry, id) = open_model(path)?;
    let mesh = mesh(&registry, id)?;

    println!("=== Model Information ===");
    println!("File: {}", path.display());
    println!("Format: {}", mesh.format());
    println!("Frames: {}", mesh.frame_count());

    if let Some(info) = mesh.info() {
        println!("Skin size: {}x{}", info.skin_width, info.skin_height);
        println!("Vertices: {}", info.num_vertices);
        println!("Texture coordinates: {}", info.num_tex_coords);
        if let Some(lod) = info.active_lod() {
            println!("Triangles: {}", lod.num_triangles);
            println!("GL commands: {}", lod.num_gl_commands);
        }
        println!("Levels of detail: {}", info.lods.len());
        println!("Frame size: {}", format_bytes(info.frame_size as u64));
    }
    if mesh.palette().is_some() {
        println!("Palette: embedded");
    }

    if show_skins {
        let mut table = create_table(&["Slot", "Skin"]);
        for (slot, skin) in mesh.skins().iter().enumerate() {
            let name = match skin {
                Some(SkinTexture::Image { name, .. }) => name.clone(),
                Some(SkinTexture::VoxelPalette) => "(voxel palette)".to_string(),
                None => "(missing)".to_string(),
            };
            add_table_row(&mut table, vec![slot.to_string(), name]);
        }
        table.printstd();
    } else {
        println!("Skins: {}", mesh.skins().len());
    }

    Ok(())
}

pub fn handle_frames(path: &Path, filter: Option<&str>) -> Result<()> {
    let (_archive, registry, id) = open_model(path)?;
    let mesh = mesh(&registry, id)?;
    let prefix = filter.map(str::to_ascii_lowercase);

    let mut table = create_table(&["Index", "Name"]);
    let mut shown = 0;
    for (index, frame) in mesh.frames().iter().enumerate() {
        if let Some(prefix) = &prefix
            && !frame.name.to_ascii_lowercase().starts_with(prefix.as_str())
        {
            continue;
        }
        add_table_row(&mut table, vec![format_frame(Some(index)), frame.name.clone()]);
        shown += 1;
    }
    table.printstd();
    println!("{shown} of {} frames", mesh.frame_count());

    Ok(())
}

pub fn handle_build(files: &[PathBuf], root: Option<&Path>) -> Result<()> {
    let mut table = create_table(&["Model", "Format", "Frames", "Vertices", "Per frame", "Size"]);
    let mut failures = 0;

    for file in files {
        let (archive, mut registry, id) = match root {
            Some(root) => {
                let archive = DirectoryArchive::open(root)
                    .with_context(|| format!("Failed to read directory {}", root.display()))?;
                let mut registry = ModelRegistry::new();
                let name = file.to_string_lossy().replace('\\', "/");
                let id = registry
                    .load_model(&archive, "", &name)
                    .with_context(|| format!("Failed to load model {name}"))?;
                (archive, registry, id)
            }
            None => open_model(file)?,
        };

        let mut uploader = SizeUploader::default();
        let mesh = registry
            .get_mut(id)
            .ok_or_else(|| anyhow!("Mesh #{} missing from registry", id.0))?;
        if let Err(err) = mesh.build_geometry(&archive, &mut uploader) {
            log::error!("{}: {err}", file.display());
            failures += 1;
            continue;
        }

        let vertices = uploader.buffers.first().copied().unwrap_or(0);
        let bytes = vertices * std::mem::size_of::<InterleavedVertex>();
        add_table_row(
            &mut table,
            vec![
                file.display().to_string(),
                mesh.format().to_string(),
                mesh.frame_count().to_string(),
                vertices.to_string(),
                mesh.vertices_per_frame().to_string(),
                format_bytes(bytes as u64),
            ],
        );
    }

    table.printstd();
    if failures > 0 {
        return Err(anyhow!("{failures} model(s) failed to build"));
    }
    Ok(())
}
