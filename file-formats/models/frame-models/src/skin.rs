//! Skin texture resolution
//!
//! Model files embed skin names as fixed-size strings. The stored extension is
//! unreliable, so a skin is located by stripping it and probing the base name
//! with each supported image extension in turn.

use crate::archive::{ResourceArchive, ResourceId, join_path};

/// Image extensions probed for a skin, in priority order
pub const SKIN_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".tga", ".pcx"];

/// A skin texture bound to a model slot
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkinTexture {
    /// An image resource found in the archive
    Image { resource: ResourceId, name: String },
    /// The palette texture embedded in a voxel model
    VoxelPalette,
}

impl SkinTexture {
    /// Resource backing this skin, if it is an archive image
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::Image { resource, .. } => Some(*resource),
            Self::VoxelPalette => None,
        }
    }
}

/// Strip the extension of the final path component, if any
fn strip_extension(name: &str) -> &str {
    let slash = name.rfind('/');
    match name.rfind('.') {
        Some(dot) if slash.is_none_or(|s| dot > s) => &name[..dot],
        _ => name,
    }
}

/// Locate an image resource by probing each of [`SKIN_EXTENSIONS`] on the
/// base name; the stored extension is ignored
pub fn find_image<A: ResourceArchive + ?Sized>(archive: &A, full_name: &str) -> Option<ResourceId> {
    let base = strip_extension(full_name);
    SKIN_EXTENSIONS
        .iter()
        .find_map(|ext| archive.find(&format!("{base}{ext}")))
}

/// Resolve a skin named relative to a model directory.
///
/// An empty name or a missing file yields `None`; the slot then renders with
/// whatever texture the caller substitutes.
pub fn load_skin<A: ResourceArchive + ?Sized>(
    archive: &A,
    path: &str,
    name: &str,
) -> Option<SkinTexture> {
    if name.is_empty() {
        return None;
    }

    let full_name = join_path(path, name);
    match find_image(archive, &full_name) {
        Some(resource) => {
            log::trace!("Skin '{full_name}' resolved to resource #{}", resource.0);
            Some(SkinTexture::Image {
                resource,
                name: archive.full_name(resource).unwrap_or(&full_name).to_string(),
            })
        }
        None => {
            log::warn!("Unable to load skin '{full_name}'");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;

    #[test]
    fn test_strip_extension_only_in_file_component() {
        assert_eq!(strip_extension("models/imp.v2/skin"), "models/imp.v2/skin");
        assert_eq!(strip_extension("models/imp/skin.pcx"), "models/imp/skin");
        assert_eq!(strip_extension("skin.tga"), "skin");
        assert_eq!(strip_extension("skin"), "skin");
    }

    #[test]
    fn test_probe_order_prefers_png() {
        let mut archive = MemoryArchive::new();
        archive.insert("models/imp/skin.tga", vec![]);
        let png = archive.insert("models/imp/skin.png", vec![]);

        let skin = load_skin(&archive, "models/imp", "skin.pcx").unwrap();
        assert_eq!(skin.resource(), Some(png));
    }

    #[test]
    fn test_stored_extension_does_not_beat_probe_order() {
        let mut archive = MemoryArchive::new();
        archive.insert("models/imp/skin.pcx", vec![]);
        let png = archive.insert("models/imp/skin.png", vec![]);

        let skin = load_skin(&archive, "models/imp", "skin.pcx").unwrap();
        assert_eq!(skin.resource(), Some(png));
        assert_eq!(find_image(&archive, "models/imp/skin.pcx"), Some(png));
    }

    #[test]
    fn test_unlisted_extension_is_not_found() {
        let mut archive = MemoryArchive::new();
        archive.insert("models/imp/skin.bmp", vec![]);

        assert_eq!(load_skin(&archive, "models/imp", "skin.bmp"), None);
    }

    #[test]
    fn test_missing_skin_is_none() {
        let archive = MemoryArchive::new();
        assert_eq!(load_skin(&archive, "models/imp", "skin.pcx"), None);
        assert_eq!(load_skin(&archive, "models/imp", ""), None);
    }
}
