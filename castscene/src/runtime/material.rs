use std::path::{Path, PathBuf};

use crate::host::report;
use crate::{Material, MaterialDesc, MaterialKind, SceneHost, TextureSlot};

pub const DEFAULT_MATERIAL_NAME: &str = "CastMaterial";

/// Resolves a texture path against the directory of the document that references it.
pub fn resolve_asset_path(document: &Path, asset: &str) -> PathBuf {
    let asset = Path::new(asset);
    if asset.is_absolute() {
        return asset.to_path_buf();
    }
    document
        .parent()
        .map_or_else(|| asset.to_path_buf(), |dir| dir.join(asset))
}

pub fn material_desc(material: &Material<'_>, document: &Path) -> MaterialDesc {
    let kind = MaterialKind::from_type(material.material_type());
    let textures = material
        .slots()
        .into_iter()
        .filter_map(|(slot, file)| {
            let path = file.path()?;
            Some(TextureSlot {
                slot: slot.to_string(),
                path: resolve_asset_path(document, path),
                input: kind.input_for_slot(slot),
                enable_flag: kind.enable_flag_for_slot(slot),
            })
        })
        .collect();
    MaterialDesc {
        name: material.name().unwrap_or(DEFAULT_MATERIAL_NAME).to_string(),
        kind,
        textures,
    }
}

/// Creates the material unless its shading group already exists. Returns the group name.
pub fn import_material(
    host: &mut dyn SceneHost,
    material: &Material<'_>,
    document: &Path,
) -> Option<String> {
    let desc = material_desc(material, document);
    let group = MaterialDesc::shading_group_name(&desc.name);
    if host.has_shading_group(&group) {
        return Some(group);
    }
    match host.create_material(&desc) {
        Ok(group) => Some(group),
        Err(e) => {
            report(host, format!("Unable to create material {}: {e}", desc.name));
            None
        }
    }
}
