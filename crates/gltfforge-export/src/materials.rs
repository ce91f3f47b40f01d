//! Material translation
//!
//! Maps an engine material property set onto glTF PBR factors, textures, and
//! KHR_materials_* extension payloads. Glossiness workflows convert to
//! roughness here (value flip; the texture repack lives in the texture
//! exporter). HDR emission splits into a clamped factor plus
//! KHR_materials_emissive_strength.

use tracing::warn;

use gltfforge_core::{AlphaSource, Color, MaterialSource, TextureRef, Workflow};
use gltfforge_schema::extensions::{
    KhrMaterialsEmissiveStrength, KhrMaterialsIor, KhrMaterialsIridescence, KhrMaterialsSpecular,
    KhrMaterialsTransmission, KhrMaterialsVolume, KhrTextureTransform,
};
use gltfforge_schema::{
    AlphaMode, Material, MaterialId, NormalTextureInfo, OcclusionTextureInfo,
    PbrMetallicRoughness, TextureInfo,
};

use crate::textures::TextureSlot;
use crate::{ExportResult, GltfExporter};

/// Split an HDR emission color into a clamped factor and a strength
/// multiplier. Colors within [0, 1] pass through with strength 1.
pub(crate) fn decompose_emission(color: Color) -> ([f32; 3], f32) {
    let strength = color.max_rgb();
    if strength > 1.0 {
        (
            [
                color.r / strength,
                color.g / strength,
                color.b / strength,
            ],
            strength,
        )
    } else {
        (color.to_rgb_array(), 1.0)
    }
}

impl GltfExporter<'_> {
    pub(crate) fn export_material(&mut self, index: usize) -> ExportResult<MaterialId> {
        if let Some(&id) = self.material_ids.get(&index) {
            return Ok(id);
        }
        let source = self.source;
        let Some(mat_src) = source.materials.get(index) else {
            warn!(material = index, "material index out of range, substituting default");
            return self.export_default_material();
        };

        let mut material = Material::new(mat_src.name.as_str());
        if !self.options.export_names {
            material.name = None;
        }

        let mut pbr = PbrMetallicRoughness {
            base_color_factor: mat_src.base_color.to_array(),
            ..Default::default()
        };
        if let Some(tex_ref) = &mat_src.base_color_texture {
            pbr.base_color_texture = self.export_texture_info(tex_ref, TextureSlot::BaseColor)?;
        }

        match &mat_src.workflow {
            Workflow::MetallicRoughness {
                metallic,
                roughness,
                texture,
            } => {
                pbr.metallic_factor = *metallic;
                pbr.roughness_factor = *roughness;
                if let Some(tex_ref) = texture {
                    pbr.metallic_roughness_texture =
                        self.export_texture_info(tex_ref, TextureSlot::MetallicRoughness)?;
                }
            }
            Workflow::MetallicGloss {
                metallic,
                glossiness,
                texture,
            } => {
                pbr.metallic_factor = *metallic;
                pbr.roughness_factor = 1.0 - glossiness;
                if let Some(tex_ref) = texture {
                    pbr.metallic_roughness_texture =
                        self.export_texture_info(tex_ref, TextureSlot::MetallicGloss)?;
                }
            }
        }
        material.pbr_metallic_roughness = Some(pbr);

        if let Some(tex_ref) = &mat_src.normal_texture {
            if let Some(info) = self.export_texture_info(tex_ref, TextureSlot::Normal)? {
                material.normal_texture = Some(NormalTextureInfo {
                    index: info.index,
                    tex_coord: info.tex_coord,
                    scale: mat_src.normal_scale,
                    extensions: info.extensions,
                });
            }
        }
        if let Some(tex_ref) = &mat_src.occlusion_texture {
            if let Some(info) = self.export_texture_info(tex_ref, TextureSlot::Occlusion)? {
                material.occlusion_texture = Some(OcclusionTextureInfo {
                    index: info.index,
                    tex_coord: info.tex_coord,
                    strength: mat_src.occlusion_strength,
                    extensions: info.extensions,
                });
            }
        }

        let (emissive_factor, emissive_strength) = decompose_emission(mat_src.emissive);
        material.emissive_factor = emissive_factor;
        if emissive_strength > 1.0 {
            material.extensions.insert(Box::new(KhrMaterialsEmissiveStrength {
                emissive_strength,
            }));
            self.root
                .declare_extension(KhrMaterialsEmissiveStrength::NAME, false);
        }
        if let Some(tex_ref) = &mat_src.emissive_texture {
            material.emissive_texture = self.export_texture_info(tex_ref, TextureSlot::Emissive)?;
        }

        match mat_src.alpha {
            AlphaSource::Opaque => {}
            AlphaSource::Mask { cutoff } => {
                material.alpha_mode = AlphaMode::Mask;
                material.alpha_cutoff = cutoff;
            }
            AlphaSource::Blend => material.alpha_mode = AlphaMode::Blend,
        }
        material.double_sided = mat_src.double_sided;

        self.attach_material_extensions(&mut material, mat_src);

        let id = MaterialId(self.root.materials.len());
        self.root.materials.push(material);
        self.material_ids.insert(index, id);
        Ok(id)
    }

    /// Properties beyond core PBR become extension payloads, each declared
    /// in extensionsUsed
    fn attach_material_extensions(&mut self, material: &mut Material, mat_src: &MaterialSource) {
        if let Some(transmission_factor) = mat_src.transmission {
            material.extensions.insert(Box::new(KhrMaterialsTransmission {
                transmission_factor,
                transmission_texture: None,
            }));
            self.root
                .declare_extension(KhrMaterialsTransmission::NAME, false);
        }
        if let Some(ior) = mat_src.ior {
            material.extensions.insert(Box::new(KhrMaterialsIor { ior }));
            self.root.declare_extension(KhrMaterialsIor::NAME, false);
        }
        if let Some(specular) = &mat_src.specular {
            material.extensions.insert(Box::new(KhrMaterialsSpecular {
                specular_factor: specular.factor,
                specular_color_factor: specular.color.to_rgb_array(),
            }));
            self.root.declare_extension(KhrMaterialsSpecular::NAME, false);
        }
        if let Some(volume) = &mat_src.volume {
            material.extensions.insert(Box::new(KhrMaterialsVolume {
                thickness_factor: volume.thickness,
                thickness_texture: None,
                attenuation_distance: (volume.attenuation_distance > 0.0)
                    .then_some(volume.attenuation_distance),
                attenuation_color: volume.attenuation_color.to_rgb_array(),
            }));
            self.root.declare_extension(KhrMaterialsVolume::NAME, false);
        }
        if let Some(iridescence) = &mat_src.iridescence {
            material.extensions.insert(Box::new(KhrMaterialsIridescence {
                iridescence_factor: iridescence.factor,
                iridescence_ior: iridescence.ior,
                iridescence_thickness_minimum: iridescence.thickness_min,
                iridescence_thickness_maximum: iridescence.thickness_max,
                ..Default::default()
            }));
            self.root
                .declare_extension(KhrMaterialsIridescence::NAME, false);
        }
    }

    /// Export a texture reference into a TextureInfo, attaching
    /// KHR_texture_transform when the reference carries tiling or offset
    pub(crate) fn export_texture_info(
        &mut self,
        tex_ref: &TextureRef,
        slot: TextureSlot,
    ) -> ExportResult<Option<TextureInfo>> {
        let Some(texture_id) = self.export_texture(tex_ref.texture, slot)? else {
            return Ok(None);
        };

        let mut info = TextureInfo::new(texture_id);
        info.tex_coord = tex_ref.uv_set;
        if tex_ref.has_transform() {
            // UV origin differs between conventions: offset.y mirrors
            let offset_y = 1.0 - tex_ref.offset.y - tex_ref.tiling.y;
            info.extensions.insert(Box::new(KhrTextureTransform::new(
                [tex_ref.tiling.x, tex_ref.tiling.y],
                [tex_ref.offset.x, offset_y],
            )));
            self.root.declare_extension(KhrTextureTransform::NAME, false);
        }
        Ok(Some(info))
    }

    /// Fallback material for out-of-range references, exported once
    fn export_default_material(&mut self) -> ExportResult<MaterialId> {
        if let Some(id) = self.default_material {
            return Ok(id);
        }
        let mut material = Material::new("Default");
        material.pbr_metallic_roughness = Some(PbrMetallicRoughness {
            metallic_factor: 0.0,
            roughness_factor: 0.5,
            ..Default::default()
        });
        let id = MaterialId(self.root.materials.len());
        self.root.materials.push(material);
        self.default_material = Some(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_ldr_emission_passthrough() {
        let (factor, strength) = decompose_emission(Color::rgb(0.5, 0.25, 1.0));
        assert_eq!(factor, [0.5, 0.25, 1.0]);
        assert_eq!(strength, 1.0);
    }

    #[test]
    fn test_decompose_hdr_emission() {
        let (factor, strength) = decompose_emission(Color::rgb(4.0, 2.0, 0.0));
        assert_eq!(strength, 4.0);
        assert_eq!(factor, [1.0, 0.5, 0.0]);
    }
}
