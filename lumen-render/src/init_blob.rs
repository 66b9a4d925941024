//! Serialization of a [`PhotonMappingRenderer`]'s opaque init-data blob
//! (spec.md §6 "Persisted renderer state": "4-byte little-endian length N,
//! then N bytes opaque to the core... per-photon record = position (3f),
//! direction (3f), normal (3f), distance (f), N radiance floats"), used by
//! `--save-init`/`--load-init` and by [`crate::executor::ClientServerExecutor`]'s
//! controller-to-worker broadcast (spec.md §4.6).

use lumen_core::algebra::Vector3;
use lumen_core::log::Log;
use lumen_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::photon_map::PhotonMap;
use crate::renderer::{PhotonMappingParams, PhotonMappingRenderer};

#[derive(Serialize, Deserialize)]
struct PhotonRecord {
    position: [f32; 3],
    direction: [f32; 3],
    normal: [f32; 3],
    distance: f32,
    radiance: Vec<f32>,
}

impl From<&MultispectralPhoton> for PhotonRecord {
    fn from(p: &MultispectralPhoton) -> Self {
        Self {
            position: p.position.into(),
            direction: p.direction.into(),
            normal: p.normal.into(),
            distance: p.distance,
            radiance: p.radiance.clone(),
        }
    }
}

impl From<PhotonRecord> for MultispectralPhoton {
    fn from(r: PhotonRecord) -> Self {
        MultispectralPhoton {
            radiance: r.radiance,
            position: Vector3::from(r.position),
            direction: Vector3::from(r.direction),
            normal: Vector3::from(r.normal),
            distance: r.distance,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct InitBlobBody {
    global: Vec<PhotonRecord>,
    caustic: Vec<PhotonRecord>,
}

fn photon_map_records(map: &PhotonMap) -> Vec<PhotonRecord> {
    map.photons().map(PhotonRecord::from).collect()
}

impl PhotonMappingRenderer {
    /// Serializes both photon maps to the wire layout spec.md §6 names: a
    /// 4-byte little-endian length prefix followed by the bincode-encoded
    /// body. Opaque to every caller except this module and its counterpart
    /// [`PhotonMappingRenderer::from_init_blob`].
    pub fn to_init_blob(&self) -> Vec<u8> {
        let body = InitBlobBody {
            global: photon_map_records(self.global_map()),
            caustic: photon_map_records(self.caustic_map()),
        };
        let encoded = bincode::serialize(&body).expect("in-memory photon records always serialize");
        let mut out = Vec::with_capacity(4 + encoded.len());
        out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        out.extend_from_slice(&encoded);
        out
    }

    /// Rebuilds a renderer from a previously captured init blob, skipping
    /// pass 1 (photon emission) entirely — used by `--load-init` and by a
    /// `ClientServerExecutor` worker receiving the controller's broadcast.
    pub fn from_init_blob(params: PhotonMappingParams, blob: &[u8]) -> Result<Self, RenderError> {
        if blob.len() < 4 {
            return Err(RenderError::UnresolvedReference {
                name: "init blob shorter than its own length prefix".to_string(),
            });
        }
        let declared_len = u32::from_le_bytes(blob[0..4].try_into().expect("checked above")) as usize;
        let body = &blob[4..];
        if body.len() != declared_len {
            Log::warn(format!(
                "init blob length prefix ({declared_len}) does not match payload size ({}), using actual payload size",
                body.len()
            ));
        }
        let decoded: InitBlobBody = bincode::deserialize(body).map_err(|_| RenderError::UnresolvedReference {
            name: "init blob payload could not be decoded".to_string(),
        })?;
        let global_map = PhotonMap::build(decoded.global.into_iter().map(MultispectralPhoton::from).collect());
        let caustic_map = PhotonMap::build(decoded.caustic.into_iter().map(MultispectralPhoton::from).collect());
        Ok(Self::from_maps(params, global_map, caustic_map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{LambertianBRDF, Material};
    use lumen_scene::{Object, SceneryBuilder, Shape, Source, Sphere};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn grid() -> WavelengthGrid {
        WavelengthGrid::uniform(400.0, 700.0, 4).unwrap()
    }

    #[test]
    fn init_blob_round_trips_photon_counts() {
        let grid = grid();
        let mut builder: SceneryBuilder<Material> = SceneryBuilder::new(1.0e-4);
        let floor = Shape::Sphere(Sphere::new(Vector3::new(0.0, -1001.0, 0.0), 1000.0));
        let material = Material::Lambertian(LambertianBRDF::new(Spectrum::constant(4, 0.9), Spectrum::zero(4), true));
        builder.add_object(Object::new(floor, material));
        builder.add_source(Source::new(
            lumen_scene::LightSource::Point(lumen_scene::PointSource::new(Spectrum::constant(4, 1.0), 1.0, Vector3::new(0.0, 5.0, 0.0))),
            Shape::Null(Vector3::new(0.0, 5.0, 0.0)),
        ));
        let scenery = builder.build();
        let params = PhotonMappingParams {
            max_depth: 2,
            n_global: 50,
            n_caustic: 0,
            r_global: 2.0,
            r_caustic: 1.0,
            min_photons_for_estimate: 1,
            fallback_diffuse_samples: 0,
        };
        let mut rng = SmallRng::seed_from_u64(7);
        let built = PhotonMappingRenderer::build(&grid, &scenery, params.clone(), &mut rng);
        assert!(built.global_map_len() > 0);

        let blob = built.to_init_blob();
        let restored = PhotonMappingRenderer::from_init_blob(params, &blob).unwrap();
        assert_eq!(restored.global_map_len(), built.global_map_len());
        assert_eq!(restored.caustic_map_len(), built.caustic_map_len());
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let params = PhotonMappingParams {
            max_depth: 1,
            n_global: 0,
            n_caustic: 0,
            r_global: 1.0,
            r_caustic: 1.0,
            min_photons_for_estimate: 1,
            fallback_diffuse_samples: 0,
        };
        assert!(PhotonMappingRenderer::from_init_blob(params, &[0u8; 2]).is_err());
    }
}
