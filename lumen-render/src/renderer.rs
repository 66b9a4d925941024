//! Renderer strategies (spec.md §4.4): [`SimpleRenderer`] (Whitted-style
//! recursion), [`PhotonMappingRenderer`] (two-pass photon mapping), and
//! [`TestRenderer`] (paints every hit flat white to validate the
//! intersection/basis pipeline independently of shading).
//!
//! Every strategy shares the same primary-ray classification
//! (`nearest_object` vs `nearest_source`, whichever is closer wins) and the
//! same direct-lighting fold (shadow-test each source's incident samples,
//! transport through the current object's outer medium, fold through
//! `diffuse_reemited`/`specular_reemited`). The one convention every BSDF
//! call below must respect: the `out`/result `LightVector` passed in always
//! carries the *unmodified* view ray that reached the current hit, never a
//! reversed or reframed one — callees do their own frame bookkeeping.

use lumen_core::algebra::Vector2;
use lumen_core::prelude::*;
use lumen_scene::{Id, Object, Scenery, Source, SurfacePoint};
use rand::Rng;

use crate::material::Bsdf;
use crate::photon_map::PhotonMap;

/// A freshly zeroed, depolarized scratch `LightVector` carrying `ray`'s own
/// geometry — the shape every `out`/contribution parameter below takes.
fn scratch(ray: Ray, distance: f32, len: usize) -> LightVector {
    LightVector::zero(ray, distance, len)
}

enum PrimaryHit<'a, M> {
    Miss,
    Source(Id<Source>, &'a Source, f32),
    Object(Id<Object<M>>, &'a Object<M>, f32, SurfacePoint),
}

/// Classifies a primary (or secondary) ray against the scene: nearest object
/// vs. nearest source, whichever is closer wins (spec.md §4.4 steps 1-2).
fn trace_primary<'a, M: Bsdf>(scenery: &'a Scenery<M>, ray: &Ray) -> PrimaryHit<'a, M> {
    let object_hit = scenery.nearest_object(ray, None);
    let source_hit = scenery.nearest_source(ray, None);
    let source_is_closer = match (&object_hit, &source_hit) {
        (Some((_, _, od, _)), Some((_, _, sd, _))) => sd < od,
        (None, Some(_)) => true,
        _ => false,
    };
    if source_is_closer {
        let (sid, source, sd, _) = source_hit.expect("source_is_closer implies a source hit");
        PrimaryHit::Source(sid, source, sd)
    } else if let Some((oid, object, od, point)) = object_hit {
        PrimaryHit::Object(oid, object, od, point)
    } else {
        PrimaryHit::Miss
    }
}

/// Direct (single-bounce) illumination: for every source, gather its
/// incident samples at `basis.origin`, shadow-test each against the object
/// octree (excluding the hit object itself), transport survivors through the
/// current object's outer medium, and fold through `diffuse_reemited` +
/// `specular_reemited` (spec.md §4.4 step 4). A blocker with no inner medium
/// is treated as fully opaque.
#[allow(clippy::too_many_arguments)]
fn accumulate_direct<M: Bsdf>(
    grid: &WavelengthGrid,
    scenery: &Scenery<M>,
    id: Id<Object<M>>,
    object: &Object<M>,
    basis: &Basis,
    uv: Vector2<f32>,
    ray: &Ray,
    distance: f32,
    result: &mut LightVector,
    rng: &mut impl Rng,
) {
    let len = result.len();
    let mut incidents = Vec::new();
    for source in scenery.sources.iter() {
        incidents.clear();
        source.light.incident_light(grid, basis.origin, len, &mut incidents, rng);
        for mut incident in incidents.drain(..) {
            let shadow_ray = Ray::new(basis.origin, -incident.ray.dir);
            if let Some((_, blocker, blocker_distance, _)) = scenery.nearest_object(&shadow_ray, Some(id)) {
                if blocker_distance < incident.distance {
                    let opaque = blocker.inner_medium.map(|m| scenery.media.get(m).is_opaque).unwrap_or(true);
                    if opaque {
                        continue;
                    }
                }
            }
            if let Some(medium_id) = object.outer_medium {
                scenery.media.get(medium_id).transport_light(grid, &mut incident);
            }

            let mut diffuse = scratch(*ray, distance, len);
            object.material.diffuse_reemited(grid, basis, uv, &incident, &mut diffuse);
            result.add_assign(&diffuse);

            let mut specular = scratch(*ray, distance, len);
            object.material.specular_reemited(grid, basis, uv, &incident, &mut specular);
            result.add_assign(&specular);
        }
    }
}

/// Whitted-style recursive renderer (spec.md §4.4, "SimpleRenderer").
#[derive(Clone)]
pub struct SimpleRenderer {
    pub max_depth: u32,
    pub ambient: Spectrum,
}

impl SimpleRenderer {
    pub fn new(max_depth: u32, ambient: Spectrum) -> Self {
        Self { max_depth, ambient }
    }

    pub fn trace<M: Bsdf>(&self, grid: &WavelengthGrid, scenery: &Scenery<M>, ray: Ray, rng: &mut impl Rng) -> LightVector {
        self.trace_depth(grid, scenery, ray, self.max_depth, rng)
    }

    fn trace_depth<M: Bsdf>(&self, grid: &WavelengthGrid, scenery: &Scenery<M>, ray: Ray, depth: u32, rng: &mut impl Rng) -> LightVector {
        let len = grid.len();
        match trace_primary(scenery, &ray) {
            PrimaryHit::Miss => {
                let mut result = scratch(ray, f32::INFINITY, len);
                if let Some(environment) = &scenery.environment {
                    environment.add_contribution(grid, &mut result);
                }
                result
            }
            PrimaryHit::Source(_, source, distance) => {
                let mut result = scratch(ray, distance, len);
                let basis = Basis::from_normal(ray.at(distance), -ray.dir);
                source.light.emitted_light(grid, &basis, &mut result);
                result
            }
            PrimaryHit::Object(id, object, distance, point) => {
                let mut result = scratch(ray, distance, len);
                accumulate_direct(grid, scenery, id, object, &point.basis, point.uv, &ray, distance, &mut result, rng);

                if depth > 0 && object.material.is_specular() {
                    let mut subrays = Vec::new();
                    object.material.specular_sub_rays(&point.basis, point.uv, &result, &mut subrays);
                    for subray in subrays {
                        let mut incident = self.trace_depth(grid, scenery, subray.ray, depth - 1, rng);
                        if let Some(medium_id) = object.outer_medium {
                            scenery.media.get(medium_id).transport_light(grid, &mut incident);
                        }
                        let mut contribution = scratch(ray, distance, len);
                        object.material.specular_reemited(grid, &point.basis, point.uv, &incident, &mut contribution);
                        result.add_assign(&contribution);
                    }
                }

                if object.material.is_diffuse() {
                    let mut contribution = scratch(ray, distance, len);
                    object
                        .material
                        .diffuse_reemited_from_ambient(&point.basis, point.uv, &mut contribution, &self.ambient);
                    result.add_assign(&contribution);
                }

                if let Some(medium_id) = object.outer_medium {
                    scenery.media.get(medium_id).transport_light(grid, &mut result);
                }
                result
            }
        }
    }
}

/// Upper bound on photon path length; Russian roulette (inside
/// `Medium::transport_photon`/`Bsdf::bounce_photon`) terminates almost every
/// path long before this is reached — it exists only to bound pathological
/// cases (e.g. a perfectly reflective enclosure).
const MAX_PHOTON_BOUNCES: u32 = 64;

/// Standard cone filter sharpness (Wann Jensen's `k`); larger values weight
/// nearby photons more heavily relative to the gather radius's edge.
const CONE_FILTER_K: f32 = 1.1;

fn cone_filter_weight(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let normalization = 1.0 - 2.0 / (3.0 * CONE_FILTER_K);
    (1.0 - distance / (CONE_FILTER_K * radius)).max(0.0) / normalization
}

/// Configuration for [`PhotonMappingRenderer::build`].
#[derive(Clone)]
pub struct PhotonMappingParams {
    pub max_depth: u32,
    pub n_global: usize,
    pub n_caustic: usize,
    pub r_global: f32,
    pub r_caustic: f32,
    /// Named threshold resolving the Open Question on the density-estimation
    /// fallback (SPEC_FULL.md §3): below this many gathered photons, fall
    /// back to `fallback_diffuse_samples` random secondary rays.
    pub min_photons_for_estimate: usize,
    pub fallback_diffuse_samples: usize,
}

enum MapKind {
    Global,
    Caustic,
}

fn allocate_quota<M>(scenery: &Scenery<M>, total_power: f32, n: usize) -> Vec<usize> {
    scenery
        .sources
        .iter()
        .map(|source| ((n as f32) * source.light.power() / total_power).round() as usize)
        .collect()
}

/// Walks one emitted photon through the scene, storing it into `out`
/// whenever `kind`'s storage rule is satisfied (spec.md §4.4 pass 1):
/// `Global` stores at arrival whenever the bounce that sent it here was
/// diffuse (skipping the very first bounce from the source); `Caustic`
/// stores the first diffuse bounce reached after an unbroken specular path.
fn walk_photon<M: Bsdf>(
    grid: &WavelengthGrid,
    scenery: &Scenery<M>,
    mut photon: MultispectralPhoton,
    kind: &MapKind,
    rng: &mut impl Rng,
    out: &mut Vec<MultispectralPhoton>,
) {
    let mut previous_was_diffuse = false;
    let mut path_specular_only = true;
    for bounce_index in 0..MAX_PHOTON_BOUNCES {
        let ray = Ray::new(photon.position, photon.direction);
        let Some((_, object, distance, point)) = scenery.nearest_object(&ray, None) else {
            return;
        };
        photon.position = point.basis.origin;
        photon.normal = point.basis.k;
        photon.distance = distance;
        if let Some(medium_id) = object.outer_medium {
            if !scenery.media.get(medium_id).transport_photon(grid, &mut photon, rng) {
                return;
            }
        }

        if let MapKind::Global = kind {
            if bounce_index > 0 && previous_was_diffuse {
                out.push(photon.clone());
            }
        }

        let mut this_specular = false;
        if !object.material.bounce_photon(grid, &point.basis, point.uv, &mut photon, &mut this_specular, rng) {
            return;
        }

        if let MapKind::Caustic = kind {
            if path_specular_only && !this_specular {
                out.push(photon.clone());
            }
        }
        if !this_specular {
            path_specular_only = false;
        }
        previous_was_diffuse = !this_specular;
    }
}

/// Two-pass photon-mapping renderer (spec.md §4.4, "PhotonMappingRenderer").
/// Pass 1 (`build`) emits photons proportional to each source's share of
/// total scene power and stores them into two balanced KD-trees; pass 2
/// (`trace`) reuses `SimpleRenderer`'s direct-lighting and specular-recursion
/// steps and replaces the ambient term with a radius-bounded gather against
/// both maps, falling back to random secondary rays when too few photons are
/// found nearby.
pub struct PhotonMappingRenderer {
    params: PhotonMappingParams,
    global_map: PhotonMap,
    caustic_map: PhotonMap,
}

impl PhotonMappingRenderer {
    pub fn build<M: Bsdf>(
        grid: &WavelengthGrid,
        scenery: &Scenery<M>,
        params: PhotonMappingParams,
        rng: &mut impl Rng,
    ) -> Self {
        let total_power: f32 = scenery.sources.iter().map(|s| s.light.power()).sum();
        let mut global_photons = Vec::new();
        let mut caustic_photons = Vec::new();

        if total_power > 0.0 {
            let global_quota = allocate_quota(scenery, total_power, params.n_global);
            for (source, &quota) in scenery.sources.iter().zip(global_quota.iter()) {
                for _ in 0..quota {
                    let photon = source.light.random_photon(grid, rng);
                    walk_photon(grid, scenery, photon, &MapKind::Global, rng, &mut global_photons);
                }
            }

            let caustic_quota = allocate_quota(scenery, total_power, params.n_caustic);
            for (source, &quota) in scenery.sources.iter().zip(caustic_quota.iter()) {
                for _ in 0..quota {
                    let photon = source.light.random_photon(grid, rng);
                    walk_photon(grid, scenery, photon, &MapKind::Caustic, rng, &mut caustic_photons);
                }
            }
        }

        Self {
            params,
            global_map: PhotonMap::build(global_photons),
            caustic_map: PhotonMap::build(caustic_photons),
        }
    }

    /// Rebuilds a renderer directly from two already-built photon maps,
    /// skipping pass 1 entirely — the counterpart `to`/`from_init_blob`
    /// (in `crate::init_blob`) uses to restore a `--load-init` capture or a
    /// `ClientServerExecutor` worker's broadcast copy.
    pub fn from_maps(params: PhotonMappingParams, global_map: PhotonMap, caustic_map: PhotonMap) -> Self {
        Self { params, global_map, caustic_map }
    }

    pub fn global_map(&self) -> &PhotonMap {
        &self.global_map
    }

    pub fn caustic_map(&self) -> &PhotonMap {
        &self.caustic_map
    }

    pub fn global_map_len(&self) -> usize {
        self.global_map.len()
    }

    pub fn caustic_map_len(&self) -> usize {
        self.caustic_map.len()
    }

    pub fn trace<M: Bsdf>(&self, grid: &WavelengthGrid, scenery: &Scenery<M>, ray: Ray, rng: &mut impl Rng) -> LightVector {
        self.trace_depth(grid, scenery, ray, self.params.max_depth, rng)
    }

    fn trace_depth<M: Bsdf>(
        &self,
        grid: &WavelengthGrid,
        scenery: &Scenery<M>,
        ray: Ray,
        depth: u32,
        rng: &mut impl Rng,
    ) -> LightVector {
        let len = grid.len();
        match trace_primary(scenery, &ray) {
            PrimaryHit::Miss => {
                let mut result = scratch(ray, f32::INFINITY, len);
                if let Some(environment) = &scenery.environment {
                    environment.add_contribution(grid, &mut result);
                }
                result
            }
            PrimaryHit::Source(_, source, distance) => {
                let mut result = scratch(ray, distance, len);
                let basis = Basis::from_normal(ray.at(distance), -ray.dir);
                source.light.emitted_light(grid, &basis, &mut result);
                result
            }
            PrimaryHit::Object(id, object, distance, point) => {
                let mut result = scratch(ray, distance, len);
                accumulate_direct(grid, scenery, id, object, &point.basis, point.uv, &ray, distance, &mut result, rng);

                if depth > 0 && object.material.is_specular() {
                    let mut subrays = Vec::new();
                    object.material.specular_sub_rays(&point.basis, point.uv, &result, &mut subrays);
                    for subray in subrays {
                        let mut incident = self.trace_depth(grid, scenery, subray.ray, depth - 1, rng);
                        if let Some(medium_id) = object.outer_medium {
                            scenery.media.get(medium_id).transport_light(grid, &mut incident);
                        }
                        let mut contribution = scratch(ray, distance, len);
                        object.material.specular_reemited(grid, &point.basis, point.uv, &incident, &mut contribution);
                        result.add_assign(&contribution);
                    }
                }

                self.gather_indirect(grid, scenery, object, &point.basis, point.uv, &ray, distance, depth, rng, &mut result);

                if let Some(medium_id) = object.outer_medium {
                    scenery.media.get(medium_id).transport_light(grid, &mut result);
                }
                result
            }
        }
    }

    /// Replaces `SimpleRenderer`'s ambient term with a density estimate from
    /// both photon maps (spec.md §4.4 pass 2). Below `min_photons_for_estimate`
    /// total survivors, optionally falls back to tracing
    /// `fallback_diffuse_samples` random secondary rays one level deeper.
    #[allow(clippy::too_many_arguments)]
    fn gather_indirect<M: Bsdf>(
        &self,
        grid: &WavelengthGrid,
        scenery: &Scenery<M>,
        object: &Object<M>,
        basis: &Basis,
        uv: Vector2<f32>,
        ray: &Ray,
        distance: f32,
        depth: u32,
        rng: &mut impl Rng,
        result: &mut LightVector,
    ) {
        if !object.material.is_diffuse() {
            return;
        }
        let len = result.len();

        let mut global_hits = Vec::new();
        let mut caustic_hits = Vec::new();
        self.global_map.gather(basis.origin, self.params.r_global, &mut global_hits);
        self.caustic_map.gather(basis.origin, self.params.r_caustic, &mut caustic_hits);

        if global_hits.len() + caustic_hits.len() < self.params.min_photons_for_estimate {
            if depth > 0 && self.params.fallback_diffuse_samples > 0 {
                let mut subrays = Vec::new();
                let out_ray = scratch(*ray, distance, len);
                object.material.random_diffuse_rays(basis, uv, &out_ray, self.params.fallback_diffuse_samples, &mut subrays, rng);
                let weight = 1.0 / self.params.fallback_diffuse_samples as f32;
                for subray in subrays {
                    let mut incident = self.trace_depth(grid, scenery, subray.ray, depth - 1, rng);
                    if let Some(medium_id) = object.outer_medium {
                        scenery.media.get(medium_id).transport_light(grid, &mut incident);
                    }
                    let mut contribution = scratch(*ray, distance, len);
                    object.material.diffuse_reemited(grid, basis, uv, &incident, &mut contribution);
                    contribution.mul(weight);
                    result.add_assign(&contribution);
                }
            }
            return;
        }

        for (photons, radius) in [(&global_hits, self.params.r_global), (&caustic_hits, self.params.r_caustic)] {
            if radius <= 0.0 {
                continue;
            }
            let area = std::f32::consts::PI * radius * radius;
            for (photon, dist_sq) in photons.iter() {
                let weight = cone_filter_weight(dist_sq.sqrt(), radius) / area;
                if weight <= 0.0 {
                    continue;
                }
                let mut incident = LightVector::zero(Ray::new(basis.origin, photon.direction), 0.0, len);
                for (i, data) in incident.data_mut().iter_mut().enumerate() {
                    data.set_radiance(photon.radiance[i]);
                }
                let mut contribution = scratch(*ray, distance, len);
                object.material.diffuse_reemited(grid, basis, uv, &incident, &mut contribution);
                contribution.mul(weight);
                result.add_assign(&contribution);
            }
        }
    }
}

/// Paints every hit flat white, skipping all material evaluation, shadow
/// tests and recursion; validates the intersection/basis pipeline
/// independently of shading (spec.md §4.4, SPEC_FULL.md §4.4 supplement).
pub struct TestRenderer;

impl TestRenderer {
    fn paint_white(ray: Ray, distance: f32, len: usize) -> LightVector {
        let mut result = scratch(ray, distance, len);
        for data in result.data_mut() {
            data.set_radiance(1.0);
        }
        result
    }

    pub fn trace<M: Bsdf>(&self, grid: &WavelengthGrid, scenery: &Scenery<M>, ray: Ray) -> LightVector {
        let len = grid.len();
        match trace_primary(scenery, &ray) {
            PrimaryHit::Miss => {
                let mut result = scratch(ray, f32::INFINITY, len);
                if let Some(environment) = &scenery.environment {
                    environment.add_contribution(grid, &mut result);
                }
                result
            }
            PrimaryHit::Source(_, _, distance) => Self::paint_white(ray, distance, len),
            PrimaryHit::Object(_, _, distance, _) => Self::paint_white(ray, distance, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{LambertianBRDF, Material};
    use lumen_scene::{Environment, SceneryBuilder, Shape, Sphere};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn grid() -> WavelengthGrid {
        WavelengthGrid::uniform(400.0, 700.0, 4).unwrap()
    }

    #[test]
    fn empty_scene_reads_spectral_environment() {
        let grid = grid();
        let mut builder: SceneryBuilder<Material> = SceneryBuilder::new(1.0e-4);
        builder.set_environment(Environment::Spectral {
            spectrum: Spectrum::constant(4, 0.5),
            amount: 1.0,
        });
        let scenery = builder.build();
        let renderer = SimpleRenderer::new(3, Spectrum::zero(4));
        let ray = Ray::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        let mut rng = SmallRng::seed_from_u64(7);
        let result = renderer.trace(&grid, &scenery, ray, &mut rng);
        assert!(result.data().iter().all(|d| (d.radiance - 0.5).abs() < 1.0e-5));
    }

    #[test]
    fn white_lambertian_sphere_under_point_light_is_lit_facing_the_light() {
        let grid = grid();
        let mut builder: SceneryBuilder<Material> = SceneryBuilder::new(1.0e-4);
        let sphere = Shape::Sphere(Sphere::new(Vector3::zeros(), 1.0));
        let material = Material::Lambertian(LambertianBRDF::new(Spectrum::constant(4, 1.0), Spectrum::zero(4), true));
        builder.add_object(Object::new(sphere, material));
        builder.add_source(Source::new(
            lumen_scene::LightSource::Point(lumen_scene::PointSource::new(Spectrum::constant(4, 1.0), 1.0, Vector3::new(0.0, 0.0, 5.0))),
            Shape::Null(Vector3::new(0.0, 0.0, 5.0)),
        ));
        let scenery = builder.build();
        let renderer = SimpleRenderer::new(0, Spectrum::zero(4));
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let mut rng = SmallRng::seed_from_u64(7);
        let result = renderer.trace(&grid, &scenery, ray, &mut rng);
        assert!(result.data()[0].radiance > 0.0);
    }

    #[test]
    fn test_renderer_paints_every_hit_flat_white() {
        let grid = grid();
        let mut builder: SceneryBuilder<Material> = SceneryBuilder::new(1.0e-4);
        let sphere = Shape::Sphere(Sphere::new(Vector3::zeros(), 1.0));
        let material = Material::Lambertian(LambertianBRDF::new(Spectrum::constant(4, 1.0), Spectrum::zero(4), true));
        builder.add_object(Object::new(sphere, material));
        let scenery = builder.build();
        let renderer = TestRenderer;
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let result = renderer.trace(&grid, &scenery, ray);
        assert!(result.data().iter().all(|d| d.radiance == 1.0));
    }

    #[test]
    fn photon_map_build_allocates_quota_proportional_to_power() {
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
            n_global: 200,
            n_caustic: 0,
            r_global: 2.0,
            r_caustic: 1.0,
            min_photons_for_estimate: 1,
            fallback_diffuse_samples: 0,
        };
        let mut rng = SmallRng::seed_from_u64(42);
        let renderer = PhotonMappingRenderer::build(&grid, &scenery, params, &mut rng);
        assert!(renderer.global_map_len() > 0);
        assert_eq!(renderer.caustic_map_len(), 0);
    }

    #[test]
    fn cone_filter_weight_vanishes_at_radius_edge() {
        assert!(cone_filter_weight(1.0, 1.0) <= 1.0e-6);
        assert!(cone_filter_weight(0.0, 1.0) > 0.0);
    }
}
