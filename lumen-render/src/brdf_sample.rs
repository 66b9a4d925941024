//! BRDF sampling mode (spec.md §4.7): independent of scene traversal,
//! samples a material's response on a canonical hemisphere over a
//! horizontal surface at a user-chosen angular step, and writes the
//! resulting (R⊥, R∥, spectrum) table to disk.
//!
//! No equivalent is documented in `original_source/`'s distillation, so the
//! probe technique here reuses the same (R⊥, R∥) convention `material/
//! table.rs` already reads back (spec.md §4.2): a unit-radiance incident
//! sample is probed once with pure s (perpendicular) and once with pure p
//! (parallel) polarization, and `Bsdf::diffuse_reemited` +
//! `specular_reemited`'s response to each gives the per-wavelength R⊥/R∥
//! pair directly, without assuming the material is internally built on an
//! `AngleTable` at all.

use std::io;
use std::path::Path;

use lumen_core::algebra::{Vector2, Vector3};
use lumen_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::material::Bsdf;

/// One (incidence, view) angle pair's measured response, one value per grid
/// wavelength.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrdfSample {
    pub theta_i_deg: f32,
    pub phi_i_deg: f32,
    pub theta_v_deg: f32,
    pub phi_v_deg: f32,
    pub r_orth: Vec<f32>,
    pub r_para: Vec<f32>,
}

/// A full hemisphere × hemisphere sweep at one angular step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrdfSampleTable {
    pub step_degrees: f32,
    pub samples: Vec<BrdfSample>,
}

fn spherical_direction(theta_deg: f32, phi_deg: f32) -> Vector3<f32> {
    let theta = theta_deg.to_radians();
    let phi = phi_deg.to_radians();
    Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
}

/// Probes `material` with a unit-radiance incident sample polarized along
/// `polarization` (`+1` for pure s, `-1` for pure p, per `LightData::
/// s_polarized`/`p_polarized`'s sign convention) travelling along
/// `incident_dir` and measures the summed diffuse+specular response against
/// a view ray travelling along `view_dir` — both directions follow the
/// `LightVector::ray.dir` convention used throughout this crate: the
/// direction of travel *into* the surface, not the direction back out to
/// the light or the viewer (see the `LambertianBRDF` tests, which build
/// their incident/view rays the same way).
fn probe<M: Bsdf>(grid: &WavelengthGrid, material: &M, basis: &Basis, incident_dir: Vector3<f32>, view_dir: Vector3<f32>, polarization: f32) -> Vec<f32> {
    let len = grid.len();
    let mut sample = LightData::new(1.0);
    sample.linear0 = polarization;
    let incident = LightVector::new(Ray::new(basis.origin, incident_dir), 1.0, vec![sample; len], basis.i);

    let view_ray = Ray::new(basis.origin, view_dir);
    let mut diffuse = LightVector::zero(view_ray, 0.0, len);
    material.diffuse_reemited(grid, basis, Vector2::new(0.0, 0.0), &incident, &mut diffuse);

    let mut specular = LightVector::zero(view_ray, 0.0, len);
    material.specular_reemited(grid, basis, Vector2::new(0.0, 0.0), &incident, &mut specular);

    (0..len).map(|i| diffuse.data()[i].radiance + specular.data()[i].radiance).collect()
}

/// Sweeps (θᵢ,ϕᵢ) × (θᵥ,ϕᵥ) over the canonical upper hemisphere (z-up,
/// surface at the world origin) at `step_degrees`, per spec.md §4.7.
/// `step_degrees` below 1 is clamped to 1 to keep the sweep finite.
/// Normal incidence/view (θ = 0) is sampled once, not once per azimuth,
/// since every ϕ degenerates to the same direction there.
pub fn sample_material<M: Bsdf>(grid: &WavelengthGrid, material: &M, step_degrees: f32) -> BrdfSampleTable {
    let step = step_degrees.max(1.0);
    let basis = Basis::from_normal(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
    let mut samples = Vec::new();

    let azimuth_steps = (360.0 / step).ceil().max(1.0) as usize;
    let polar_steps = (90.0 / step).floor() as usize;

    let mut theta_i_values = vec![0.0f32];
    for s in 1..=polar_steps {
        theta_i_values.push((s as f32 * step).min(90.0));
    }

    for &theta_i in &theta_i_values {
        let phi_i_count = if theta_i <= 0.0 { 1 } else { azimuth_steps };
        for pi in 0..phi_i_count {
            let phi_i = pi as f32 * step;
            let incident_dir = -spherical_direction(theta_i, phi_i);

            for &theta_v in &theta_i_values {
                let phi_v_count = if theta_v <= 0.0 { 1 } else { azimuth_steps };
                for pv in 0..phi_v_count {
                    let phi_v = pv as f32 * step;
                    let view_dir = -spherical_direction(theta_v, phi_v);

                    let r_orth = probe(grid, material, &basis, incident_dir, view_dir, 1.0);
                    let r_para = probe(grid, material, &basis, incident_dir, view_dir, -1.0);

                    samples.push(BrdfSample {
                        theta_i_deg: theta_i,
                        phi_i_deg: phi_i,
                        theta_v_deg: theta_v,
                        phi_v_deg: phi_v,
                        r_orth,
                        r_para,
                    });
                }
            }
        }
    }

    BrdfSampleTable { step_degrees: step, samples }
}

/// Serializes a table to `path` as RON; spec.md §4.7 names no wire format
/// for this, so this follows the same `ron` convention the scene-
/// description layer uses for every other on-disk structure in this
/// workspace.
pub fn write_table(table: &BrdfSampleTable, path: &Path) -> io::Result<()> {
    let text = ron::ser::to_string_pretty(table, ron::ser::PrettyConfig::default()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::LambertianBRDF;

    #[test]
    fn lambertian_sample_table_covers_every_angle_pair() {
        let grid = WavelengthGrid::uniform(400.0, 700.0, 2).unwrap();
        let material = LambertianBRDF::new(Spectrum::constant(2, 0.8), Spectrum::zero(2), true);
        let table = sample_material(&grid, &material, 45.0);
        // theta in {0, 45, 90}; theta=0 has 1 azimuth, theta=45/90 have 8.
        let expected_directions = 1 + 8 + 8;
        assert_eq!(table.samples.len(), expected_directions * expected_directions);
        assert!(table.samples.iter().all(|s| s.r_orth.len() == 2 && s.r_para.len() == 2));
    }

    #[test]
    fn normal_incidence_normal_view_is_brightest_for_diffuse_white() {
        let grid = WavelengthGrid::uniform(400.0, 700.0, 1).unwrap();
        let material = LambertianBRDF::new(Spectrum::constant(1, 1.0), Spectrum::zero(1), true);
        let table = sample_material(&grid, &material, 30.0);
        let normal = table.samples.iter().find(|s| s.theta_i_deg == 0.0 && s.theta_v_deg == 0.0).unwrap();
        let grazing = table.samples.iter().find(|s| s.theta_i_deg == 90.0 && s.theta_v_deg == 0.0).unwrap();
        assert!(normal.r_orth[0] >= grazing.r_orth[0]);
    }
}
