//! Beckmann microfacet distribution and Torrance-Sparrow shadowing-masking,
//! shared by the rough metallic variants (`BeckmannBRDF`, `AlloyBRDF`,
//! `MetalW`). `original_source` ships headers for these materials without
//! their `.cpp` bodies, so the distribution itself follows the classical
//! Beckmann/Torrance-Sparrow formulation their constructors' `roughness`
//! parameter implies, rather than a literal port.

use lumen_core::prelude::*;
use nalgebra::Vector3;

/// Isotropic Beckmann distribution at half-vector inclination `cos_h`
/// (cosine between the half vector and the surface normal), roughness `m`.
pub fn beckmann_d(cos_h: f32, m: f32) -> f32 {
    let cos_h = cos_h.max(1.0e-6);
    let cos2_h = cos_h * cos_h;
    let tan2_h = (1.0 - cos2_h) / cos2_h;
    let m2 = (m * m).max(1.0e-6);
    (-tan2_h / m2).exp() / (std::f32::consts::PI * m2 * cos2_h * cos2_h)
}

/// Anisotropic Beckmann distribution, `half` expressed in the surface's
/// local tangent frame (`x` along `basis.i`, `y` along `basis.j`).
pub fn beckmann_d_anisotropic(half_local: Vector3<f32>, mi: f32, mj: f32) -> f32 {
    let cos_h = half_local.z.max(1.0e-6);
    let cos2_h = cos_h * cos_h;
    let mi2 = (mi * mi).max(1.0e-6);
    let mj2 = (mj * mj).max(1.0e-6);
    let exponent = (half_local.x * half_local.x) / mi2 + (half_local.y * half_local.y) / mj2;
    (-exponent / cos2_h).exp() / (std::f32::consts::PI * mi * mj * cos2_h * cos2_h)
}

/// Torrance-Sparrow masking-shadowing term.
pub fn masking_shadowing(cos_h: f32, cos_oi: f32, cos_ov: f32, cos_hv: f32) -> f32 {
    if cos_hv <= 0.0 {
        return 0.0;
    }
    let g1 = 2.0 * cos_h * cos_ov / cos_hv;
    let g2 = 2.0 * cos_h * cos_oi / cos_hv;
    1.0f32.min(g1).min(g2)
}

/// The half vector between two directions that both point *away* from the
/// surface (callers pass `-incident.dir` and `-out.dir`, since both
/// directions in this crate point *into* the surface by convention).
pub fn half_vector(a: Vector3<f32>, b: Vector3<f32>) -> Option<Vector3<f32>> {
    let sum = a + b;
    if sum.norm_squared() < 1.0e-12 {
        None
    } else {
        Some(sum.normalize())
    }
}

/// Evaluates the isotropic rough-metal BRDF value (Torrance-Sparrow over a
/// Beckmann distribution, Fresnel from `table`) for one wavelength `band`,
/// given `cos_oi`, `cos_ov` already computed by the caller.
pub fn rough_metal_brdf(
    basis: &Basis,
    incident_dir: Vector3<f32>,
    out_dir: Vector3<f32>,
    cos_oi: f32,
    cos_ov: f32,
    m: f32,
    table: &super::table::AngleTable,
    band: usize,
) -> f32 {
    let Some(half) = half_vector(-incident_dir, -out_dir) else {
        return 0.0;
    };
    let cos_h = half.dot(&basis.k).max(0.0);
    let cos_hv = half.dot(&-out_dir).max(1.0e-6);
    let d = beckmann_d(cos_h, m);
    let g = masking_shadowing(cos_h, cos_oi, cos_ov, cos_hv);
    let cos_theta_h_incidence = cos_h;
    let (r_orth, r_para) = table.sample(cos_theta_h_incidence, band);
    let f = (r_orth + r_para) * 0.5;
    d * g * f / (4.0 * cos_oi * cos_ov).max(1.0e-6)
}

/// Anisotropic variant of [`rough_metal_brdf`], used by `MetalW`.
pub fn rough_metal_brdf_anisotropic(
    basis: &Basis,
    incident_dir: Vector3<f32>,
    out_dir: Vector3<f32>,
    cos_oi: f32,
    cos_ov: f32,
    mi: f32,
    mj: f32,
    table: &super::table::AngleTable,
    band: usize,
) -> f32 {
    let Some(half) = half_vector(-incident_dir, -out_dir) else {
        return 0.0;
    };
    let half_local = basis.to_local(half);
    let cos_h = half_local.z.max(0.0);
    let cos_hv = half.dot(&-out_dir).max(1.0e-6);
    let d = beckmann_d_anisotropic(half_local, mi, mj);
    let g = masking_shadowing(cos_h, cos_oi, cos_ov, cos_hv);
    let (r_orth, r_para) = table.sample(cos_h, band);
    let f = (r_orth + r_para) * 0.5;
    d * g * f / (4.0 * cos_oi * cos_ov).max(1.0e-6)
}
