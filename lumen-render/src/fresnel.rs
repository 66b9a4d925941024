//! Dielectric Fresnel formulas and the reflect/refract vector ops shared by
//! every specular material variant. Grounded on
//! `original_source/sources/include/physics/DielectricFormula.hpp`.

use nalgebra::Vector3;

/// Real-valued Fresnel reflectance for a dielectric of real index `n` at
/// `cos_oi = -dot(normal, incident)`. `kappa` is the extinction coefficient
/// (`N = n(1 + i*kappa)`); `kappa = 0` recovers the lossless dielectric
/// case. Clamped to `[0, 1]` per spec.md §7's numerical-anomaly policy
/// (floating-point drift can otherwise push the magnitude fractionally
/// above 1 at grazing angles).
pub fn fresnel_reflectance(cos_oi: f32, n: f32, kappa: f32) -> (f32, f32) {
    let cos2_oi = cos_oi * cos_oi;
    let sin2_oi = 1.0 - cos2_oi;

    // Complex relative index N^2 = n^2 (1 - kappa^2 + 2i*kappa).
    let n2_re = n * n * (1.0 - kappa * kappa);
    let n2_im = n * n * 2.0 * kappa;

    let (gamma_re, gamma_im) = complex_sqrt(n2_re - sin2_oi, n2_im);

    let r_para = complex_abs(
        n2_re * cos_oi - gamma_re,
        n2_im * cos_oi - gamma_im,
        n2_re * cos_oi + gamma_re,
        n2_im * cos_oi + gamma_im,
    );
    let r_orth = complex_abs(cos_oi - gamma_re, -gamma_im, cos_oi + gamma_re, gamma_im);

    (r_orth.min(1.0), r_para.min(1.0))
}

fn complex_sqrt(re: f32, im: f32) -> (f32, f32) {
    let r = (re * re + im * im).sqrt().sqrt();
    let theta = im.atan2(re) * 0.5;
    (r * theta.cos(), r * theta.sin())
}

/// `|num/den|` for complex `num`, `den` given as `(re, im)` pairs.
fn complex_abs(num_re: f32, num_im: f32, den_re: f32, den_im: f32) -> f32 {
    let num_mag = (num_re * num_re + num_im * num_im).sqrt();
    let den_mag = (den_re * den_re + den_im * den_im).sqrt();
    if den_mag < 1.0e-12 {
        0.0
    } else {
        num_mag / den_mag
    }
}

/// Beer-Lambert-style dielectric absorption through a path of `distance`
/// world units at `wavelength_m` meters, identical in form to
/// `Medium::dielectric_absorption` but kept here too since specular
/// transmission folds it directly into (T∥, T⊥) scaling rather than going
/// through a `Medium`.
pub fn dielectric_absorption(distance: f32, wavelength_m: f32, k: f32) -> f32 {
    let a = (4.0 * std::f32::consts::PI * k) / wavelength_m;
    (-a * distance).exp()
}

/// Mirror-reflects `incoming` (pointing *into* the surface) about `normal`.
pub fn reflect(normal: Vector3<f32>, incoming: Vector3<f32>) -> Vector3<f32> {
    let cos_oi = -normal.dot(&incoming);
    incoming + normal * (2.0 * cos_oi)
}

/// Refracts `incoming` through an interface of relative index `n = n2/n1`,
/// flipping the normal automatically when the ray approaches from the
/// medium's own side. Returns `None` on total internal reflection.
pub fn refract(normal: Vector3<f32>, n: f32, incoming: Vector3<f32>) -> Option<Vector3<f32>> {
    let cos_oi = -normal.dot(&incoming);
    if cos_oi < 0.0 {
        return refract(-normal, 1.0 / n, incoming);
    }
    let n2 = n * n;
    let sin2_oi = 1.0 - cos_oi * cos_oi;
    if sin2_oi / n2 > 1.0 {
        return None;
    }
    let cos_ov = (1.0 - sin2_oi / n2).sqrt();
    let out = (incoming + normal * cos_oi) / n - normal * cos_ov;
    Some(out.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_incidence_reflectance_matches_classical_formula() {
        let (r_orth, r_para) = fresnel_reflectance(1.0, 1.5, 0.0);
        let expected = ((1.5 - 1.0) / (1.5 + 1.0)).powi(2);
        assert!((r_orth - expected).abs() < 1.0e-3);
        assert!((r_para - expected).abs() < 1.0e-3);
    }

    #[test]
    fn reflectance_is_always_in_unit_interval() {
        for i in 0..=20 {
            let cos_oi = (i as f32 / 20.0).max(1.0e-3);
            for &n in &[0.2f32, 1.0, 1.5, 3.0, 10.0] {
                let (r_orth, r_para) = fresnel_reflectance(cos_oi, n, 0.0);
                assert!((0.0..=1.0).contains(&r_orth));
                assert!((0.0..=1.0).contains(&r_para));
            }
        }
    }

    #[test]
    fn reflect_preserves_length_and_bounces_off_plane() {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let incoming = Vector3::new(1.0, 0.0, -1.0).normalize();
        let out = reflect(normal, incoming);
        assert!((out.norm() - 1.0).abs() < 1.0e-5);
        assert!(out.z > 0.0);
    }

    #[test]
    fn refract_returns_none_past_critical_angle() {
        // Going from dense (n=1.5) to rare (n=1.0) medium: relative index
        // n2/n1 = 1.0/1.5, grazing incidence should total-internal-reflect.
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let incoming = Vector3::new(0.999, 0.0, -0.05).normalize();
        assert!(refract(normal, 1.0 / 1.5, incoming).is_none());
    }

    #[test]
    fn refract_straight_through_is_unchanged_at_matched_index() {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let incoming = Vector3::new(0.0, 0.0, -1.0);
        let out = refract(normal, 1.0, incoming).unwrap();
        assert!((out - incoming).norm() < 1.0e-5);
    }
}
