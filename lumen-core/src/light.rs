//! Per-wavelength Stokes-like polarization state.

use serde::{Deserialize, Serialize};

/// Radiance plus a Stokes-like polarization quadruple, relative to an
/// implicit reference frame whose "0°" direction is tracked by the owning
/// [`crate::light_vector::LightVector`].
///
/// The quadruple is kept verbatim as `(radiance, linear0, linear45, circular)`
/// rather than re-cast into a differently shaped type: the algebra below is
/// the invariant, not the layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LightData {
    pub radiance: f32,
    pub linear0: f32,
    pub linear45: f32,
    pub circular: f32,
}

impl LightData {
    pub fn new(radiance: f32) -> Self {
        Self {
            radiance,
            linear0: 0.0,
            linear45: 0.0,
            circular: 0.0,
        }
    }

    /// Overwrites radiance in place, leaving the polarization state untouched.
    #[inline]
    pub fn set_radiance(&mut self, radiance: f32) {
        self.radiance = radiance;
    }

    /// `max(-linear0, 0)`.
    #[inline]
    pub fn p_polarized(&self) -> f32 {
        (-self.linear0).max(0.0)
    }

    /// `max(linear0, 0)`.
    #[inline]
    pub fn s_polarized(&self) -> f32 {
        self.linear0.max(0.0)
    }

    pub fn mul(&mut self, factor: f32) {
        self.radiance *= factor;
        self.linear0 *= factor;
        self.linear45 *= factor;
        self.circular *= factor;
    }

    pub fn scaled(&self, factor: f32) -> Self {
        let mut out = *self;
        out.mul(factor);
        out
    }

    pub fn add(&self, other: &Self) -> Self {
        Self {
            radiance: self.radiance + other.radiance,
            linear0: self.linear0 + other.linear0,
            linear45: self.linear45 + other.linear45,
            circular: self.circular + other.circular,
        }
    }

    pub fn add_assign(&mut self, other: &Self) {
        *self = self.add(other);
    }

    /// Applies a Fresnel-like reflectance pair (or, with `sup_radiance`
    /// supplied, a blend towards an externally supplied incoherent
    /// radiance) to `source`, storing the result in `self`.
    ///
    /// Per Wilkie, "Combined Rendering of Polarization and Fluorescence
    /// Effects": `A = (r_orth+r_para)/2`, `B = (r_orth-r_para)/2`.
    pub fn apply_reflectance(&mut self, source: &Self, r_para: f32, r_orth: f32) {
        let a = (r_orth + r_para) * 0.5;
        let b = (r_orth - r_para) * 0.5;
        self.radiance = source.radiance * a + source.linear0 * b;
        self.linear0 = source.radiance * b + source.linear0 * a;
        self.linear45 = source.linear45;
        self.circular = source.circular;
    }

    /// Same as [`Self::apply_reflectance`], but blends the coherent term
    /// towards `sup_radiance` with mix factor `alpha` (used when folding an
    /// ambient or diffuse contribution into an otherwise specular sample).
    pub fn apply_reflectance_blended(
        &mut self,
        source: &Self,
        r_para: f32,
        r_orth: f32,
        sup_radiance: f32,
        alpha: f32,
    ) {
        let a = (r_orth + r_para) * 0.5;
        let b = (r_orth - r_para) * 0.5;
        self.radiance = (source.radiance * a + source.linear0 * b) * (1.0 - alpha) + sup_radiance * alpha;
        self.linear0 = source.radiance * b + source.linear0 * a;
        self.linear45 = source.linear45;
        self.circular = source.circular;
    }

    /// Rotates the reference frame by `angle` radians (standard 2θ rotation
    /// algebra for Stokes-like linear components).
    pub fn rotate(&mut self, angle: f32) {
        let cos2 = (2.0 * angle).cos();
        let sin2 = (2.0 * angle).sin();
        let linear0 = self.linear0;
        let linear45 = self.linear45;
        self.linear0 = linear0 * cos2 + linear45 * sin2;
        self.linear45 = -linear0 * sin2 + linear45 * cos2;
    }

    pub fn rotated(&self, angle: f32) -> Self {
        let mut out = *self;
        out.rotate(angle);
        out
    }

    /// Applies an ideal linear polarizer tilted at `angle` radians.
    pub fn apply_linear_filter(&mut self, angle: f32) {
        let cos2 = (2.0 * angle).cos();
        let sin2 = (2.0 * angle).sin();
        let radiance = self.radiance;
        let linear0 = self.linear0;
        let linear45 = self.linear45;

        self.radiance = 0.5 * (radiance + cos2 * linear0 + sin2 * linear45);
        self.linear0 = 0.5 * (cos2 * radiance + cos2 * cos2 * linear0 + sin2 * cos2 * linear45);
        self.linear45 = 0.5 * (sin2 * radiance + cos2 * sin2 * linear0 + sin2 * sin2 * linear45);
        self.circular = 0.0;
    }

    /// Mirrors the handedness of the polarization ellipse for reversed
    /// propagation. Note only `linear45` and `circular` flip; `linear0` is
    /// unaffected, which is the source of the asymmetry between "change
    /// incident frame" and "change reemited frame" on [`crate::light_vector::LightVector`].
    pub fn flip(&mut self) {
        self.linear45 *= -1.0;
        self.circular *= -1.0;
    }

    pub fn flipped(&self) -> Self {
        let mut out = *self;
        out.flip();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &LightData, b: &LightData, eps: f32) {
        assert!((a.radiance - b.radiance).abs() < eps);
        assert!((a.linear0 - b.linear0).abs() < eps);
        assert!((a.linear45 - b.linear45).abs() < eps);
        assert!((a.circular - b.circular).abs() < eps);
    }

    #[test]
    fn rotate_round_trip() {
        let d = LightData {
            radiance: 1.0,
            linear0: 0.3,
            linear45: -0.2,
            circular: 0.1,
        };
        let back = d.rotated(0.77).rotated(-0.77);
        approx_eq(&d, &back, 1e-4);
    }

    #[test]
    fn polarizer_idempotent_up_to_first_projection() {
        let d = LightData {
            radiance: 1.0,
            linear0: 0.4,
            linear45: 0.2,
            circular: 0.3,
        };
        let mut once = d;
        once.apply_linear_filter(0.6);
        let mut twice = once;
        twice.apply_linear_filter(0.6);
        approx_eq(&once, &twice, 1e-4);
    }

    #[test]
    fn p_and_s_polarized_are_nonnegative_and_disjoint() {
        let positive = LightData {
            linear0: 0.5,
            ..Default::default()
        };
        assert_eq!(positive.p_polarized(), 0.0);
        assert_eq!(positive.s_polarized(), 0.5);

        let negative = LightData {
            linear0: -0.5,
            ..Default::default()
        };
        assert_eq!(negative.p_polarized(), 0.5);
        assert_eq!(negative.s_polarized(), 0.0);
    }

    #[test]
    fn flip_only_touches_linear45_and_circular() {
        let d = LightData {
            radiance: 1.0,
            linear0: 0.5,
            linear45: 0.25,
            circular: 0.1,
        };
        let f = d.flipped();
        assert_eq!(f.radiance, d.radiance);
        assert_eq!(f.linear0, d.linear0);
        assert_eq!(f.linear45, -d.linear45);
        assert_eq!(f.circular, -d.circular);
    }
}
