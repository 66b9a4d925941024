//! Thin-film and varnish layering. Grounded on
//! `original_source/sources/include/physics/LayeredSystemComputer.hpp`
//! (`computeSpecularLayerSystem`'s recursive per-interface combination of
//! coherent reflectance across a layer stack) and
//! `original_source/sources/include/materials/RoughVarnishedLambertianBRDF.hpp`
//! (varnish-over-Lambertian-substrate split into a specular top reflection
//! plus a "deep" substrate contribution attenuated by the double pass
//! through the varnish).

use super::table::AngleTable;
use super::Bsdf;
use lumen_core::algebra::Vector2;
use lumen_core::prelude::*;
use rand::Rng;

#[derive(Clone, Copy, Debug, Default)]
struct Complex {
    re: f32,
    im: f32,
}

impl Complex {
    fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    fn modulus2(self) -> f32 {
        self.re * self.re + self.im * self.im
    }

    fn add(self, other: Complex) -> Complex {
        Complex::new(self.re + other.re, self.im + other.im)
    }

    fn sub(self, other: Complex) -> Complex {
        Complex::new(self.re - other.re, self.im - other.im)
    }

    fn mul(self, other: Complex) -> Complex {
        Complex::new(self.re * other.re - self.im * other.im, self.re * other.im + self.im * other.re)
    }

    fn div(self, other: Complex) -> Complex {
        let denom = other.modulus2().max(1.0e-12);
        Complex::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        )
    }

    fn sqrt(self) -> Complex {
        let r = self.modulus2().sqrt().sqrt();
        let theta = self.im.atan2(self.re) * 0.5;
        Complex::new(r * theta.cos(), r * theta.sin())
    }

    /// `exp(i * (phase + i*decay)) = exp(-decay) * (cos(phase) + i*sin(phase))`.
    fn cis_decay(phase: f32, decay: f32) -> Complex {
        let scale = (-decay).exp();
        Complex::new(scale * phase.cos(), scale * phase.sin())
    }

    const ONE: Complex = Complex { re: 1.0, im: 0.0 };
}

/// One layer of a thin-film stack: complex index of refraction `n + ik` per
/// wavelength, plus a thickness in meters (ignored for the outermost and
/// innermost semi-infinite layers).
#[derive(Clone)]
pub struct Layer {
    pub n: Spectrum,
    pub k: Spectrum,
    pub thickness: f32,
}

impl Layer {
    pub fn new(n: Spectrum, k: Spectrum, thickness: f32) -> Self {
        Self { n, k, thickness }
    }

    fn index(&self, band: usize) -> Complex {
        Complex::new(self.n[band], self.k[band])
    }
}

/// Complex cosine of the refraction angle in `layer`, given the complex
/// sine of the angle carried down from the incidence medium (Snell's law
/// generalizes directly to complex indices).
fn cos_theta_in_layer(sin_theta: Complex) -> Complex {
    let one = Complex::ONE;
    one.sub(sin_theta.mul(sin_theta)).sqrt()
}

/// Complex amplitude reflectance at one interface, for both polarizations.
fn interface_amplitude(n1: Complex, cos1: Complex, n2: Complex, cos2: Complex) -> (Complex, Complex) {
    let n1_cos1 = n1.mul(cos1);
    let n2_cos2 = n2.mul(cos2);
    let n2_cos1 = n2.mul(cos1);
    let n1_cos2 = n1.mul(cos2);
    let r_s = n1_cos1.sub(n2_cos2).div(n1_cos1.add(n2_cos2));
    let r_p = n2_cos1.sub(n1_cos2).div(n2_cos1.add(n1_cos2));
    (r_s, r_p)
}

/// Recursively Airy-sums a coherent stack's reflectance for a single
/// wavelength band, from the bottom (substrate) interface upward.
fn stack_reflectance(layers: &[Layer], band: usize, wavelength_nm: f32, cos_oi: f32) -> (f32, f32) {
    let n_layers = layers.len();
    debug_assert!(n_layers >= 2);

    let n0 = layers[0].index(band);
    let sin_oi = Complex::new((1.0 - cos_oi * cos_oi).max(0.0).sqrt(), 0.0);
    let sin0_n0 = sin_oi.mul(n0);

    let mut cos_angles = Vec::with_capacity(n_layers);
    cos_angles.push(Complex::new(cos_oi, 0.0));
    for layer in &layers[1..] {
        let sin_here = sin0_n0.div(layer.index(band));
        cos_angles.push(cos_theta_in_layer(sin_here));
    }

    let last = n_layers - 1;
    let (mut r_s, mut r_p) = interface_amplitude(
        layers[last - 1].index(band),
        cos_angles[last - 1],
        layers[last].index(band),
        cos_angles[last],
    );

    for j in (0..last - 1).rev() {
        let (r_here_s, r_here_p) = interface_amplitude(layers[j].index(band), cos_angles[j], layers[j + 1].index(band), cos_angles[j + 1]);
        let wavelength_m = wavelength_nm * 1.0e-9;
        let n_next = layers[j + 1].index(band);
        let phase = 4.0 * std::f32::consts::PI * n_next.re * layers[j + 1].thickness * cos_angles[j + 1].re / wavelength_m;
        let decay = 4.0 * std::f32::consts::PI * n_next.im * layers[j + 1].thickness * cos_angles[j + 1].re / wavelength_m;
        let phase_factor = Complex::cis_decay(phase, decay);

        r_s = r_here_s.add(r_s.mul(phase_factor)).div(Complex::ONE.add(r_here_s.mul(r_s).mul(phase_factor)));
        r_p = r_here_p.add(r_p.mul(phase_factor)).div(Complex::ONE.add(r_here_p.mul(r_p).mul(phase_factor)));
    }

    (r_s.modulus2().min(1.0), r_p.modulus2().min(1.0))
}

/// A coherent thin-film stack on top of a specular substrate, evaluated
/// exactly (recomputed per call) rather than pre-tabulated, since the
/// reflectance depends on both incidence angle and wavelength through the
/// interference term.
#[derive(Clone)]
pub struct LayeredBRDF {
    layers: Vec<Layer>,
}

impl LayeredBRDF {
    /// `layers[0]` is the external (semi-infinite) medium, `layers[last]`
    /// the substrate (also treated as semi-infinite); everything between
    /// is a finite-thickness film.
    pub fn new(layers: Vec<Layer>) -> Self {
        assert!(layers.len() >= 2, "a layered stack needs at least an external medium and a substrate");
        Self { layers }
    }
}

impl Bsdf for LayeredBRDF {
    fn is_diffuse(&self) -> bool {
        false
    }

    fn is_specular(&self) -> bool {
        true
    }

    fn diffuse_reemited(
        &self,
        _grid: &WavelengthGrid,
        _basis: &Basis,
        _uv: Vector2<f32>,
        _incident: &LightVector,
        out: &mut LightVector,
    ) {
        out.clear();
    }

    fn specular_reemited(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -basis.k.dot(&incident.ray.dir);
        if cos_oi <= 0.0 {
            for i in 0..out.len() {
                let source = out.data()[i];
                out.data_mut()[i].apply_reflectance(&source, 1.0, 1.0);
            }
            return;
        }
        let mut local_incident = incident.clone();
        local_incident.change_incident_frame(basis.k);
        for d in local_incident.data_mut() {
            d.flip();
        }
        out.change_reemited_frame(basis.k);
        for i in 0..out.len() {
            let (r_orth, r_para) = stack_reflectance(&self.layers, i, grid.wavelength(i), cos_oi);
            let source = local_incident.data()[i];
            out.data_mut()[i].apply_reflectance(&source, r_para, r_orth);
        }
    }

    fn specular_sub_rays(&self, basis: &Basis, _uv: Vector2<f32>, out: &LightVector, subrays: &mut Vec<LightVector>) {
        let reflected = crate::fresnel::reflect(basis.k, out.ray.dir);
        let mut subray = LightVector::zero(Ray::new(basis.origin, reflected), 0.0, out.len());
        subray.change_reemited_frame(basis.k);
        subrays.push(subray);
    }

    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        _basis: &Basis,
        _uv: Vector2<f32>,
        _out: &LightVector,
        _nb_rays: usize,
        _subrays: &mut Vec<LightVector>,
        _rng: &mut R,
    ) {
    }

    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool {
        let normal = basis.k;
        let cos_oi = -normal.dot(&photon.direction);
        if cos_oi < 0.0 {
            return false;
        }
        let mut mean = 0.0f32;
        for i in 0..photon.radiance.len() {
            let (r_orth, r_para) = stack_reflectance(&self.layers, i, grid.wavelength(i), cos_oi);
            photon.radiance[i] *= (r_orth + r_para) * 0.5;
            mean += photon.radiance[i];
        }
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        for r in photon.radiance.iter_mut() {
            *r /= mean;
        }
        photon.direction = crate::fresnel::reflect(normal, photon.direction);
        *specular = true;
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 {
            out.clear();
            return;
        }
        out.clear();
        let _ = ambient;
        out.change_reemited_frame(basis.k);
    }
}

/// A varnish layer over a Lambertian substrate: a specular Fresnel
/// reflection off the varnish's outer face (table-driven, per
/// [`AngleTable`]) combined with the substrate's diffuse response,
/// attenuated by the transmittance through the varnish on the way in and
/// out (`T12`/`T21` tables) and by the geometric series of internal
/// reflections at the varnish/substrate interface (`R21`, substrate
/// albedo `R23`) — the standard "clear coat over diffuse base" combination
/// rule for a non-scattering coating.
#[derive(Clone)]
pub struct VarnishedLambertian {
    top_reflectance: AngleTable,
    transmittance_in: AngleTable,
    transmittance_out: AngleTable,
    internal_reflectance: AngleTable,
    substrate_reflectance: Spectrum,
}

impl VarnishedLambertian {
    pub fn new(
        top_reflectance: AngleTable,
        transmittance_in: AngleTable,
        transmittance_out: AngleTable,
        internal_reflectance: AngleTable,
        substrate_reflectance: Spectrum,
    ) -> Self {
        Self {
            top_reflectance,
            transmittance_in,
            transmittance_out,
            internal_reflectance,
            substrate_reflectance,
        }
    }

    /// `T12(cosOi) * T21(cosOv) * R23 / (1 - R21(cosOv) * R23)`: one pass in,
    /// one diffuse bounce off the substrate, then a geometric series over
    /// repeated internal reflections back down into the substrate.
    fn deep_reflectance(&self, cos_oi: f32, cos_ov: f32, band: usize) -> f32 {
        let (t12_orth, t12_para) = self.transmittance_in.sample(cos_oi, band);
        let (t21_orth, t21_para) = self.transmittance_out.sample(cos_ov, band);
        let (r21_orth, r21_para) = self.internal_reflectance.sample(cos_ov, band);
        let t_in = (t12_orth + t12_para) * 0.5;
        let t_out = (t21_orth + t21_para) * 0.5;
        let r_internal = (r21_orth + r21_para) * 0.5;
        let substrate = self.substrate_reflectance[band];
        let denom = (1.0 - r_internal * substrate).max(1.0e-3);
        t_in * t_out * substrate / denom
    }
}

impl Bsdf for VarnishedLambertian {
    fn is_diffuse(&self) -> bool {
        true
    }

    fn is_specular(&self) -> bool {
        true
    }

    fn diffuse_reemited(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -incident.ray.dir.dot(&basis.k);
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_oi <= 0.0 || cos_ov <= 0.0 {
            out.clear();
            return;
        }
        let one_over_pi = std::f32::consts::FRAC_1_PI;
        for i in 0..out.len() {
            let deep = self.deep_reflectance(cos_oi, cos_ov, i);
            out.data_mut()[i] = LightData::new(incident.data()[i].radiance * one_over_pi * cos_oi * deep);
        }
        out.change_reemited_frame(basis.k);
    }

    fn specular_reemited(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        let cos_oi = -basis.k.dot(&incident.ray.dir);
        if cos_oi <= 0.0 {
            out.clear();
            return;
        }
        let mut local_incident = incident.clone();
        local_incident.change_incident_frame(basis.k);
        for d in local_incident.data_mut() {
            d.flip();
        }
        out.change_reemited_frame(basis.k);
        for i in 0..out.len() {
            let (r_orth, r_para) = self.top_reflectance.sample(cos_oi, i);
            let source = local_incident.data()[i];
            out.data_mut()[i].apply_reflectance(&source, r_para, r_orth);
        }
    }

    fn specular_sub_rays(&self, basis: &Basis, _uv: Vector2<f32>, out: &LightVector, subrays: &mut Vec<LightVector>) {
        let reflected = crate::fresnel::reflect(basis.k, out.ray.dir);
        let mut subray = LightVector::zero(Ray::new(basis.origin, reflected), 0.0, out.len());
        subray.change_reemited_frame(basis.k);
        subrays.push(subray);
    }

    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        basis: &Basis,
        _uv: Vector2<f32>,
        out: &LightVector,
        nb_rays: usize,
        subrays: &mut Vec<LightVector>,
        rng: &mut R,
    ) {
        let normal = basis.k;
        if normal.dot(&out.ray.dir) > 0.0 {
            return;
        }
        for _ in 0..nb_rays {
            let dir = super::lambertian::rejection_sample_hemisphere(normal, rng);
            super::lambertian::push_diffuse_subray(normal, basis.origin, out.len(), subrays, dir);
        }
    }

    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        _grid: &WavelengthGrid,
        basis: &Basis,
        _uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool {
        let normal = basis.k;
        let cos_oi = -normal.dot(&photon.direction);
        if cos_oi < 0.0 {
            return false;
        }
        let (r_orth, r_para) = self.top_reflectance.sample(cos_oi, 0);
        let top_mean = (r_orth + r_para) * 0.5;
        if rng.gen::<f32>() < top_mean {
            photon.direction = crate::fresnel::reflect(normal, photon.direction);
            *specular = true;
            return true;
        }
        let n = photon.radiance.len();
        let mut mean = 0.0f32;
        for i in 0..n {
            photon.radiance[i] *= self.deep_reflectance(cos_oi, 1.0, i);
            mean += photon.radiance[i];
        }
        if mean <= 0.0 || rng.gen::<f32>() > mean {
            return false;
        }
        for r in photon.radiance.iter_mut() {
            *r /= mean;
        }
        photon.direction = super::lambertian::rejection_sample_hemisphere(normal, rng);
        *specular = false;
        true
    }

    fn diffuse_reemited_from_ambient(&self, basis: &Basis, _uv: Vector2<f32>, out: &mut LightVector, ambient: &Spectrum) {
        let cos_ov = -out.ray.dir.dot(&basis.k);
        if cos_ov <= 0.0 {
            out.clear();
            return;
        }
        let one_over_pi = std::f32::consts::FRAC_1_PI;
        for i in 0..out.len() {
            let deep = self.deep_reflectance(1.0, cos_ov, i);
            out.data_mut()[i] = LightData::new(ambient[i] * one_over_pi * deep);
        }
        out.change_reemited_frame(basis.k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_interface_stack_matches_normal_incidence_fresnel() {
        let air = Layer::new(Spectrum::constant(1, 1.0), Spectrum::zero(1), 0.0);
        let glass = Layer::new(Spectrum::constant(1, 1.5), Spectrum::zero(1), 0.0);
        let (r_s, r_p) = stack_reflectance(&[air, glass], 0, 550.0, 1.0);
        let expected = ((1.5 - 1.0) / (1.5 + 1.0)).powi(2);
        assert!((r_s - expected).abs() < 1.0e-3);
        assert!((r_p - expected).abs() < 1.0e-3);
    }

    #[test]
    fn stack_reflectance_stays_bounded() {
        let air = Layer::new(Spectrum::constant(1, 1.0), Spectrum::zero(1), 0.0);
        let film = Layer::new(Spectrum::constant(1, 1.3), Spectrum::zero(1), 2.0e-7);
        let glass = Layer::new(Spectrum::constant(1, 1.5), Spectrum::zero(1), 0.0);
        for i in 0..10 {
            let cos_oi = (i as f32 / 10.0).max(0.05);
            let (r_s, r_p) = stack_reflectance(&[air.clone(), film.clone(), glass.clone()], 0, 550.0, cos_oi);
            assert!((0.0..=1.0).contains(&r_s));
            assert!((0.0..=1.0).contains(&r_p));
        }
    }
}
