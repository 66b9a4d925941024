//! The material sum type and its BSDF contract (spec.md §4.2).
//!
//! Every variant implements [`Bsdf`] directly (static dispatch, per the
//! design notes); [`Material`] is the closed sum type the renderer matches
//! on. Two cached flags, `is_diffuse`/`is_specular`, tell the renderers
//! which sampling paths to walk without re-deriving them from the variant
//! on every hit; composites (`Blended`, `Mapped`, `TwoSided`, ...) OR their
//! children's flags together at construction time.

pub mod composite;
pub mod lambertian;
pub mod layered;
pub mod microfacet;
pub mod refractive;
pub mod table;
pub mod tabulated;

use lumen_core::algebra::Vector2;
use lumen_core::prelude::*;
use lumen_scene::Texture;
use rand::Rng;

pub use composite::{Blended, ConcentrationMap, DepolarizedBRDF, Mapped, Sampled, SampledEntry, Textured, TwoSided};
pub use lambertian::{LambertianBRDF, RoughLambertian};
pub use layered::{Layer, LayeredBRDF, VarnishedLambertian};
pub use refractive::RefractiveBRDF;
pub use tabulated::{AlloyBRDF, BeckmannBRDF, MetalW, RegularBRDF};

/// The BSDF contract every material variant implements (spec.md §4.2,
/// points 1-6).
pub trait Bsdf {
    fn is_diffuse(&self) -> bool;
    fn is_specular(&self) -> bool;

    /// Evaluates the outgoing radiance along `out.ray` given incidence
    /// along `incident.ray`, writing the result into `out`.
    fn diffuse_reemited(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    );

    /// Applies the variant's specular reflectance (and, for refractive
    /// variants, transmittance) to every `LightData` entry of `incident`,
    /// writing the result into `out`.
    fn specular_reemited(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    );

    /// Emits the sampling rays `specular_reemited` expects: one reflected
    /// ray for a mirror, one reflected plus one refracted ray for a
    /// refractive material (folding the transmitted weight back into the
    /// reflected ray under total internal reflection).
    fn specular_sub_rays(&self, basis: &Basis, uv: Vector2<f32>, out: &LightVector, subrays: &mut Vec<LightVector>);

    /// Cosine-weighted secondary rays over the upper (and, for translucent
    /// variants, lower) hemisphere.
    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        basis: &Basis,
        uv: Vector2<f32>,
        out: &LightVector,
        nb_rays: usize,
        subrays: &mut Vec<LightVector>,
        rng: &mut R,
    );

    /// Russian-roulette photon transport; `specular` is set to whether this
    /// bounce should be treated as specular by the photon-map build.
    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool;

    /// Hemispherically integrated response to an isotropic ambient
    /// illuminant.
    fn diffuse_reemited_from_ambient(
        &self,
        basis: &Basis,
        uv: Vector2<f32>,
        out: &mut LightVector,
        ambient: &Spectrum,
    );
}

/// The closed material sum type (spec.md §4.2).
#[derive(Clone)]
pub enum Material {
    Lambertian(LambertianBRDF),
    RoughLambertian(RoughLambertian),
    Regular(RegularBRDF),
    Beckmann(BeckmannBRDF),
    Refractive(RefractiveBRDF),
    Alloy(AlloyBRDF),
    MetalW(MetalW),
    Layered(LayeredBRDF),
    VarnishedLambertian(VarnishedLambertian),
    Blended(Blended),
    Mapped(Box<Mapped>),
    ConcentrationMap(Box<ConcentrationMap>),
    Textured(Box<Textured>),
    TwoSided(Box<TwoSided>),
    Sampled(Sampled),
    Depolarized(Box<DepolarizedBRDF>),
}

macro_rules! dispatch {
    ($self:expr, $variant:ident => $body:expr) => {
        match $self {
            Material::Lambertian($variant) => $body,
            Material::RoughLambertian($variant) => $body,
            Material::Regular($variant) => $body,
            Material::Beckmann($variant) => $body,
            Material::Refractive($variant) => $body,
            Material::Alloy($variant) => $body,
            Material::MetalW($variant) => $body,
            Material::Layered($variant) => $body,
            Material::VarnishedLambertian($variant) => $body,
            Material::Blended($variant) => $body,
            Material::Mapped($variant) => $body,
            Material::ConcentrationMap($variant) => $body,
            Material::Textured($variant) => $body,
            Material::TwoSided($variant) => $body,
            Material::Sampled($variant) => $body,
            Material::Depolarized($variant) => $body,
        }
    };
}

impl Bsdf for Material {
    fn is_diffuse(&self) -> bool {
        dispatch!(self, m => m.is_diffuse())
    }

    fn is_specular(&self) -> bool {
        dispatch!(self, m => m.is_specular())
    }

    fn diffuse_reemited(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        dispatch!(self, m => m.diffuse_reemited(grid, basis, uv, incident, out))
    }

    fn specular_reemited(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        uv: Vector2<f32>,
        incident: &LightVector,
        out: &mut LightVector,
    ) {
        dispatch!(self, m => m.specular_reemited(grid, basis, uv, incident, out))
    }

    fn specular_sub_rays(&self, basis: &Basis, uv: Vector2<f32>, out: &LightVector, subrays: &mut Vec<LightVector>) {
        dispatch!(self, m => m.specular_sub_rays(basis, uv, out, subrays))
    }

    fn random_diffuse_rays<R: Rng + ?Sized>(
        &self,
        basis: &Basis,
        uv: Vector2<f32>,
        out: &LightVector,
        nb_rays: usize,
        subrays: &mut Vec<LightVector>,
        rng: &mut R,
    ) {
        dispatch!(self, m => m.random_diffuse_rays(basis, uv, out, nb_rays, subrays, rng))
    }

    fn bounce_photon<R: Rng + ?Sized>(
        &self,
        grid: &WavelengthGrid,
        basis: &Basis,
        uv: Vector2<f32>,
        photon: &mut MultispectralPhoton,
        specular: &mut bool,
        rng: &mut R,
    ) -> bool {
        dispatch!(self, m => m.bounce_photon(grid, basis, uv, photon, specular, rng))
    }

    fn diffuse_reemited_from_ambient(
        &self,
        basis: &Basis,
        uv: Vector2<f32>,
        out: &mut LightVector,
        ambient: &Spectrum,
    ) {
        dispatch!(self, m => m.diffuse_reemited_from_ambient(basis, uv, out, ambient))
    }
}

/// Cosine of the incidence angle between `basis.k` and a ray pointing
/// *into* the surface (i.e. `-dot(k, dir)`), clamped to `[0, 1]` so a ray
/// grazing or leaving through the back face reads as zero contribution
/// rather than a negative cosine.
pub(crate) fn cos_theta(basis: &Basis, dir: nalgebra::Vector3<f32>) -> f32 {
    (-basis.k.dot(&dir)).max(0.0)
}

/// The azimuth of `dir` (expressed in the surface tangent plane) relative
/// to the basis's own `i` axis, used by Oren-Nayar's `cos(φᵢ-φᵥ)` term.
pub(crate) fn azimuth(basis: &Basis, dir: nalgebra::Vector3<f32>) -> f32 {
    let local = basis.to_local(dir);
    local.y.atan2(local.x)
}

/// Resolves a texture's spectrum at `uv`, substituting a unit (white)
/// spectrum wherever the texture is absent or the sample falls outside a
/// non-repeating texture's bounds.
pub(crate) fn resolve_or_white(texture: &Texture, grid: &WavelengthGrid, uv: Vector2<f32>) -> Spectrum {
    texture
        .resolve_spectrum(grid, uv.x, uv.y)
        .unwrap_or_else(|| Spectrum::constant(grid.len(), 1.0))
}
