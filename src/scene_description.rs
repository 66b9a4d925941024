//! A minimal `ron`/`serde` scene-description format (spec.md §6).
//!
//! The scene-description text parser itself is explicitly out of scope
//! (spec.md §1: "specified only at their interface boundary"): what *is*
//! in scope is the boundary a parser would hand off to — a `Scenery`, a
//! list of `Camera`s, and a `ColorHandler`, ready for a renderer strategy
//! to drive. This module is that boundary, filled in with a deliberately
//! small `serde` surface rather than a general-purpose scene language: one
//! material family per practical case (`Lambertian`/`RoughLambertian` for
//! diffuse surfaces, `Refractive` built from a refractive index for
//! glass), `Sphere`/`Triangle`/`Null` shapes, the three light source
//! kinds, all four camera projections, and the color handlers that don't
//! need a pre-existing texture file on disk (texture/mesh file loading is
//! out of scope per spec.md §1 alongside the parser itself).

use lumen_core::algebra::Vector3;
use lumen_core::prelude::*;
use lumen_render::material::{LambertianBRDF, RefractiveBRDF, RoughLambertian};
use lumen_render::{ColorHandler, Material, PhotonMappingParams};
use lumen_scene::{
    Camera, DirectionalSource, FishEyeCamera, LightSource, Object, OrthoscopicCamera, PerspectiveCamera, PlaneSource, PointSource,
    PolarCamera, Scenery, SceneryBuilder, Shape, Source, Sphere, Triangle,
};
use serde::Deserialize;

pub type Vec3 = (f32, f32, f32);

fn v3(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.0, v.1, v.2)
}

#[derive(Deserialize)]
pub struct GridDescription {
    pub start_nm: f32,
    pub end_nm: f32,
    pub count: usize,
}

impl GridDescription {
    pub fn build(&self) -> Result<WavelengthGrid, GridError> {
        WavelengthGrid::uniform(self.start_nm, self.end_nm, self.count)
    }
}

#[derive(Deserialize)]
pub enum MaterialDescription {
    Lambertian { reflectance: Vec<f32>, transmittance: Vec<f32>, opaque: bool },
    RoughLambertian { reflectance: Vec<f32>, sigma: f32 },
    Refractive { index: Vec<f32>, rows: usize, dispersion: bool, photon_dispersion: bool },
}

impl MaterialDescription {
    /// `pub` (unlike the other description types' `build`) since the
    /// `--brdf` CLI mode samples a material in isolation, without building
    /// the rest of the scene graph around it.
    pub fn build(&self, grid: &WavelengthGrid) -> Material {
        match self {
            MaterialDescription::Lambertian { reflectance, transmittance, opaque } => {
                Material::Lambertian(LambertianBRDF::new(Spectrum::from_values(reflectance.clone()), Spectrum::from_values(transmittance.clone()), *opaque))
            }
            MaterialDescription::RoughLambertian { reflectance, sigma } => Material::RoughLambertian(RoughLambertian::new(Spectrum::from_values(reflectance.clone()), *sigma)),
            MaterialDescription::Refractive { index, rows, dispersion, photon_dispersion } => {
                Material::Refractive(RefractiveBRDF::dielectric(grid, Spectrum::from_values(index.clone()), *rows, *dispersion, *photon_dispersion))
            }
        }
    }
}

#[derive(Deserialize)]
pub enum ShapeDescription {
    Sphere { center: Vec3, radius: f32 },
    Triangle { a: Vec3, b: Vec3, c: Vec3, double_sided: bool },
    Null { at: Vec3 },
}

impl ShapeDescription {
    fn build(&self) -> Shape {
        match self {
            ShapeDescription::Sphere { center, radius } => Shape::Sphere(Sphere::new(v3(*center), *radius)),
            ShapeDescription::Triangle { a, b, c, double_sided } => {
                let (a, b, c) = (v3(*a), v3(*b), v3(*c));
                let normal = (b - a).cross(&(c - a)).normalize();
                Shape::Triangle(Triangle {
                    a,
                    b,
                    c,
                    na: normal,
                    nb: normal,
                    nc: normal,
                    uva: lumen_core::algebra::Vector2::new(0.0, 0.0),
                    uvb: lumen_core::algebra::Vector2::new(1.0, 0.0),
                    uvc: lumen_core::algebra::Vector2::new(0.0, 1.0),
                    double_sided: *double_sided,
                })
            }
            ShapeDescription::Null { at } => Shape::Null(v3(*at)),
        }
    }
}

#[derive(Deserialize)]
pub struct ObjectDescription {
    pub shape: ShapeDescription,
    pub material: usize,
}

#[derive(Deserialize)]
pub enum SourceDescription {
    Point { spectrum: Vec<f32>, power: f32, origin: Vec3 },
    Directional { spectrum: Vec<f32>, power: f32, direction: Vec3, u: Vec3, v: Vec3, origin: Vec3 },
    Plane { spectrum: Vec<f32>, power: f32, origin: Vec3, normal: Vec3, sample_count: usize, shape: ShapeDescription },
}

impl SourceDescription {
    fn build(&self) -> Source {
        match self {
            SourceDescription::Point { spectrum, power, origin } => Source::new(
                LightSource::Point(PointSource::new(Spectrum::from_values(spectrum.clone()), *power, v3(*origin))),
                Shape::Null(v3(*origin)),
            ),
            SourceDescription::Directional { spectrum, power, direction, u, v, origin } => Source::new(
                LightSource::Directional(DirectionalSource::new(
                    Spectrum::from_values(spectrum.clone()),
                    *power,
                    v3(*direction),
                    v3(*u),
                    v3(*v),
                    v3(*origin),
                )),
                Shape::Null(v3(*origin)),
            ),
            SourceDescription::Plane { spectrum, power, origin, normal, sample_count, shape } => {
                let basis = Basis::from_normal(v3(*origin), v3(*normal));
                Source::new(
                    LightSource::Plane(PlaneSource::new(Spectrum::from_values(spectrum.clone()), *power, basis, *sample_count)),
                    shape.build(),
                )
            }
        }
    }
}

#[derive(Deserialize)]
pub enum CameraDescription {
    Perspective { width: u32, height: u32, fov_degrees: f32, origin: Vec3, lookat: Vec3, up: Vec3 },
    Orthoscopic { width: u32, height: u32, real_height: f32, origin: Vec3, lookat: Vec3, up: Vec3 },
    FishEye { width: u32, height: u32, origin: Vec3 },
    Polar { width: u32, height: u32, origin: Vec3 },
}

impl CameraDescription {
    fn build(&self) -> (Camera, u32, u32) {
        match self {
            CameraDescription::Perspective { width, height, fov_degrees, origin, lookat, up } => {
                (Camera::Perspective(PerspectiveCamera::new(*width, *height, *fov_degrees, v3(*origin), v3(*lookat), v3(*up))), *width, *height)
            }
            CameraDescription::Orthoscopic { width, height, real_height, origin, lookat, up } => {
                (Camera::Orthoscopic(OrthoscopicCamera::new(*width, *height, *real_height, v3(*origin), v3(*lookat), v3(*up))), *width, *height)
            }
            CameraDescription::FishEye { width, height, origin } => (Camera::FishEye(FishEyeCamera::new(*width, *height, v3(*origin))), *width, *height),
            CameraDescription::Polar { width, height, origin } => (Camera::Polar(PolarCamera::new(*width, *height, v3(*origin))), *width, *height),
        }
    }
}

#[derive(Deserialize)]
pub enum EnvironmentDescription {
    Spectral { spectrum: Vec<f32>, amount: f32 },
}

impl EnvironmentDescription {
    fn build(&self) -> lumen_scene::Environment {
        match self {
            EnvironmentDescription::Spectral { spectrum, amount } => lumen_scene::Environment::Spectral {
                spectrum: Spectrum::from_values(spectrum.clone()),
                amount: *amount,
            },
        }
    }
}

#[derive(Deserialize)]
pub enum ColorHandlerDescription {
    Spectrum,
    SimpleRgb,
    Rgb { gain: f32 },
    Cie { input_white: IlluminantDescription, output_white: IlluminantDescription, method: ChromaticAdaptationDescription },
    Polarization { up: Vec3 },
}

#[derive(Deserialize)]
pub enum IlluminantDescription {
    A,
    D50,
    D55,
    D65,
    D75,
    E,
}

#[derive(Deserialize)]
pub enum ChromaticAdaptationDescription {
    None,
    XyzScaling,
    Bradford,
    VonKries,
    Ciecat02,
}

impl ColorHandlerDescription {
    fn build(&self) -> ColorHandler {
        use lumen_render::color::{ChromaticAdaptation, CieHandler, Illuminant, PolarizationHandler, RgbHandler, SimpleRgbHandler, SpectrumHandler};
        match self {
            ColorHandlerDescription::Spectrum => ColorHandler::Spectrum(SpectrumHandler),
            ColorHandlerDescription::SimpleRgb => ColorHandler::SimpleRgb(SimpleRgbHandler),
            ColorHandlerDescription::Rgb { gain } => ColorHandler::Rgb(RgbHandler::new(*gain)),
            ColorHandlerDescription::Cie { input_white, output_white, method } => {
                let illuminant = |d: &IlluminantDescription| match d {
                    IlluminantDescription::A => Illuminant::A,
                    IlluminantDescription::D50 => Illuminant::D50,
                    IlluminantDescription::D55 => Illuminant::D55,
                    IlluminantDescription::D65 => Illuminant::D65,
                    IlluminantDescription::D75 => Illuminant::D75,
                    IlluminantDescription::E => Illuminant::E,
                };
                let method = match method {
                    ChromaticAdaptationDescription::None => ChromaticAdaptation::None,
                    ChromaticAdaptationDescription::XyzScaling => ChromaticAdaptation::XyzScaling,
                    ChromaticAdaptationDescription::Bradford => ChromaticAdaptation::Bradford,
                    ChromaticAdaptationDescription::VonKries => ChromaticAdaptation::VonKries,
                    ChromaticAdaptationDescription::Ciecat02 => ChromaticAdaptation::Ciecat02,
                };
                ColorHandler::Cie(CieHandler::new(illuminant(input_white), illuminant(output_white), method))
            }
            ColorHandlerDescription::Polarization { up } => ColorHandler::Polarization(PolarizationHandler::new(v3(*up))),
        }
    }
}

#[derive(Deserialize)]
pub enum RendererDescription {
    Simple { max_depth: u32, ambient: Vec<f32> },
    PhotonMapping {
        max_depth: u32,
        n_global: usize,
        n_caustic: usize,
        r_global: f32,
        r_caustic: f32,
        min_photons_for_estimate: usize,
        fallback_diffuse_samples: usize,
    },
    Test,
}

/// The whole scene-description document: a wavelength grid, the scene
/// graph, every camera, the color handler to project through, and which
/// renderer strategy to drive it with — everything the `executor` binary
/// needs to render, per spec.md §6's CLI taking a single `<scenery-file>`.
#[derive(Deserialize)]
pub struct SceneDescription {
    pub grid: GridDescription,
    pub bias: f32,
    pub materials: Vec<MaterialDescription>,
    pub objects: Vec<ObjectDescription>,
    pub sources: Vec<SourceDescription>,
    pub cameras: Vec<CameraDescription>,
    pub environment: Option<EnvironmentDescription>,
    pub color_handler: ColorHandlerDescription,
    pub renderer: RendererDescription,
}

pub enum RendererChoice {
    Simple(lumen_render::SimpleRenderer),
    PhotonMapping(PhotonMappingParams),
    Test,
}

pub struct BuiltScene {
    pub grid: WavelengthGrid,
    pub scenery: Scenery<Material>,
    pub cameras: Vec<(Camera, u32, u32)>,
    pub color_handler: ColorHandler,
    pub renderer: RendererChoice,
}

impl SceneDescription {
    pub fn build(&self) -> Result<BuiltScene, RenderError> {
        let grid = self.grid.build()?;
        let materials: Vec<Material> = self.materials.iter().map(|m| m.build(&grid)).collect();

        let mut builder: SceneryBuilder<Material> = SceneryBuilder::new(self.bias);
        for object in &self.objects {
            let material = materials
                .get(object.material)
                .ok_or_else(|| RenderError::UnresolvedReference { name: format!("materials[{}]", object.material) })?
                .clone();
            builder.add_object(Object::new(object.shape.build(), material));
        }
        for source in &self.sources {
            builder.add_source(source.build());
        }
        if let Some(environment) = &self.environment {
            builder.set_environment(environment.build());
        }
        let cameras: Vec<(Camera, u32, u32)> = self.cameras.iter().map(|c| c.build()).collect();
        for (camera, _, _) in &cameras {
            builder.add_camera(camera.clone());
        }
        let scenery = builder.build();

        let renderer = match &self.renderer {
            RendererDescription::Simple { max_depth, ambient } => RendererChoice::Simple(lumen_render::SimpleRenderer::new(*max_depth, Spectrum::from_values(ambient.clone()))),
            RendererDescription::PhotonMapping {
                max_depth,
                n_global,
                n_caustic,
                r_global,
                r_caustic,
                min_photons_for_estimate,
                fallback_diffuse_samples,
            } => RendererChoice::PhotonMapping(PhotonMappingParams {
                max_depth: *max_depth,
                n_global: *n_global,
                n_caustic: *n_caustic,
                r_global: *r_global,
                r_caustic: *r_caustic,
                min_photons_for_estimate: *min_photons_for_estimate,
                fallback_diffuse_samples: *fallback_diffuse_samples,
            }),
            RendererDescription::Test => RendererChoice::Test,
        };

        Ok(BuiltScene {
            grid,
            scenery,
            cameras,
            color_handler: self.color_handler.build(),
            renderer,
        })
    }
}

/// Parses a `ron`-encoded `SceneDescription` file without building it — the
/// `--brdf` CLI mode (spec.md §4.7) only needs one material out of the
/// document, not the whole scene graph.
pub fn load_description(path: &std::path::Path) -> Result<SceneDescription, RenderError> {
    let text = std::fs::read_to_string(path).map_err(|source| RenderError::MissingDataFile { path: path.to_path_buf(), source })?;
    ron::de::from_str(&text).map_err(|e| RenderError::UnresolvedReference { name: format!("{path:?}: {e}") })
}

/// Loads and builds a scene from a `ron`-encoded `SceneDescription` file.
pub fn load_scene(path: &std::path::Path) -> Result<BuiltScene, RenderError> {
    load_description(path)?.build()
}
