//! Camera shapes: the correspondence between an image pixel and a primary
//! ray. Grounded on `original_source/sources/{include,src}/camerashapes/
//! {CameraShape,PerspectiveCameraShape,OrthoscopicCameraShape,
//! FishEyeCameraShape,PolarCameraShape}.{hpp,cpp}`.

use lumen_core::algebra::Vector3;
use lumen_core::prelude::*;

/// A perspective camera: rays diverge from `origin` through a virtual
/// image plane `distance` units away, where `distance` is derived from the
/// vertical field of view so that the image height maps to one unit there.
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    origin: Vector3<f32>,
    basis: Basis,
    distance: f32,
    width: u32,
    height: u32,
}

impl PerspectiveCamera {
    pub fn new(
        width: u32,
        height: u32,
        fov_degrees: f32,
        origin: Vector3<f32>,
        lookat: Vector3<f32>,
        up: Vector3<f32>,
    ) -> Self {
        let forward = (lookat - origin).normalize();
        let i = up.cross(&forward).normalize();
        let j = forward.cross(&i).normalize();
        let basis = Basis {
            origin,
            i,
            j,
            k: forward,
        };
        let distance = 0.5 / (fov_degrees * 0.5 * std::f32::consts::PI / 180.0).tan();
        Self {
            origin,
            basis,
            distance,
            width,
            height,
        }
    }

    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let local = Vector3::new(
            (self.width as f32 / 2.0 - x as f32) / self.height as f32,
            0.5 - y as f32 / self.height as f32,
            self.distance,
        );
        let direction = self.basis.i * local.x + self.basis.j * local.y + self.basis.k * local.z;
        Ray::new(self.origin, direction)
    }
}

/// An orthoscopic (parallel-projection) camera: every pixel casts a ray
/// with the same direction, offset across a fixed-size image plane.
#[derive(Clone, Debug)]
pub struct OrthoscopicCamera {
    basis: Basis,
    real_width: f32,
    real_height: f32,
    width: u32,
    height: u32,
}

impl OrthoscopicCamera {
    pub fn new(
        width: u32,
        height: u32,
        real_height: f32,
        origin: Vector3<f32>,
        lookat: Vector3<f32>,
        up: Vector3<f32>,
    ) -> Self {
        let forward = (lookat - origin).normalize();
        let j = forward.cross(&up).normalize();
        let i = j.cross(&forward).normalize();
        let basis = Basis {
            origin,
            i,
            j,
            k: forward,
        };
        let real_width = real_height * width as f32 / height as f32;
        Self {
            basis,
            real_width,
            real_height,
            width,
            height,
        }
    }

    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let rx = (x as f32 / self.width as f32 - 0.5) * self.real_width;
        let ry = (y as f32 / self.height as f32 - 0.5) * self.real_height;
        let origin = self.basis.origin + self.basis.i * ry + self.basis.j * rx;
        Ray::new(origin, self.basis.k)
    }
}

/// A full hemispherical fisheye centered on `origin`'s facing direction,
/// one unit along world-X. Pixels outside the circular image circle cast
/// no ray.
#[derive(Clone, Debug)]
pub struct FishEyeCamera {
    origin: Vector3<f32>,
    width: u32,
    height: u32,
}

impl FishEyeCamera {
    pub fn new(width: u32, height: u32, origin: Vector3<f32>) -> Self {
        Self { origin, width, height }
    }

    pub fn ray(&self, x: u32, y: u32) -> Option<Ray> {
        let max_dim = self.width.max(self.height) as f32;
        let px = x as f32 - self.width as f32 * 0.5;
        let py = y as f32 - self.height as f32 * 0.5;
        let dist = (px * px + py * py).sqrt() / max_dim * 2.0;
        if dist > 1.0 {
            return None;
        }
        let angle = std::f32::consts::PI * dist;
        let direction = Vector3::new(angle.cos(), angle.sin() * px / max_dim, -angle.sin() * py / max_dim);
        Some(Ray::new(self.origin, direction))
    }
}

/// A full 360x180 equirectangular (polar) camera centered on `origin`.
#[derive(Clone, Debug)]
pub struct PolarCamera {
    origin: Vector3<f32>,
    width: u32,
    height: u32,
}

impl PolarCamera {
    pub fn new(width: u32, height: u32, origin: Vector3<f32>) -> Self {
        Self { origin, width, height }
    }

    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let phi = 2.0 * std::f32::consts::PI * (x as f32 / self.width as f32 - 0.5);
        let theta = std::f32::consts::PI * (y as f32 / self.height as f32);
        let direction = Vector3::new(phi.cos() * theta.sin(), phi.sin() * theta.sin(), theta.cos());
        Ray::new(self.origin, direction)
    }
}

#[derive(Clone, Debug)]
pub enum Camera {
    Perspective(PerspectiveCamera),
    Orthoscopic(OrthoscopicCamera),
    FishEye(FishEyeCamera),
    Polar(PolarCamera),
}

impl Camera {
    pub fn ray(&self, x: u32, y: u32) -> Option<Ray> {
        match self {
            Camera::Perspective(c) => Some(c.ray(x, y)),
            Camera::Orthoscopic(c) => Some(c.ray(x, y)),
            Camera::FishEye(c) => c.ray(x, y),
            Camera::Polar(c) => Some(c.ray(x, y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_camera_centers_on_lookat() {
        let camera = PerspectiveCamera::new(
            100,
            100,
            60.0,
            Vector3::new(0.0, 0.0, -5.0),
            Vector3::zeros(),
            Vector3::z(),
        );
        let ray = camera.ray(50, 50);
        assert!(ray.dir.dot(&Vector3::new(0.0, 0.0, 1.0)) > 0.99);
    }

    #[test]
    fn fisheye_camera_has_no_ray_outside_circle() {
        let camera = FishEyeCamera::new(100, 100, Vector3::zeros());
        assert!(camera.ray(0, 0).is_none());
        assert!(camera.ray(50, 50).is_some());
    }

    #[test]
    fn polar_camera_spans_full_sphere() {
        let camera = PolarCamera::new(360, 180, Vector3::zeros());
        let top = camera.ray(180, 0);
        assert!((top.dir.z - 1.0).abs() < 1.0e-3);
        let bottom = camera.ray(180, 180);
        assert!((bottom.dir.z - (-1.0)).abs() < 1.0e-3);
    }

    #[test]
    fn orthoscopic_rays_are_parallel() {
        let camera = OrthoscopicCamera::new(
            10,
            10,
            2.0,
            Vector3::new(0.0, 0.0, -5.0),
            Vector3::zeros(),
            Vector3::z(),
        );
        let a = camera.ray(0, 0);
        let b = camera.ray(9, 9);
        assert!((a.dir - b.dir).norm() < 1.0e-5);
    }
}
