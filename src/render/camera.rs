use glam::{Mat4, Vec3};

/// Fixed perspective camera looking at the origin. Only the aspect ratio
/// changes at runtime, recomputed from the viewport on resize.
pub struct Camera {
    pub eye: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 9.0),
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            aspect: width as f32 / height.max(1) as f32,
        }
    }

    #[allow(dead_code)]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Recompute the aspect ratio for a new viewport. Zero-sized viewports
    /// are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_recomputed_on_resize() {
        let mut camera = Camera::new(1280, 720);
        camera.set_viewport(800, 600);
        assert_eq!(camera.aspect(), 800.0 / 600.0);
    }

    #[test]
    fn zero_viewport_is_ignored() {
        let mut camera = Camera::new(1280, 720);
        let before = camera.aspect();
        camera.set_viewport(0, 600);
        camera.set_viewport(800, 0);
        assert_eq!(camera.aspect(), before);
    }

    #[test]
    fn view_proj_is_a_real_transform() {
        let camera = Camera::new(800, 600);
        let vp = camera.view_proj();
        assert_ne!(vp, Mat4::IDENTITY);
        assert_ne!(vp, Mat4::ZERO);
        assert!(vp.to_cols_array().iter().all(|v| v.is_finite()));
    }
}
