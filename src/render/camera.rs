//! Camera used for view setup and picking

use glam::{Mat4, Vec2, Vec3};

use crate::terrain::Ray;

/// Perspective camera for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Direction the camera is looking at
    pub direction: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Field of view in radians
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
}

impl Camera {
    /// Create a new camera with default settings
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            near: 0.1,
            far: 100_000.0,
            aspect: 16.0 / 9.0,
        }
    }

    /// Create a camera at a specific position looking at a target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            position,
            direction: (target - position).normalize(),
            up,
            ..Self::new()
        }
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.direction, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// World-space ray through a screen position (pixels, origin top-left)
    #[must_use]
    pub fn picking_ray(&self, screen: Vec2, viewport: Vec2) -> Ray {
        let ndc = Vec2::new(
            2.0 * screen.x / viewport.x.max(1.0) - 1.0,
            1.0 - 2.0 * screen.y / viewport.y.max(1.0),
        );
        let inverse = self.view_projection_matrix().inverse();
        // Depth range is [0, 1]
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, (far - near).normalize())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picking_ray_through_center() {
        let mut camera = Camera::look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::NEG_Z);
        camera.far = 100.0;
        let ray = camera.picking_ray(Vec2::new(400.0, 300.0), Vec2::new(800.0, 600.0));

        assert!((ray.direction - Vec3::NEG_Y).length() < 1e-3);
        assert!(ray.origin.x.abs() < 1e-3 && ray.origin.z.abs() < 1e-3);
        // Starts on the near plane
        assert!((ray.origin.y - (10.0 - camera.near)).abs() < 1e-2);
    }

    #[test]
    fn test_set_aspect() {
        let mut camera = Camera::new();
        camera.set_aspect(1000, 500);
        assert!((camera.aspect - 2.0).abs() < 1e-6);

        camera.set_aspect(10, 0);
        assert!((camera.aspect - 10.0).abs() < 1e-6);
    }
}
