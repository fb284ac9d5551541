use glam::{Mat4, Vec3};

/// Perspective camera the trackball controller steers: a world-space
/// position, an up vector, and a look direction set through `look_at`.
pub struct Camera {
    pub position: Vec3,
    pub up: Vec3,
    pub fov: f32,  // radians
    pub near: f32,
    pub far: f32,

    // Unit view direction, maintained by look_at().
    forward: Vec3,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            near: 10.0,
            far: 10_000.0,
            forward: Vec3::NEG_Z,
        }
    }

    /// Aim the camera at a world-space point. A point coincident with the
    /// camera position leaves the current direction unchanged.
    pub fn look_at(&mut self, target: Vec3) {
        if let Some(dir) = (target - self.position).try_normalize() {
            self.forward = dir;
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }
}
