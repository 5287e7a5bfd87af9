//! Perspective camera that trails the token.

use cgmath::{Matrix4, Point3, Vector3};

use crate::config::CameraRig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vector3<f32>,
    /// Direction the camera looks along, relative to `position`.
    pub look: Vector3<f32>,
    pub aspect: f32,
    pub fovy: cgmath::Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(rig: &CameraRig, width: u32, height: u32) -> Self {
        Self {
            position: rig.start,
            // look back along the trailing offset: down and into the board
            look: -rig.offset,
            aspect: aspect(width, height),
            fovy: cgmath::Deg(rig.fovy),
            znear: rig.znear,
            zfar: rig.zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect(width, height);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::new(self.position.x, self.position.y, self.position.z);
        Matrix4::look_to_rh(eye, self.look, Vector3::unit_y())
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.position.extend(1.0).into();
        self.view_proj = camera.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Transform, Vector4};

    use super::*;

    #[test]
    fn should_place_trailed_cell_in_front_of_camera() {
        let rig = CameraRig::default();
        let camera = Camera::new(&rig, 800, 600);
        // the camera starts trailing the origin, which must land inside the clip volume
        let target = Point3::new(0.0, 0.0, 0.0);
        let clip: Vector4<f32> = camera.view_proj() * target.to_homogeneous();
        let ndc = clip.truncate() / clip.w;
        assert!(clip.w > 0.0);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn should_update_aspect_on_resize() {
        let mut camera = Camera::new(&CameraRig::default(), 800, 600);
        camera.resize(1920, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
        // a minimised window reports zero height
        camera.resize(100, 0);
        assert!(camera.aspect.is_finite());
    }

    #[test]
    fn should_look_down_the_board() {
        let camera = Camera::new(&CameraRig::default(), 800, 600);
        let ahead = camera.view_matrix().transform_point(Point3::new(0.0, 0.0, -10.0));
        assert!(ahead.z < 0.0);
    }
}
