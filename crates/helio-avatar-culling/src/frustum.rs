use glam::{Mat4, Vec3, Vec4};
use helio_avatar_core::Camera;

pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_matrix(view_projection: Mat4) -> Self {
        let mut planes = [Vec4::ZERO; 6];

        planes[0] = view_projection.row(3) + view_projection.row(0); // Left
        planes[1] = view_projection.row(3) - view_projection.row(0); // Right
        planes[2] = view_projection.row(3) + view_projection.row(1); // Bottom
        planes[3] = view_projection.row(3) - view_projection.row(1); // Top
        planes[4] = view_projection.row(2); // Near, glam projections map depth to [0, 1]
        planes[5] = view_projection.row(3) - view_projection.row(2); // Far

        for plane in &mut planes {
            let length = plane.truncate().length();
            *plane /= length;
        }

        Self { planes }
    }

    /// Projection times world-inverse of `camera`.
    pub fn from_camera(camera: &Camera) -> Self {
        Self::from_matrix(camera.view_projection_matrix())
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        let p = point.extend(1.0);
        self.planes.iter().all(|plane| plane.dot(p) >= 0.0)
    }
}

/// Whether `point` lies inside the view volume of `camera`.
pub fn is_in_view_of_camera(camera: &Camera, point: Vec3) -> bool {
    Frustum::from_camera(camera).contains_point(point)
}
