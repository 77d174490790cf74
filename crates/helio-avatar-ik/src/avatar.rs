use crate::Skeleton;
use glam::{Mat4, Vec3};
use helio_avatar_core::Transform;

/// Vertical correction applied to the model of rigs authored with feet.
pub const FOOTED_MODEL_OFFSET: Vec3 = Vec3::new(0.0, -1.2, 0.0);

/// The scene-owned parts of an avatar that IK writes to.
pub struct Avatar {
    /// Avatar root relative to the tracked rig. IK moves this rather than the
    /// hips so skinned bounds stay correct for culling.
    pub root: Transform,
    pub root_needs_update: bool,
    /// Offset of the model under the rig, `None` when left at the origin.
    pub model_offset: Option<Vec3>,
    pub skeleton: Skeleton,
}

impl Avatar {
    pub fn new(skeleton: Skeleton) -> Self {
        Self {
            root: Transform::IDENTITY,
            root_needs_update: false,
            model_offset: None,
            skeleton,
        }
    }

    pub fn root_matrix(&self) -> Mat4 {
        self.root.to_matrix()
    }
}
