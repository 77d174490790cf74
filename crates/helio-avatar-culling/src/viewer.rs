use crate::{is_in_view_of_camera, CameraTools};
use glam::Vec3;
use helio_avatar_core::Camera;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

pub type SharedCamera = Arc<RwLock<Camera>>;

/// Every camera that can see avatars: the local viewer's own camera plus
/// any camera tools currently rendering.
pub struct Viewer {
    player_camera: OnceLock<SharedCamera>,
    camera_tools: CameraTools,
}

impl Viewer {
    pub fn new(camera_tools: CameraTools) -> Self {
        Self {
            player_camera: OnceLock::new(),
            camera_tools,
        }
    }

    /// Hands over the viewer camera once the scene is ready.
    ///
    /// Only the first call takes effect; returns whether this call did.
    pub fn attach_player_camera(&self, camera: SharedCamera) -> bool {
        let attached = self.player_camera.set(camera).is_ok();
        if attached {
            log::info!("Player camera attached to viewer");
        } else {
            log::warn!("Player camera already attached, ignoring");
        }
        attached
    }

    pub fn player_camera(&self) -> Option<&SharedCamera> {
        self.player_camera.get()
    }

    pub fn is_ready(&self) -> bool {
        self.player_camera.get().is_some()
    }

    /// Whether any camera sees `point`, or `None` while the player camera is not attached yet.
    pub fn contains_point(&self, point: Vec3) -> Option<bool> {
        let player_camera = self.player_camera.get()?;

        if is_in_view_of_camera(&player_camera.read(), point) {
            return Some(true);
        }

        Some(self.camera_tools.any(|tool| {
            tool.screen_visible && is_in_view_of_camera(&tool.camera, point)
        }))
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(CameraTools::new())
    }
}
