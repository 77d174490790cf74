//! In-world camera tools: secondary cameras rendering to a viewfinder screen.

use helio_avatar_core::Camera;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub type CameraToolId = u64;

#[derive(Debug, Clone, Copy)]
pub struct CameraTool {
    pub camera: Camera,
    /// Whether the tool's viewfinder is showing, i.e. the camera is rendering.
    pub screen_visible: bool,
}

impl CameraTool {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            screen_visible: true,
        }
    }
}

#[derive(Default)]
struct Registry {
    tools: HashMap<CameraToolId, CameraTool>,
    next_id: CameraToolId,
}

/// Shared registry of camera tools.
///
/// Cloning yields another handle onto the same set.
#[derive(Clone, Default)]
pub struct CameraTools {
    registry: Arc<RwLock<Registry>>,
}

impl CameraTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tool: CameraTool) -> CameraToolId {
        let mut registry = self.registry.write();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.tools.insert(id, tool);
        id
    }

    pub fn remove(&self, id: CameraToolId) -> Option<CameraTool> {
        self.registry.write().tools.remove(&id)
    }

    pub fn get(&self, id: CameraToolId) -> Option<CameraTool> {
        self.registry.read().tools.get(&id).copied()
    }

    pub fn set_screen_visible(&self, id: CameraToolId, visible: bool) -> bool {
        self.registry
            .write()
            .tools
            .get_mut(&id)
            .map(|tool| tool.screen_visible = visible)
            .is_some()
    }

    pub fn set_camera(&self, id: CameraToolId, camera: Camera) -> bool {
        self.registry
            .write()
            .tools
            .get_mut(&id)
            .map(|tool| tool.camera = camera)
            .is_some()
    }

    /// Returns true as soon as `f` does for any tool.
    pub fn any<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&CameraTool) -> bool,
    {
        self.registry.read().tools.values().any(|tool| f(tool))
    }

    pub fn len(&self) -> usize {
        self.registry.read().tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().tools.is_empty()
    }
}
