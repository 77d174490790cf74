//! End effectors supplied by tracking: the head-mounted display and two controllers.

use glam::Vec3;
use helio_avatar_core::{Sided, Transform};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedDevice {
    pub transform: Transform,
    /// Whether the device is currently tracked and shown.
    pub visible: bool,
}

impl TrackedDevice {
    pub fn new(transform: Transform, visible: bool) -> Self {
        Self { transform, visible }
    }
}

impl Default for TrackedDevice {
    fn default() -> Self {
        Self::new(Transform::IDENTITY, false)
    }
}

/// One frame's worth of tracked transforms, all relative to the rig.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedPose {
    pub head: Transform,
    pub controllers: Sided<TrackedDevice>,
}

/// The tracked rig an avatar is driven by.
///
/// Written by the presence layer, read by IK. Head and controller transforms
/// are relative to `transform`, the rig's own world placement.
#[derive(Clone, Debug)]
pub struct IkRoot {
    pub transform: Transform,
    pub camera: Transform,
    pub controllers: Sided<TrackedDevice>,
    /// The rig stays hidden until IK has placed the avatar once.
    pub visible: bool,
}

pub type SharedIkRoot = Arc<RwLock<IkRoot>>;

impl IkRoot {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            camera: Transform::IDENTITY,
            controllers: Sided::default(),
            visible: false,
        }
    }

    pub fn shared(self) -> SharedIkRoot {
        Arc::new(RwLock::new(self))
    }

    pub fn pose(&self) -> TrackedPose {
        TrackedPose {
            head: self.camera,
            controllers: self.controllers,
        }
    }

    pub fn head_world_position(&self) -> Vec3 {
        self.transform.transform_point(self.camera.position)
    }
}

impl Default for IkRoot {
    fn default() -> Self {
        Self::new(Transform::IDENTITY)
    }
}
