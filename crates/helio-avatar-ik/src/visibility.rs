//! Throttled "is this avatar seen by any camera" check.

use crate::{ScheduledWork, SharedIkRoot};
use helio_avatar_culling::Viewer;
use parking_lot::Mutex;
use std::sync::Arc;

/// Scheduler group all IK visibility checks are registered under.
pub const IK_SCHEDULER_GROUP: &str = "ik";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub is_in_view: bool,
    pub force_update_next_tick: bool,
    pub always_update: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            is_in_view: true,
            force_update_next_tick: true,
            always_update: false,
        }
    }
}

impl ViewState {
    /// Whether per-frame work may run this tick at all.
    pub fn allows_update(&self) -> bool {
        self.always_update || self.force_update_next_tick || self.is_in_view
    }
}

/// The part of an IK controller the frame scheduler calls into.
pub struct VisibilityCheck {
    ik_root: SharedIkRoot,
    viewer: Arc<Viewer>,
    state: Mutex<ViewState>,
}

impl VisibilityCheck {
    pub fn new(ik_root: SharedIkRoot, viewer: Arc<Viewer>) -> Self {
        Self {
            ik_root,
            viewer,
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn state(&self) -> ViewState {
        *self.state.lock()
    }

    pub fn set_always_update(&self, always_update: bool) {
        self.state.lock().always_update = always_update;
    }

    pub fn clear_forced_update(&self) {
        self.state.lock().force_update_next_tick = false;
    }

    /// Tests the head against the player camera, then against rendering camera tools.
    ///
    /// Skipped for always-updating avatars and while the player camera is not attached.
    pub fn update_is_in_view(&self) {
        if self.state.lock().always_update {
            return;
        }

        let head = self.ik_root.read().head_world_position();
        if let Some(in_view) = self.viewer.contains_point(head) {
            self.state.lock().is_in_view = in_view;
        }
    }
}

impl ScheduledWork for VisibilityCheck {
    fn run(&self) {
        // At most one forced solve per avatar per scheduled run, spread over frames.
        self.state.lock().force_update_next_tick = true;
        self.update_is_in_view();
    }
}
