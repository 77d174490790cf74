//! Who gets to decide whether an avatar hand is drawn.

use crate::Bone;
use glam::Vec3;

/// Hides an object that gets too close to the local viewer's eyes.
///
/// When attached to a hand it owns the hand's final visibility; IK only feeds
/// it whether the hand's controller is tracked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonalSpaceInvader {
    pub radius: f32,
    always_hidden: bool,
    invading: bool,
}

impl PersonalSpaceInvader {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            always_hidden: false,
            invading: false,
        }
    }

    pub fn set_always_hidden(&mut self, always_hidden: bool) {
        self.always_hidden = always_hidden;
    }

    pub fn is_always_hidden(&self) -> bool {
        self.always_hidden
    }

    /// Re-evaluates invasion against the viewer's position. Returns whether invading.
    pub fn update(&mut self, viewer_position: Vec3, position: Vec3) -> bool {
        self.invading = viewer_position.distance_squared(position) < self.radius * self.radius;
        self.invading
    }

    pub fn is_visible(&self) -> bool {
        !self.always_hidden && !self.invading
    }
}

/// Visibility a hand should take given its controller and rig, `None` to leave it as is.
///
/// A tracked controller shows the hand. An untracked one hides it only when no
/// arm holds it in place, so armless rigs never show a floating hand.
pub fn resolve_hand_visibility(controller_visible: bool, has_arm: bool) -> Option<bool> {
    match (controller_visible, has_arm) {
        (true, _) => Some(true),
        (false, false) => Some(false),
        (false, true) => None,
    }
}

/// Applies [`resolve_hand_visibility`] to `hand`, deferring to `invader` when present.
pub fn mediate_hand_visibility(
    hand: &mut Bone,
    invader: Option<&mut PersonalSpaceInvader>,
    controller_visible: bool,
    has_arm: bool,
) {
    match invader {
        Some(invader) => {
            invader.set_always_hidden(!controller_visible);
            hand.set_visible(invader.is_visible());
        }
        None => {
            if let Some(visible) = resolve_hand_visibility(controller_visible, has_arm) {
                hand.set_visible(visible);
            }
        }
    }
}
