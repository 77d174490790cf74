//! Helio Avatar - head and hand driven IK for tracked avatars
//!
//! Places a humanoid avatar under a tracked head-mounted display and two
//! controllers, easing the hips toward where the head looks and skipping work
//! for avatars no camera can see.

pub use helio_avatar_core as core;
pub use helio_avatar_culling as culling;
pub use helio_avatar_ik as ik;

pub mod prelude {
    pub use crate::core::{AvatarError, Camera, Result, Side, Sided, Transform};
    pub use crate::culling::{CameraTool, CameraTools, Frustum, Viewer};
    pub use crate::ik::{
        Avatar, FrameScheduler, IkConfig, IkController, IkRoot, PersonalSpaceInvader, Scheduler,
        Skeleton, TickOutcome, TrackedDevice,
    };
    pub use glam;
}
