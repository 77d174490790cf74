//! Headless crowd simulation for the avatar IK controller.
//!
//! A ring of tracked avatars stands around the local viewer while the viewer
//! slowly turns in place. Avatars behind the viewer stop solving every frame
//! and only catch up when the frame scheduler gets around to them. Halfway
//! through, a camera tool circling the ring starts rendering.
//!
//! Run with `RUST_LOG=info cargo run --bin avatar_crowd [avatar-count]`.

use glam::{Quat, Vec3};
use helio_avatar_core::{Camera, Result, Side, Transform};
use helio_avatar_culling::{CameraTool, CameraTools, Viewer};
use helio_avatar_ik::{
    Avatar, FrameScheduler, IkConfig, IkController, IkRoot, PersonalSpaceInvader, SharedIkRoot,
    Skeleton, TrackedDevice,
};
use parking_lot::{Mutex, RwLock};
use std::f32::consts::TAU;
use std::sync::Arc;

const DEFAULT_AVATAR_COUNT: usize = 16;
const RING_RADIUS: f32 = 4.0;
const FRAMES: usize = 720;
const DT: f32 = 1.0 / 72.0;

fn main() -> Result<()> {
    env_logger::init();

    let avatar_count = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_AVATAR_COUNT)
        .max(1);
    log::info!("Starting avatar crowd simulation with {} avatars", avatar_count);

    let tools = CameraTools::new();
    let viewer = Arc::new(Viewer::new(tools.clone()));
    let player_camera = Arc::new(RwLock::new(
        Camera::default().with_position(Vec3::new(0.0, 1.6, 0.0)),
    ));
    viewer.attach_player_camera(player_camera.clone());

    let scheduler = FrameScheduler::new(2).shared();
    let mut crowd = Vec::with_capacity(avatar_count);
    for i in 0..avatar_count {
        crowd.push(CrowdMember::new(i, avatar_count, &viewer, scheduler.clone())?);
    }

    let mut tool = None;
    let mut solves = 0usize;
    let mut skips = 0usize;

    for frame in 0..FRAMES {
        let time = frame as f32 * DT;

        player_camera.write().rotation = Quat::from_rotation_y(time * 0.5);

        if frame == FRAMES / 2 {
            tool = Some(tools.add(CameraTool::new(orbiting_tool_camera(time))));
            log::info!("Camera tool started rendering");
        } else if let Some(tool) = tool {
            tools.set_camera(tool, orbiting_tool_camera(time));
        }

        scheduler.lock().tick();

        for member in &mut crowd {
            member.animate(time);
            let outcome = member.controller.tick(&mut member.avatar, DT);
            if outcome.full_solve {
                solves += 1;
            } else {
                skips += 1;
            }
        }

        if (frame + 1) % 72 == 0 {
            log::info!(
                "t={:.0}s: {} body solves, {} skipped",
                time.ceil(),
                solves,
                skips
            );
            solves = 0;
            skips = 0;
        }
    }

    if let Some(tool) = tool {
        tools.remove(tool);
    }

    let shown = crowd.iter().filter(|m| m.root.read().visible).count();
    log::info!("{} of {} avatars shown after the first solve", shown, avatar_count);

    Ok(())
}

/// Camera tool slowly circling outside the ring, aimed at its center.
fn orbiting_tool_camera(time: f32) -> Camera {
    let angle = time * 0.2;
    let position = Vec3::new(angle.sin() * 8.0, 2.0, angle.cos() * 8.0);
    let mut camera = Camera::default().with_position(position);
    camera.look_at(Vec3::new(0.0, 1.6, 0.0), Vec3::Y);
    camera
}

struct CrowdMember {
    root: SharedIkRoot,
    avatar: Avatar,
    controller: IkController,
    phase: f32,
}

impl CrowdMember {
    fn new(
        index: usize,
        count: usize,
        viewer: &Arc<Viewer>,
        scheduler: Arc<Mutex<FrameScheduler>>,
    ) -> Result<Self> {
        let angle = index as f32 / count as f32 * TAU;
        let position = Vec3::new(angle.sin(), 0.0, angle.cos()) * RING_RADIUS;
        // Face the center of the ring.
        let facing = Quat::from_rotation_y(angle);

        let root = IkRoot::new(Transform::from_rotation_translation(facing, position)).shared();
        let mut avatar = Avatar::new(humanoid());
        let mut controller = IkController::new(Some(root.clone()), viewer.clone(), scheduler);

        let config = IkConfig::default().with_rotation_speed(6.0);
        controller.configure(&mut avatar, config)?;
        controller.attach_space_invader(Side::Left, PersonalSpaceInvader::new(0.15));
        controller.attach_space_invader(Side::Right, PersonalSpaceInvader::new(0.15));

        let name = format!("avatar {}", index);
        controller.on_first_tick(move || log::debug!("{} placed", name));

        Ok(Self {
            root,
            avatar,
            controller,
            phase: angle,
        })
    }

    /// Sways the head and waves the right controller; the left one drops out now and then.
    fn animate(&mut self, time: f32) {
        let t = time + self.phase;
        let mut root = self.root.write();

        root.camera = Transform::from_rotation_translation(
            Quat::from_rotation_y(0.6 * (t * 0.7).sin()),
            Vec3::new(0.05 * t.sin(), 1.6, 0.0),
        );
        root.controllers[Side::Right] = TrackedDevice::new(
            Transform::from_position(Vec3::new(-0.3, 1.2 + 0.2 * (t * 2.0).sin(), -0.3)),
            true,
        );
        root.controllers[Side::Left] = TrackedDevice::new(
            Transform::from_position(Vec3::new(0.3, 1.1, -0.25)),
            (t * 0.3).sin() > -0.5,
        );
    }
}

fn humanoid() -> Skeleton {
    let at = |x: f32, y: f32, z: f32| Transform::from_position(Vec3::new(x, y, z));
    let mut skeleton = Skeleton::new();

    let hips = skeleton.add_bone("Hips", None, Transform::IDENTITY);
    let spine = skeleton.add_bone("Spine", Some(hips), at(0.0, 0.35, 0.0));
    let neck = skeleton.add_bone("Neck", Some(spine), at(0.0, 0.2, 0.0));
    let head = skeleton.add_bone("Head", Some(neck), at(0.0, 0.1, 0.0));
    skeleton.add_bone("LeftEye", Some(head), at(0.03, 0.08, 0.08));
    skeleton.add_bone("RightEye", Some(head), at(-0.03, 0.08, 0.08));
    skeleton.add_bone("LeftArm", Some(spine), at(0.18, 0.15, 0.0));
    skeleton.add_bone("RightArm", Some(spine), at(-0.18, 0.15, 0.0));
    skeleton.add_bone("LeftHand", Some(spine), at(0.5, 0.15, 0.0));
    skeleton.add_bone("RightHand", Some(spine), at(-0.5, 0.15, 0.0));
    skeleton.add_bone("LeftFoot", Some(hips), at(0.1, -0.9, 0.0));
    skeleton.add_bone("RightFoot", Some(hips), at(-0.1, -0.9, 0.0));
    skeleton
}
