//! Head and hand driven IK for a hip-rooted avatar skeleton.
//!
//! Each tick the avatar root is placed so the avatar's mid-eye point sits on
//! the tracked head, the hips ease toward the head's yaw, the head bone takes
//! the remaining rotation, and the hands are solved in chest space from the
//! controllers.
//!
//! The body solve is skipped for avatars that no camera sees and whose hips
//! have settled; a [`VisibilityCheck`] registered with the frame scheduler keeps
//! the visibility flag fresh and periodically forces one solve.

use crate::hand_visibility::{mediate_hand_visibility, PersonalSpaceInvader};
use crate::rig::{snap_to_bind_position, DerivedOffsets, RigBinding};
use crate::visibility::{ViewState, VisibilityCheck, IK_SCHEDULER_GROUP};
use crate::{
    Avatar, IkConfig, SharedIkRoot, SharedScheduler, Skeleton, TaskId, TrackedDevice,
    FOOTED_MODEL_OFFSET,
};
use glam::{EulerRot, Mat4};
use helio_avatar_core::{
    angle_on_xz_plane_between, quat_almost_equals, yaw_rotation, AvatarError, Result, Side, Sided,
    Transform,
};
use helio_avatar_culling::Viewer;
use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

/// Tolerance on hip quaternion components below which the hips count as settled.
pub const HIP_CONVERGENCE_EPSILON: f32 = 0.0001;

/// Wrist correction from controller grip space to hand bone space.
pub fn hand_rotation(side: Side) -> Mat4 {
    match side {
        Side::Left => Mat4::from_euler(EulerRot::XYZ, -FRAC_PI_2, FRAC_PI_2, 0.0),
        Side::Right => Mat4::from_euler(EulerRot::XYZ, -FRAC_PI_2, -FRAC_PI_2, 0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkPhase {
    /// No configuration applied yet.
    Uninitialized,
    /// Configured; the avatar stays hidden until the first body solve.
    AwaitingFirstTick,
    Steady,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Whether the root/hip/head solve ran.
    pub full_solve: bool,
    /// Which hands were re-placed from their controllers.
    pub hands: Sided<bool>,
}

pub struct IkController {
    config: IkConfig,
    binding: RigBinding,
    offsets: Option<DerivedOffsets>,
    ik_root: Option<SharedIkRoot>,
    visibility: Option<Arc<VisibilityCheck>>,
    scheduler: SharedScheduler,
    task: Option<TaskId>,
    phase: IkPhase,
    last_head_matrix: Option<Mat4>,
    has_converged_hips: bool,
    inv_root_to_chest: Option<Mat4>,
    space_invaders: Sided<Option<PersonalSpaceInvader>>,
    first_tick_listeners: Vec<Box<dyn FnOnce() + Send>>,
}

impl IkController {
    /// Creates a controller driven by `ik_root` and registers its visibility check.
    ///
    /// Without an IK root the controller never does any work.
    pub fn new(ik_root: Option<SharedIkRoot>, viewer: Arc<Viewer>, scheduler: SharedScheduler) -> Self {
        let visibility = match &ik_root {
            Some(root) => Some(Arc::new(VisibilityCheck::new(root.clone(), viewer))),
            None => {
                log::warn!("{}, IK controller will stay idle", AvatarError::MissingIkRoot);
                None
            }
        };

        let task = visibility
            .as_ref()
            .map(|check| scheduler.lock().schedule(IK_SCHEDULER_GROUP, check.clone()));

        Self {
            config: IkConfig::default(),
            binding: RigBinding::default(),
            offsets: None,
            ik_root,
            visibility,
            scheduler,
            task,
            phase: IkPhase::Uninitialized,
            last_head_matrix: None,
            has_converged_hips: false,
            inv_root_to_chest: None,
            space_invaders: Sided::default(),
            first_tick_listeners: Vec::new(),
        }
    }

    /// Applies a configuration, rebinding bones whose names changed.
    ///
    /// Missing bones are logged, not returned: the avatar keeps running with
    /// whatever parts of the solve its rig supports.
    pub fn configure(&mut self, avatar: &mut Avatar, config: IkConfig) -> Result<()> {
        config.validate()?;

        let first = self.phase == IkPhase::Uninitialized;
        if first || config.bones != self.config.bones {
            self.binding = RigBinding::resolve(&avatar.skeleton, &config.bones);
            self.invalidate_solve();

            for error in self.binding.missing_required(&config.bones) {
                log::warn!("IK rig incomplete: {}", error);
            }

            for side in Side::BOTH {
                let renamed = first || config.bones.hand(side) != self.config.bones.hand(side);
                if let (true, Some(hand)) = (renamed, self.binding.hands[side]) {
                    snap_to_bind_position(&mut avatar.skeleton, hand);
                    log::debug!("Snapped {} hand to its bind position", side.name());
                }
            }
        }

        avatar.model_offset = self.binding.has_foot().then_some(FOOTED_MODEL_OFFSET);

        if let Some(root) = &self.ik_root {
            let controllers = root.read().controllers;
            for side in Side::BOTH {
                self.mediate_hand(&mut avatar.skeleton, side, &controllers[side]);
            }
        }

        self.offsets = DerivedOffsets::compute(&self.binding, &avatar.skeleton);

        if let Some(check) = &self.visibility {
            check.set_always_update(config.always_update);
        }

        self.config = config;
        if first {
            self.phase = IkPhase::AwaitingFirstTick;
        }

        Ok(())
    }

    /// Recomputes rig offsets after bone local transforms were edited.
    ///
    /// The next tick that may update re-solves the body against the new offsets.
    pub fn refresh_offsets(&mut self, skeleton: &Skeleton) {
        self.offsets = DerivedOffsets::compute(&self.binding, skeleton);
        self.invalidate_solve();
    }

    /// Drops state derived from the previous rig so no hand is placed in a stale chest frame.
    fn invalidate_solve(&mut self) {
        self.last_head_matrix = None;
        self.inv_root_to_chest = None;
    }

    pub fn attach_space_invader(&mut self, side: Side, invader: PersonalSpaceInvader) {
        self.space_invaders[side] = Some(invader);
    }

    pub fn space_invader_mut(&mut self, side: Side) -> Option<&mut PersonalSpaceInvader> {
        self.space_invaders[side].as_mut()
    }

    /// Registers a callback for the first completed body solve.
    ///
    /// Listeners added after that solve are never called.
    pub fn on_first_tick(&mut self, listener: impl FnOnce() + Send + 'static) {
        if self.phase == IkPhase::Steady {
            log::debug!("First IK tick already happened, dropping listener");
            return;
        }
        self.first_tick_listeners.push(Box::new(listener));
    }

    /// What the frame scheduler runs: force one solve and refresh visibility.
    pub fn run_scheduled_work(&self) {
        if let Some(check) = &self.visibility {
            crate::ScheduledWork::run(check.as_ref());
        }
    }

    pub fn tick(&mut self, avatar: &mut Avatar, dt: f32) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let (Some(ik_root), Some(visibility)) = (self.ik_root.clone(), self.visibility.clone()) else {
            return outcome;
        };
        if self.phase == IkPhase::Uninitialized {
            return outcome;
        }

        let pose = ik_root.read().pose();
        let view = visibility.state();

        let head_matrix = pose.head.to_matrix();
        let head_moved = self.last_head_matrix != Some(head_matrix);

        // Settled avatars nobody is looking at only solve when the scheduler forces it.
        if view.always_update
            || view.force_update_next_tick
            || (view.is_in_view && (head_moved || !self.has_converged_hips))
        {
            if head_moved {
                self.last_head_matrix = Some(head_matrix);
            }
            outcome.full_solve = self.solve_body(avatar, head_matrix, dt);
        } else {
            log::trace!("IK solve skipped, avatar settled and out of view");
        }

        for side in Side::BOTH {
            outcome.hands[side] = self.update_hand(avatar, side, &pose.controllers[side], &view);
        }

        visibility.clear_forced_update();

        if outcome.full_solve && self.phase == IkPhase::AwaitingFirstTick {
            self.phase = IkPhase::Steady;
            ik_root.write().visible = true;
            log::debug!("First IK solve complete, showing avatar");

            for listener in self.first_tick_listeners.drain(..) {
                listener();
            }
        }

        outcome
    }

    fn solve_body(&mut self, avatar: &mut Avatar, head_matrix: Mat4, dt: f32) -> bool {
        let (Some(offsets), Some(bones)) = (self.offsets, self.binding.required()) else {
            log::trace!("IK solve skipped, rig is missing required bones");
            return false;
        };

        // Camera faces -Z. Flip it about Y so that it faces +Z like the avatar.
        let camera_forward = head_matrix * Mat4::from_rotation_y(PI);

        // Head placement that puts the avatar's mid-eye point on the tracked head.
        let head_transform = camera_forward * offsets.inv_middle_eye_to_head;

        // Move the avatar root rather than the hips: skinning-driven root motion
        // would leave the renderer's culling bounds behind.
        avatar.root.position = head_transform.w_axis.truncate() + offsets.inv_hips_to_head;

        let target_yaw = yaw_rotation(&camera_forward);
        if self.phase == IkPhase::Steady {
            // Camera faces -Z and the avatar +Z, so aligned facings are PI apart.
            let yaw_delta = PI - angle_on_xz_plane_between(&head_matrix, &avatar.root_matrix());

            if yaw_delta > self.config.max_lerp_angle {
                avatar.root.rotation = target_yaw;
            } else {
                let t = (self.config.rotation_speed * dt).clamp(0.0, 1.0);
                avatar.root.rotation = avatar.root.rotation.slerp(target_yaw, t);
            }
        } else {
            avatar.root.rotation = target_yaw;
        }

        self.has_converged_hips =
            quat_almost_equals(HIP_CONVERGENCE_EPSILON, target_yaw, avatar.root.rotation);
        if self.has_converged_hips {
            avatar.root.rotation = target_yaw;
        }
        avatar.root_needs_update = true;

        // The hips already carry the yaw; the head keeps only what is left.
        let (_, head_rotation, _) = head_transform.to_scale_rotation_translation();
        let inv_hips_rotation = avatar.root.rotation.inverse();
        avatar.skeleton.bone_mut(bones.head).local.rotation = inv_hips_rotation * head_rotation;

        let root_to_chest = avatar.root_matrix() * avatar.skeleton.local_matrix(bones.chest);
        self.inv_root_to_chest = Some(root_to_chest.inverse());

        for id in [bones.head, bones.neck, bones.chest] {
            avatar.skeleton.bone_mut(id).mark_needs_update();
        }

        true
    }

    fn update_hand(
        &mut self,
        avatar: &mut Avatar,
        side: Side,
        controller: &TrackedDevice,
        view: &ViewState,
    ) -> bool {
        let Some(hand) = self.binding.hands[side] else {
            return false;
        };

        self.mediate_hand(&mut avatar.skeleton, side, controller);

        if !controller.visible || !view.allows_update() {
            return false;
        }
        let Some(inv_root_to_chest) = self.inv_root_to_chest else {
            return false;
        };

        let hand_matrix = inv_root_to_chest * controller.transform.to_matrix() * hand_rotation(side);
        let pose = Transform::from(hand_matrix);

        let bone = avatar.skeleton.bone_mut(hand);
        bone.local.position = pose.position;
        bone.local.rotation = pose.rotation;
        bone.mark_needs_update();

        true
    }

    fn mediate_hand(&mut self, skeleton: &mut Skeleton, side: Side, controller: &TrackedDevice) {
        if let Some(hand) = self.binding.hands[side] {
            mediate_hand_visibility(
                skeleton.bone_mut(hand),
                self.space_invaders[side].as_mut(),
                controller.visible,
                self.binding.has_arm(side),
            );
        }
    }

    /// Unregisters from the frame scheduler. Safe to call more than once.
    pub fn remove(&mut self) {
        if let Some(task) = self.task.take() {
            self.scheduler.lock().unschedule(IK_SCHEDULER_GROUP, task);
        }
    }

    pub fn config(&self) -> &IkConfig {
        &self.config
    }

    pub fn binding(&self) -> &RigBinding {
        &self.binding
    }

    pub fn offsets(&self) -> Option<&DerivedOffsets> {
        self.offsets.as_ref()
    }

    pub fn phase(&self) -> IkPhase {
        self.phase
    }

    pub fn view_state(&self) -> Option<ViewState> {
        self.visibility.as_ref().map(|check| check.state())
    }

    pub fn has_converged_hips(&self) -> bool {
        self.has_converged_hips
    }

    pub fn is_registered(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for IkController {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{humanoid, HumanoidOptions};
    use crate::{BoneId, FrameScheduler, IkRoot};
    use glam::{Quat, Vec3};
    use helio_avatar_core::{yaw_angle, Camera, Transform};
    use parking_lot::{Mutex, RwLock};
    use std::f32::consts::TAU;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DT: f32 = 1.0 / 60.0;

    struct Rig {
        controller: IkController,
        avatar: Avatar,
        root: SharedIkRoot,
        viewer: Arc<Viewer>,
        scheduler: Arc<Mutex<FrameScheduler>>,
    }

    impl Rig {
        fn new(config: IkConfig) -> Self {
            Self::with_skeleton(config, humanoid(HumanoidOptions::default()))
        }

        fn with_skeleton(config: IkConfig, skeleton: Skeleton) -> Self {
            let scheduler = FrameScheduler::default().shared();
            let root = IkRoot::default().shared();
            let viewer = Arc::new(Viewer::default());
            let mut avatar = Avatar::new(skeleton);
            let mut controller =
                IkController::new(Some(root.clone()), viewer.clone(), scheduler.clone());
            controller.configure(&mut avatar, config).unwrap();

            Self {
                controller,
                avatar,
                root,
                viewer,
                scheduler,
            }
        }

        fn set_head(&self, head: Transform) {
            self.root.write().camera = head;
        }

        fn set_controller(&self, side: Side, transform: Transform, visible: bool) {
            self.root.write().controllers[side] = TrackedDevice::new(transform, visible);
        }

        fn tick(&mut self) -> TickOutcome {
            self.controller.tick(&mut self.avatar, DT)
        }

        fn bone(&self, name: &str) -> BoneId {
            self.avatar.skeleton.find(name).unwrap()
        }

        fn world_matrix(&self, name: &str) -> Mat4 {
            let id = self.bone(name);
            self.avatar.root_matrix() * self.avatar.skeleton.model_matrices()[id]
        }
    }

    fn head_with_yaw(yaw: f32, position: Vec3) -> Transform {
        Transform::from_rotation_translation(Quat::from_rotation_y(yaw), position)
    }

    /// Unsigned yaw difference between the hips and where the head looks.
    fn yaw_error(rig: &Rig) -> f32 {
        let camera_forward = rig.root.read().camera.to_matrix() * Mat4::from_rotation_y(PI);
        let target = yaw_angle(&camera_forward);
        let current = yaw_angle(&rig.avatar.root_matrix());
        let d = (current - target).rem_euclid(TAU);
        d.min(TAU - d)
    }

    #[test]
    fn first_solve_shows_avatar_and_notifies_once() {
        let mut rig = Rig::new(IkConfig::default());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        rig.controller.on_first_tick(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(rig.controller.phase(), IkPhase::AwaitingFirstTick);
        assert!(!rig.root.read().visible);

        assert!(rig.tick().full_solve);
        assert_eq!(rig.controller.phase(), IkPhase::Steady);
        assert!(rig.root.read().visible);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        for _ in 0..3 {
            rig.controller.run_scheduled_work();
            assert!(rig.tick().full_solve);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let late = fired.clone();
        rig.controller.on_first_tick(move || {
            late.fetch_add(1, Ordering::SeqCst);
        });
        rig.controller.run_scheduled_work();
        rig.tick();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn root_places_mid_eye_on_identity_head() {
        let mut rig = Rig::new(IkConfig::default());
        rig.tick();

        // hips->head is (0, 0.6, 0) and the mid-eye sits at (0, 0.1, 0.05) in head space,
        // mirrored by the 180 degree flip.
        assert!(rig.avatar.root.position.abs_diff_eq(Vec3::new(0.0, -0.7, 0.05), 1e-5));
        assert!(quat_almost_equals(1e-5, rig.avatar.root.rotation, Quat::from_rotation_y(PI)));
        assert!(rig.avatar.root_needs_update);
    }

    #[test]
    fn mid_eye_tracks_arbitrary_head_pose() {
        let mut rig = Rig::new(IkConfig::default());
        let head = Transform::from_rotation_translation(
            Quat::from_euler(EulerRot::YXZ, 0.6, 0.25, -0.1),
            Vec3::new(1.0, 1.7, -2.0),
        );
        rig.set_head(head);
        rig.tick();

        let left = rig.world_matrix("LeftEye").w_axis.truncate();
        let right = rig.world_matrix("RightEye").w_axis.truncate();
        assert!(((left + right) / 2.0).abs_diff_eq(head.position, 1e-4));

        // The head bone looks where the tracked head looks.
        let head_forward = rig.world_matrix("Head").transform_vector3(Vec3::Z);
        let camera_forward = head.rotation * Vec3::NEG_Z;
        assert!(head_forward.abs_diff_eq(camera_forward, 1e-4));
    }

    #[test]
    fn large_turn_snaps_to_target() {
        let mut rig = Rig::new(IkConfig::default());
        rig.tick();

        rig.set_head(head_with_yaw(2.0, Vec3::ZERO));
        rig.tick();

        assert!(yaw_error(&rig) < 1e-5);
        assert!(quat_almost_equals(1e-5, rig.avatar.root.rotation, Quat::from_rotation_y(2.0 + PI)));
        assert!(rig.controller.has_converged_hips());
    }

    #[test]
    fn small_turn_eases_without_overshoot() {
        let mut rig = Rig::new(IkConfig::default());
        rig.tick();

        rig.set_head(head_with_yaw(1.0, Vec3::ZERO));
        let initial = yaw_error(&rig);
        assert!((initial - 1.0).abs() < 1e-4);

        rig.tick();
        let mut previous = yaw_error(&rig);
        assert!(previous > 0.1 && previous < initial, "first step must be partial");

        let mut ticks = 1;
        while !rig.controller.has_converged_hips() {
            assert!(ticks < 150, "hips did not converge");
            rig.tick();
            let error = yaw_error(&rig);
            assert!(error <= previous + 1e-5, "yaw error grew from {previous} to {error}");
            assert!(error < rig.controller.config().max_lerp_angle);
            previous = error;
            ticks += 1;
        }
        assert!(previous < 1e-3);
    }

    #[test]
    fn converged_solve_is_idempotent() {
        let mut rig = Rig::new(IkConfig::default().with_always_update(true));
        rig.set_head(head_with_yaw(0.4, Vec3::new(0.3, 1.6, 0.2)));
        rig.set_controller(Side::Left, Transform::from_position(Vec3::new(0.3, 1.2, -0.3)), true);
        rig.set_controller(Side::Right, Transform::from_position(Vec3::new(-0.3, 1.1, -0.3)), true);
        rig.tick();
        assert!(rig.controller.has_converged_hips());

        let snapshot = |rig: &Rig| {
            let head = rig.bone("Head");
            let left = rig.bone("LeftHand");
            let right = rig.bone("RightHand");
            let skeleton = &rig.avatar.skeleton;
            (
                rig.avatar.root,
                skeleton.bone(head).local,
                skeleton.bone(left).local,
                skeleton.bone(right).local,
            )
        };

        let before = snapshot(&rig);
        assert!(rig.tick().full_solve);
        assert!(rig.tick().full_solve);
        assert_eq!(snapshot(&rig), before);
    }

    #[test]
    fn hand_world_pose_ignores_hip_orientation() {
        let mut rig = Rig::new(IkConfig::default().with_always_update(true));
        let left = Transform::from_rotation_translation(
            Quat::from_euler(EulerRot::XYZ, 0.3, -0.2, 0.5),
            Vec3::new(0.4, 1.1, -0.4),
        );
        let right = Transform::from_position(Vec3::new(-0.35, 1.0, -0.3));
        rig.set_controller(Side::Left, left, true);
        rig.set_controller(Side::Right, right, true);

        let assert_hands_follow = |rig: &Rig| {
            for (side, name, controller) in [
                (Side::Left, "LeftHand", left),
                (Side::Right, "RightHand", right),
            ] {
                let world = rig.world_matrix(name);
                let wanted = controller.to_matrix() * hand_rotation(side);
                assert!(world.abs_diff_eq(wanted, 1e-4), "{name} drifted");
            }
        };

        let outcome = rig.tick();
        assert_eq!(outcome.hands, Sided::new(true, true));
        assert_hands_follow(&rig);

        rig.set_head(head_with_yaw(0.7, Vec3::ZERO));
        rig.tick();
        assert!(!rig.controller.has_converged_hips(), "hips should be mid-turn");
        assert_hands_follow(&rig);
    }

    #[test]
    fn settled_out_of_view_avatar_skips_solve() {
        let mut rig = Rig::new(IkConfig::default());
        rig.set_head(head_with_yaw(0.0, Vec3::new(0.0, 1.6, 5.0)));
        rig.set_controller(Side::Left, Transform::from_position(Vec3::new(0.3, 1.2, 4.7)), true);
        rig.viewer
            .attach_player_camera(Arc::new(RwLock::new(Camera::default())));

        rig.controller.run_scheduled_work();
        let view = rig.controller.view_state().unwrap();
        assert!(!view.is_in_view && view.force_update_next_tick);

        assert!(rig.tick().full_solve);
        assert!(rig.controller.has_converged_hips());
        let root = rig.avatar.root;

        rig.set_head(head_with_yaw(0.3, Vec3::new(0.5, 1.6, 5.0)));
        let outcome = rig.tick();
        assert!(!outcome.full_solve);
        assert!(!outcome.hands.left);
        assert_eq!(rig.avatar.root, root);

        rig.controller.run_scheduled_work();
        let outcome = rig.tick();
        assert!(outcome.full_solve);
        assert!(outcome.hands.left);
        assert_ne!(rig.avatar.root, root);
    }

    #[test]
    fn in_view_avatar_solves_only_on_change() {
        let mut rig = Rig::new(IkConfig::default());
        assert!(rig.tick().full_solve);
        assert!(!rig.tick().full_solve);

        rig.set_head(head_with_yaw(0.0, Vec3::new(0.0, 0.1, 0.0)));
        assert!(rig.tick().full_solve);
        assert!(!rig.tick().full_solve);
    }

    #[test]
    fn incomplete_rig_never_solves_or_shows() {
        let config = IkConfig::default().with_bones(crate::BoneNames {
            neck: "MissingNeck".into(),
            ..Default::default()
        });
        let mut rig = Rig::new(config);
        rig.set_controller(Side::Left, Transform::IDENTITY, true);

        let outcome = rig.tick();
        assert!(!outcome.full_solve);
        assert!(!outcome.hands.left);
        assert_eq!(rig.controller.phase(), IkPhase::AwaitingFirstTick);
        assert!(!rig.root.read().visible);
    }

    #[test]
    fn without_ik_root_controller_is_idle() {
        let scheduler = FrameScheduler::default().shared();
        let mut avatar = Avatar::new(humanoid(HumanoidOptions::default()));
        let mut controller =
            IkController::new(None, Arc::new(Viewer::default()), scheduler.clone());
        controller.configure(&mut avatar, IkConfig::default()).unwrap();

        assert!(!controller.is_registered());
        assert_eq!(scheduler.lock().task_count(IK_SCHEDULER_GROUP), 0);
        assert_eq!(controller.tick(&mut avatar, DT), TickOutcome::default());
        assert_eq!(avatar.root, Transform::IDENTITY);
    }

    #[test]
    fn teardown_unschedules_once() {
        let mut rig = Rig::new(IkConfig::default());
        assert_eq!(rig.scheduler.lock().task_count(IK_SCHEDULER_GROUP), 1);

        rig.controller.remove();
        rig.controller.remove();
        assert!(!rig.controller.is_registered());
        assert_eq!(rig.scheduler.lock().task_count(IK_SCHEDULER_GROUP), 0);

        let scheduler = rig.scheduler.clone();
        let other = Rig::new(IkConfig::default());
        let other_scheduler = other.scheduler.clone();
        assert_eq!(other_scheduler.lock().task_count(IK_SCHEDULER_GROUP), 1);
        drop(other);
        assert_eq!(other_scheduler.lock().task_count(IK_SCHEDULER_GROUP), 0);
        assert_eq!(scheduler.lock().task_count(IK_SCHEDULER_GROUP), 0);
    }

    #[test]
    fn feet_toggle_model_offset() {
        let rig = Rig::new(IkConfig::default());
        assert_eq!(rig.avatar.model_offset, Some(FOOTED_MODEL_OFFSET));

        let footless = Rig::with_skeleton(
            IkConfig::default(),
            humanoid(HumanoidOptions {
                feet: false,
                ..HumanoidOptions::default()
            }),
        );
        assert_eq!(footless.avatar.model_offset, None);
    }

    #[test]
    fn armless_rig_hides_untracked_hands() {
        let mut rig = Rig::with_skeleton(
            IkConfig::default(),
            humanoid(HumanoidOptions {
                arms: false,
                ..HumanoidOptions::default()
            }),
        );
        let left = rig.bone("LeftHand");
        assert!(!rig.avatar.skeleton.bone(left).is_visible());

        rig.set_controller(Side::Left, Transform::IDENTITY, true);
        rig.tick();
        assert!(rig.avatar.skeleton.bone(left).is_visible());

        rig.set_controller(Side::Left, Transform::IDENTITY, false);
        rig.tick();
        assert!(!rig.avatar.skeleton.bone(left).is_visible());
    }

    #[test]
    fn space_invader_owns_hand_visibility() {
        let mut rig = Rig::new(IkConfig::default());
        rig.controller
            .attach_space_invader(Side::Right, PersonalSpaceInvader::new(0.2));
        rig.set_controller(Side::Right, Transform::IDENTITY, false);
        rig.tick();

        let right = rig.bone("RightHand");
        assert!(rig.controller.space_invader_mut(Side::Right).unwrap().is_always_hidden());
        assert!(!rig.avatar.skeleton.bone(right).is_visible());

        rig.set_controller(Side::Right, Transform::IDENTITY, true);
        rig.tick();
        assert!(rig.avatar.skeleton.bone(right).is_visible());

        let invader = rig.controller.space_invader_mut(Side::Right).unwrap();
        invader.update(Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0));
        rig.tick();
        assert!(!rig.avatar.skeleton.bone(right).is_visible());
    }

    #[test]
    fn refreshed_offsets_move_the_root() {
        let mut rig = Rig::new(IkConfig::default());
        rig.tick();
        assert!(!rig.tick().full_solve);
        let before = *rig.controller.offsets().unwrap();

        let neck = rig.bone("Neck");
        rig.avatar.skeleton.bone_mut(neck).local.position = Vec3::new(0.0, 0.4, 0.0);
        for name in ["LeftEye", "RightEye"] {
            let eye = rig.bone(name);
            rig.avatar.skeleton.bone_mut(eye).local.position.z = 0.08;
        }
        rig.controller.refresh_offsets(&rig.avatar.skeleton);

        let after = *rig.controller.offsets().unwrap();
        assert!(before.inv_hips_to_head.abs_diff_eq(Vec3::new(0.0, -0.6, 0.0), 1e-6));
        assert!(after.inv_hips_to_head.abs_diff_eq(Vec3::new(0.0, -0.7, 0.0), 1e-6));
        assert!(before.middle_eye.abs_diff_eq(Vec3::new(0.0, 0.1, 0.05), 1e-6));
        assert!(after.middle_eye.abs_diff_eq(Vec3::new(0.0, 0.1, 0.08), 1e-6));

        // Same head, settled hips: only the refresh makes this tick solve.
        assert!(rig.tick().full_solve);
        assert!(rig.avatar.root.position.abs_diff_eq(Vec3::new(0.0, -0.8, 0.08), 1e-5));
    }

    #[test]
    fn rebinding_chest_places_hands_in_the_new_frame() {
        let mut rig = Rig::new(IkConfig::default());
        let grip = Transform::from_position(Vec3::new(0.3, 0.2, -0.3));
        rig.set_controller(Side::Left, grip, true);
        rig.tick();
        assert!(!rig.tick().full_solve);

        let neck_as_chest = IkConfig::default().with_bones(crate::BoneNames {
            chest: "Neck".into(),
            ..Default::default()
        });
        rig.controller.configure(&mut rig.avatar, neck_as_chest).unwrap();

        let outcome = rig.tick();
        assert!(outcome.full_solve);
        assert!(outcome.hands.left);

        let neck = rig.bone("Neck");
        let chest_frame = rig.avatar.root_matrix() * rig.avatar.skeleton.local_matrix(neck);
        let wanted = chest_frame.inverse() * grip.to_matrix() * hand_rotation(Side::Left);
        let hand = rig.avatar.skeleton.bone(rig.bone("LeftHand")).local;
        assert!(hand.abs_diff_eq(&Transform::from(wanted), 1e-4));
    }

    #[test]
    fn rename_rebinds_and_invalid_config_is_rejected() {
        let mut rig = Rig::new(IkConfig::default());
        let renamed = IkConfig::default().with_bones(crate::BoneNames {
            chest: "Hips".into(),
            ..Default::default()
        });
        rig.controller.configure(&mut rig.avatar, renamed).unwrap();
        assert_eq!(rig.controller.binding().chest, rig.avatar.skeleton.find("Hips"));

        let offsets = *rig.controller.offsets().unwrap();
        assert!(offsets.inv_hips_to_head.abs_diff_eq(Vec3::new(0.0, -0.4, 0.0), 1e-6));

        let bad = IkConfig::default().with_rotation_speed(f32::NAN);
        assert!(rig.controller.configure(&mut rig.avatar, bad).is_err());
        assert_eq!(rig.controller.config().bones.chest, "Hips");
    }

    #[test]
    fn hand_snaps_to_authored_position_on_bind() {
        let mut skeleton = humanoid(HumanoidOptions::default());
        let hand = skeleton.find("LeftHand").unwrap();
        let authored = skeleton.bone(hand).bind_pose.position;
        skeleton.bone_mut(hand).local.position = Vec3::new(5.0, 5.0, 5.0);

        let rig = Rig::with_skeleton(IkConfig::default(), skeleton);
        assert_eq!(rig.avatar.skeleton.bone(hand).local.position, authored);
    }
}
