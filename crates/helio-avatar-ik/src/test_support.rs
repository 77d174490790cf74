use crate::Skeleton;
use glam::Vec3;
use helio_avatar_core::Transform;

#[derive(Clone, Copy)]
pub struct HumanoidOptions {
    pub eyes: bool,
    pub arms: bool,
    pub hands: bool,
    pub feet: bool,
}

impl Default for HumanoidOptions {
    fn default() -> Self {
        Self {
            eyes: true,
            arms: true,
            hands: true,
            feet: true,
        }
    }
}

/// A small rig with standard names whose hips-to-head chain is (0, 0.6, 0).
pub fn humanoid(options: HumanoidOptions) -> Skeleton {
    let at = |x: f32, y: f32, z: f32| Transform::from_position(Vec3::new(x, y, z));
    let mut skeleton = Skeleton::new();

    let hips = skeleton.add_bone("Hips", None, at(0.0, 0.0, 0.0));
    let spine = skeleton.add_bone("Spine", Some(hips), at(0.0, 0.2, 0.0));
    let neck = skeleton.add_bone("Neck", Some(spine), at(0.0, 0.3, 0.0));
    let head = skeleton.add_bone("Head", Some(neck), at(0.0, 0.1, 0.0));

    if options.eyes {
        skeleton.add_bone("LeftEye", Some(head), at(0.03, 0.1, 0.05));
        skeleton.add_bone("RightEye", Some(head), at(-0.03, 0.1, 0.05));
    }
    if options.arms {
        skeleton.add_bone("LeftArm", Some(spine), at(0.2, 0.2, 0.0));
        skeleton.add_bone("RightArm", Some(spine), at(-0.2, 0.2, 0.0));
    }
    if options.hands {
        skeleton.add_bone("LeftHand", Some(spine), at(0.45, 0.2, 0.1));
        skeleton.add_bone("RightHand", Some(spine), at(-0.45, 0.2, 0.1));
    }
    if options.feet {
        skeleton.add_bone("LeftFoot", Some(hips), at(0.1, -0.9, 0.0));
        skeleton.add_bone("RightFoot", Some(hips), at(-0.1, -0.9, 0.0));
    }

    skeleton
}
