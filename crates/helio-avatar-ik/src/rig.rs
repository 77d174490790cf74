//! Binding of configured bone names to skeleton bones, and the offsets derived from it.

use crate::{BoneId, BoneNames, Skeleton};
use glam::{Mat4, Vec3};
use helio_avatar_core::{AvatarError, Side, Sided};

/// Eye position assumed for rigs without eye bones.
pub const DEFAULT_EYE_POSITION: Vec3 = Vec3::new(0.0, 1.6, 0.0);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RigBinding {
    pub eyes: Sided<Option<BoneId>>,
    pub head: Option<BoneId>,
    pub neck: Option<BoneId>,
    pub chest: Option<BoneId>,
    pub hands: Sided<Option<BoneId>>,
    pub arms: Sided<Option<BoneId>>,
    pub feet: Sided<Option<BoneId>>,
}

/// The bones without which no body solve is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredBones {
    pub head: BoneId,
    pub neck: BoneId,
    pub chest: BoneId,
}

impl RigBinding {
    pub fn resolve(skeleton: &Skeleton, names: &BoneNames) -> Self {
        Self {
            eyes: Sided::from_fn(|side| skeleton.find(names.eye(side))),
            head: skeleton.find(&names.head),
            neck: skeleton.find(&names.neck),
            chest: skeleton.find(&names.chest),
            hands: Sided::from_fn(|side| skeleton.find(names.hand(side))),
            arms: Sided::from_fn(|side| skeleton.find(names.arm(side))),
            feet: Sided::from_fn(|side| skeleton.find(names.foot(side))),
        }
    }

    pub fn required(&self) -> Option<RequiredBones> {
        Some(RequiredBones {
            head: self.head?,
            neck: self.neck?,
            chest: self.chest?,
        })
    }

    /// Required bones that did not resolve. A rig also needs at least one hand.
    pub fn missing_required(&self, names: &BoneNames) -> Vec<AvatarError> {
        let mut missing = Vec::new();
        let mut check = |bone: Option<BoneId>, role: &'static str, name: &str| {
            if bone.is_none() {
                missing.push(AvatarError::MissingBone {
                    role,
                    name: name.to_string(),
                });
            }
        };

        check(self.head, "head", &names.head);
        check(self.neck, "neck", &names.neck);
        check(self.chest, "chest", &names.chest);
        if self.hands.left.is_none() && self.hands.right.is_none() {
            check(None, "hand", &format!("{}|{}", names.left_hand, names.right_hand));
        }

        missing
    }

    pub fn has_foot(&self) -> bool {
        self.feet.left.is_some() || self.feet.right.is_some()
    }

    pub fn has_arm(&self, side: Side) -> bool {
        self.arms[side].is_some()
    }
}

/// Rig constants the solver needs every frame, recomputed with the binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedOffsets {
    /// Midpoint of the eyes in head space.
    pub middle_eye: Vec3,
    pub inv_middle_eye_to_head: Mat4,
    /// Negated chest + neck + head translation.
    pub inv_hips_to_head: Vec3,
}

impl DerivedOffsets {
    pub fn compute(binding: &RigBinding, skeleton: &Skeleton) -> Option<Self> {
        let required = binding.required()?;

        let eye_position = |side: Side| {
            binding.eyes[side]
                .map(|id| skeleton.bone(id).local.position)
                .unwrap_or(DEFAULT_EYE_POSITION)
        };
        let middle_eye = (eye_position(Side::Left) + eye_position(Side::Right)) / 2.0;

        let hips_to_head = skeleton.bone(required.chest).local.position
            + skeleton.bone(required.neck).local.position
            + skeleton.bone(required.head).local.position;

        Some(Self {
            middle_eye,
            inv_middle_eye_to_head: Mat4::from_translation(middle_eye).inverse(),
            inv_hips_to_head: -hips_to_head,
        })
    }
}

/// Puts a hand bone back at its authored position.
pub fn snap_to_bind_position(skeleton: &mut Skeleton, id: BoneId) {
    let bone = skeleton.bone_mut(id);
    bone.local.position = bone.bind_pose.position;
    bone.mark_needs_update();
}
