use bitflags::bitflags;
use glam::Mat4;
use helio_avatar_core::Transform;
use std::collections::HashMap;

pub type BoneId = usize;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BoneFlags: u32 {
        const VISIBLE = 1 << 0;
        const MATRIX_NEEDS_UPDATE = 1 << 1;
    }
}

pub struct Bone {
    pub name: String,
    pub parent: Option<BoneId>,
    /// Current local transform, written by IK.
    pub local: Transform,
    /// Local transform as authored in the asset.
    pub bind_pose: Transform,
    pub flags: BoneFlags,
}

impl Bone {
    pub fn is_visible(&self) -> bool {
        self.flags.contains(BoneFlags::VISIBLE)
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(BoneFlags::VISIBLE, visible);
    }

    pub fn mark_needs_update(&mut self) {
        self.flags.insert(BoneFlags::MATRIX_NEEDS_UPDATE);
    }

    pub fn needs_update(&self) -> bool {
        self.flags.contains(BoneFlags::MATRIX_NEEDS_UPDATE)
    }
}

/// Bone hierarchy of one avatar. Parents are always added before their children.
pub struct Skeleton {
    pub bones: Vec<Bone>,
    pub bone_names: HashMap<String, BoneId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self {
            bones: Vec::new(),
            bone_names: HashMap::new(),
        }
    }

    pub fn add_bone(&mut self, name: impl Into<String>, parent: Option<BoneId>, local: Transform) -> BoneId {
        let name = name.into();
        let index = self.bones.len();
        debug_assert!(parent.map_or(true, |p| p < index), "parent must precede child");

        self.bone_names.insert(name.clone(), index);
        self.bones.push(Bone {
            name,
            parent,
            local,
            bind_pose: local,
            flags: BoneFlags::VISIBLE,
        });
        index
    }

    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.bone_names.get(name).copied()
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id]
    }

    pub fn bone_mut(&mut self, id: BoneId) -> &mut Bone {
        &mut self.bones[id]
    }

    pub fn local_matrix(&self, id: BoneId) -> Mat4 {
        self.bones[id].local.to_matrix()
    }

    /// Model-space matrices of every bone, parent-first.
    pub fn model_matrices(&self) -> Vec<Mat4> {
        let mut matrices = vec![Mat4::IDENTITY; self.bones.len()];

        for (i, bone) in self.bones.iter().enumerate() {
            let parent_matrix = bone.parent
                .map(|p| matrices[p])
                .unwrap_or(Mat4::IDENTITY);

            matrices[i] = parent_matrix * bone.local.to_matrix();
        }

        matrices
    }

    /// Clears and returns the bones flagged for a matrix update.
    pub fn take_dirty(&mut self) -> Vec<BoneId> {
        self.bones
            .iter_mut()
            .enumerate()
            .filter(|(_, bone)| bone.needs_update())
            .map(|(i, bone)| {
                bone.flags.remove(BoneFlags::MATRIX_NEEDS_UPDATE);
                i
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}
