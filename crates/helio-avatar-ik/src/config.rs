use helio_avatar_core::{AvatarError, Result, Side};
use serde::{Deserialize, Serialize};

/// Skeleton bone names the IK controller binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoneNames {
    pub left_eye: String,
    pub right_eye: String,
    pub head: String,
    pub neck: String,
    pub chest: String,
    pub left_hand: String,
    pub right_hand: String,
    pub left_arm: String,
    pub right_arm: String,
    pub left_foot: String,
    pub right_foot: String,
}

impl Default for BoneNames {
    fn default() -> Self {
        Self {
            left_eye: "LeftEye".into(),
            right_eye: "RightEye".into(),
            head: "Head".into(),
            neck: "Neck".into(),
            chest: "Spine".into(),
            left_hand: "LeftHand".into(),
            right_hand: "RightHand".into(),
            left_arm: "LeftArm".into(),
            right_arm: "RightArm".into(),
            left_foot: "LeftFoot".into(),
            right_foot: "RightFoot".into(),
        }
    }
}

impl BoneNames {
    pub fn eye(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_eye,
            Side::Right => &self.right_eye,
        }
    }

    pub fn hand(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_hand,
            Side::Right => &self.right_hand,
        }
    }

    pub fn arm(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_arm,
            Side::Right => &self.right_arm,
        }
    }

    pub fn foot(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_foot,
            Side::Right => &self.right_foot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IkConfig {
    pub bones: BoneNames,
    /// Hip yaw convergence rate, per second.
    pub rotation_speed: f32,
    /// Yaw error in radians above which the hips snap instead of easing.
    pub max_lerp_angle: f32,
    /// Solve every frame regardless of visibility, e.g. for the local user's avatar.
    pub always_update: bool,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            bones: BoneNames::default(),
            rotation_speed: 8.0,
            max_lerp_angle: 90f32.to_radians(),
            always_update: false,
        }
    }
}

impl IkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rotation_speed.is_finite() || self.rotation_speed < 0.0 {
            return Err(AvatarError::InvalidConfiguration(format!(
                "rotation_speed must be a non-negative number, got {}",
                self.rotation_speed
            )));
        }

        if !self.max_lerp_angle.is_finite()
            || self.max_lerp_angle <= 0.0
            || self.max_lerp_angle > std::f32::consts::PI
        {
            return Err(AvatarError::InvalidConfiguration(format!(
                "max_lerp_angle must be in (0, pi], got {}",
                self.max_lerp_angle
            )));
        }

        Ok(())
    }

    pub fn with_bones(mut self, bones: BoneNames) -> Self {
        self.bones = bones;
        self
    }

    pub fn with_rotation_speed(mut self, rotation_speed: f32) -> Self {
        self.rotation_speed = rotation_speed;
        self
    }

    pub fn with_max_lerp_angle(mut self, max_lerp_angle: f32) -> Self {
        self.max_lerp_angle = max_lerp_angle;
        self
    }

    pub fn with_always_update(mut self, always_update: bool) -> Self {
        self.always_update = always_update;
        self
    }
}
