use thiserror::Error;

#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Missing {role} bone '{name}'")]
    MissingBone { role: &'static str, name: String },

    #[error("No IK root attached to avatar")]
    MissingIkRoot,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AvatarError>;
