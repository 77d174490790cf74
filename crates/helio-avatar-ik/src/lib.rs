pub mod avatar;
pub mod config;
pub mod hand_visibility;
pub mod ik;
pub mod ik_root;
pub mod rig;
pub mod scheduler;
pub mod skeleton;
pub mod visibility;

#[cfg(test)]
mod test_support;

pub use avatar::*;
pub use config::*;
pub use hand_visibility::*;
pub use ik::*;
pub use ik_root::*;
pub use rig::*;
pub use scheduler::*;
pub use skeleton::*;
pub use visibility::*;
