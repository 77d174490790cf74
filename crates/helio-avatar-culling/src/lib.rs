pub mod camera_tools;
pub mod frustum;
pub mod viewer;

pub use camera_tools::*;
pub use frustum::*;
pub use viewer::*;
