pub mod camera;
pub mod error;
pub mod math;
pub mod side;
pub mod transform;

pub use camera::*;
pub use error::*;
pub use math::*;
pub use side::*;
pub use transform::*;
