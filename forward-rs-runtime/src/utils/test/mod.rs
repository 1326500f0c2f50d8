pub use self::frame_builders::*;

pub use self::harness::*;
