mod interface;
pub use self::interface::*;

mod route;
pub use self::route::*;
