pub mod memory;
pub mod store;
pub mod subscription;

pub use memory::*;
pub use store::*;
pub use subscription::*;
