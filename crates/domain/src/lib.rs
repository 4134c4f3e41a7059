pub mod errors;
pub mod events;
pub mod filter;
pub mod profile;
pub mod todo;

pub use errors::*;
pub use events::*;
pub use filter::*;
pub use profile::*;
pub use todo::*;
