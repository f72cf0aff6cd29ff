pub mod alerts;
pub mod asset;
pub mod errors;
pub mod policy;

pub use alerts::*;
pub use asset::*;
pub use errors::*;
pub use policy::*;
