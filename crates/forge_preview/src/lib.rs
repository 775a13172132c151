pub mod config;
pub mod generation;
pub mod mount;
pub mod normalize;
pub mod outcome;
pub mod resolve;
pub mod sandbox;
pub mod session;
pub mod source;
pub mod styling;
pub mod transform;

pub use config::*;
pub use generation::*;
pub use mount::*;
pub use normalize::normalize;
pub use outcome::*;
pub use resolve::*;
pub use sandbox::*;
pub use session::*;
pub use source::SourceText;
pub use styling::*;
pub use transform::*;
