pub mod events;
pub mod html;
pub mod node;
pub mod stylesheet;
pub mod target;

pub use events::*;
pub use node::*;
pub use stylesheet::*;
pub use target::*;
