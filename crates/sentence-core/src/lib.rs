mod base_keymap;
mod core;
mod keymap;
pub mod markup;
pub mod mutation;
pub mod navigator;
mod ops;
mod plugin;
mod position;
mod schema;
mod serde_value;
mod transform;

pub use crate::core::*;
pub use crate::keymap::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::position::*;
pub use crate::schema::*;
pub use crate::serde_value::*;
pub use crate::transform::*;
