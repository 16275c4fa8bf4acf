mod common;
mod context;
mod document;
mod entity;
mod event;

pub use common::*;
pub use context::*;
pub use document::*;
pub use entity::*;
pub use event::*;
