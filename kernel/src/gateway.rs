mod catalog;
mod directory;
mod notification;

pub use self::{catalog::*, directory::*, notification::*};
