mod amount;
mod id;

pub use self::{amount::*, id::*};
