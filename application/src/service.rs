mod authorization;
mod reservation;

#[cfg(test)]
mod memory;

pub use self::{authorization::*, reservation::*};
