pub use self::{book::*, reservation::*};

mod book;
mod reservation;
