mod book;
mod common;
mod reservation;
mod user;

pub use self::{book::*, common::*, reservation::*, user::*};
