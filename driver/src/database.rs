pub use self::{postgres::*, redis::*};

mod postgres;
mod redis;
