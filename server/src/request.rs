pub use self::reservation::*;

mod reservation;
