//! Domain models for the clinic admin.

mod appointment;
mod pet;
mod response;

pub use appointment::*;
pub use pet::*;
pub use response::*;
