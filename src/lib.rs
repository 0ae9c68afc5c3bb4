
#[macro_use]
extern crate ini;

pub mod interop;
pub mod io;
pub mod numerical;
pub mod pair;
pub mod telemetry;
pub mod tests;
