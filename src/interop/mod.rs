pub use base::{BusCore, FrameHeader, Notification, NotificationLevel, Role};
pub use mixture::MixtureData;

//List all the submodules here
pub mod base;
pub mod mixture;
pub mod elect;
pub mod fluid;
