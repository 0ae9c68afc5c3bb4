pub use side_model::{ElectSideModel, FluidSideModel};
pub use busbar_model::BusbarModel;
pub use tank_model::TankModel;
pub use elect_pair::{ElectPair, ElectSide};
pub use fluid_pair::{FluidPair, FluidSide};

//List all the submodules here
pub mod side_model;
pub mod busbar_model;
pub mod tank_model;
pub mod elect_pair;
pub mod fluid_pair;

use log::{error, info, warn};
use uuid::Uuid;
use crate::interop::base::{Notification, NotificationLevel};

/*
Routes a drained interface notification into the logging system, prefixed
with the side it came from.
 */
pub(crate) fn route_notification(side_name: &str, side_id: &Uuid, notification: &Notification) {
    match notification.level {
        NotificationLevel::Info => info!("{} [{}]: {}", side_name, side_id, notification.message),
        NotificationLevel::Warn => warn!("{} [{}]: {}", side_name, side_id, notification.message),
        NotificationLevel::Err => error!("{} [{}]: {}", side_name, side_id, notification.message),
        NotificationLevel::None => {}
    }
}
