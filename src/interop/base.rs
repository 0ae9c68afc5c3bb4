use serde_derive::{Deserialize, Serialize};

/// Interface roles. None means the side arbitrates its role normally;
/// Supply or Demand pin it there when used as the forced role.
#[derive(Clone, Copy, Default, PartialEq, Debug, Serialize, Deserialize)]
pub enum Role {
    #[default]
    None,
    Supply,
    Demand,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Supply => "supply",
            Role::Demand => "demand",
        }
    }
}

/// Severity of a queued notification. None marks the empty-queue message.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub enum NotificationLevel {
    Info,
    Warn,
    Err,
    #[default]
    None,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Warn => "warn",
            NotificationLevel::Err => "err",
            NotificationLevel::None => "none",
        }
    }
}

/// A message from the interface to the outside. The host drains these and
/// routes them into its own logging.
#[derive(Clone, Default, Debug)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: &str) -> Notification {
        Notification {
            level,
            message: message.to_string(),
        }
    }
}

/// The wire-fixed portion every interface snapshot carries. Each side
/// advances its own frame_count every step and echoes the peer's count back
/// in frame_loopback so the peer can measure round-trip lag.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct FrameHeader {
    pub frame_count: u32,    //Frame count driven by this side
    pub frame_loopback: u32, //Frame count driven by the other side, echoed back
    pub demand_mode: bool,   //True when this side is acting in the Demand role
}

impl FrameHeader {
    /*
    The peer has sent at least one post-init snapshot. Variants layer their
    own extra checks on top of this.
     */
    pub fn has_valid_data(&self) -> bool {
        self.frame_count > 0
    }
}

/// Per-side arbitration state shared by every bus variant: pair-master
/// designation, flip gating counters, the loop latency measurement, the
/// operator role override and the notification queue. The variants own
/// their snapshot records and hand the relevant headers in by reference.
#[derive(Default)]
#[derive(Clone)]
pub struct BusCore {
    pub is_pair_master: bool,            //Fixed at init; breaks exact arbitration ties
    pub in_data_last_demand_mode: bool,  //Last demand flag seen from the peer
    pub frames_since_flip: i32,          //Frames since this side last changed role
    pub loop_latency: i32,               //Round-trip data lag in whole frames
    pub forced_role: Role,
    notifications: Vec<Notification>,
}

impl BusCore {
    pub fn new() -> BusCore {
        Default::default()
    }

    /*
    Resets counters and puts this side in Supply. The forced role is
    deliberately not reset, the operator may have set it before init.
     */
    pub fn initialize(&mut self, is_pair_master: bool, out_header: &mut FrameHeader) {
        self.is_pair_master = is_pair_master;
        self.in_data_last_demand_mode = false;
        self.frames_since_flip = 0;
        self.loop_latency = 0;

        //Both sides start out in Supply. They negotiate one of them taking
        //over the Demand role once data starts flowing.
        out_header.demand_mode = false;
    }

    /*
    Advances the outgoing frame counter, measures the round-trip loop
    latency, and echoes the peer's frame count back. Called exactly once per
    step, before any role decision.
     */
    pub fn update_frame_counts(&mut self, in_header: &FrameHeader, out_header: &mut FrameHeader) {
        out_header.frame_count += 1;
        self.frames_since_flip += 1;
        self.loop_latency = out_header.frame_count as i32 - in_header.frame_loopback as i32;
        out_header.frame_loopback = in_header.frame_count;
    }

    pub fn force_supply_role(&mut self) {
        self.forced_role = Role::Supply;
    }

    pub fn force_demand_role(&mut self) {
        self.forced_role = Role::Demand;
    }

    pub fn reset_force_role(&mut self) {
        self.forced_role = Role::None;
    }

    pub fn push_notification(&mut self, level: NotificationLevel, message: &str) {
        self.notifications.push(Notification::new(level, message));
    }

    /*
    Pops the most recently pushed notification off the queue and returns it
    together with the remaining queue depth. An empty queue yields an empty
    None-level message and depth zero.
     */
    pub fn pop_notification(&mut self) -> (Notification, usize) {
        let notification = match self.notifications.pop() {
            Some(n) => n,
            None => Notification::new(NotificationLevel::None, ""),
        };
        (notification, self.notifications.len())
    }
}
