use serde_derive::{Deserialize, Serialize};
use super::base::{BusCore, FrameHeader, Notification, NotificationLevel, Role};

/// Describes the ability of one voltage regulator in the local model to
/// supply power to the interface location. The local model registers one of
/// these per regulator and drives it every step: available means the
/// regulator is enabled AND has a conduction path to the interface.
#[derive(Clone, Copy, Default, Debug)]
pub struct VoltageSupply {
    pub available: bool,
    pub maximum_voltage: f32, //V, the regulator's setpoint or ceiling
}

/// Wire payload for the electrical interface. demand_power is the watts the
/// Demand side pulls from the shared bus (zero while in Supply), and
/// supply_voltage is either the actual interface voltage (Supply) or the
/// highest locally-available regulated voltage (Demand).
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct ElectSnapshot {
    pub header: FrameHeader,
    pub demand_power: f32,   //W
    pub supply_voltage: f32, //V
}

impl ElectSnapshot {
    pub fn has_valid_data(&self) -> bool {
        self.header.frame_count > 1
    }
}

/// Electrical distributed two-way bus interface. Arbitrates which of two
/// coupled models drives the shared bus voltage: the Supply role gravitates
/// to the side with the higher locally-available regulated voltage, and a
/// side that sees its peer also in Demand takes Supply back once a full lag
/// cycle has passed since its last flip.
#[derive(Default)]
#[derive(Clone)]
pub struct ElectBus {
    pub in_data: ElectSnapshot,  //Latest snapshot received from the peer
    pub out_data: ElectSnapshot, //Snapshot to transmit to the peer
    pub core: BusCore,
    supplies: Vec<VoltageSupply>,
}

impl ElectBus {
    pub fn new() -> ElectBus {
        Default::default()
    }

    /*
    Registers a voltage supply and returns its index handle. The local model
    calls this once per regulator that can feed the interface location, then
    drives the descriptor through voltage_supply_mut each step.
     */
    pub fn add_voltage_supply(&mut self) -> usize {
        self.supplies.push(VoltageSupply::default());
        self.supplies.len() - 1
    }

    pub fn voltage_supply_mut(&mut self, idx: usize) -> &mut VoltageSupply {
        &mut self.supplies[idx]
    }

    pub fn num_voltage_supplies(&self) -> usize {
        self.supplies.len()
    }

    /*
    The primary side bootstraps in Supply and the other side in Demand. This
    is only the initial guess: if both sides initialize the same way they
    sort it out at runtime.
     */
    pub fn initialize(&mut self, is_primary_side: bool, voltage: f32) {
        self.core.initialize(is_primary_side, &mut self.out_data.header);

        self.in_data.header.demand_mode = is_primary_side;
        self.in_data.demand_power = 0.0;
        self.in_data.supply_voltage = voltage;

        self.out_data.header.demand_mode = !is_primary_side;
        self.out_data.demand_power = 0.0;
        self.out_data.supply_voltage = voltage;
    }

    /*
    Advances frame counters and the latency measurement. All electrical mode
    decisions happen in update. Call exactly once per model step, first.
     */
    pub fn process_inputs(&mut self) {
        self.core
            .update_frame_counts(&self.in_data.header, &mut self.out_data.header);
    }

    /*
    The step workhorse: aggregates the registered supplies into the best
    available local voltage, runs the mode switching logic, and drives the
    outgoing voltage and power demand. May be called again later in the same
    step to refresh the outputs with the latest local solution.
     */
    pub fn update(&mut self, local_voltage: f32, local_power_demand: f32) {
        //Highest available voltage the local model could regulate to.
        let mut avail_v = 0.0_f32;
        for supply in self.supplies.iter() {
            if supply.available && supply.maximum_voltage > avail_v {
                avail_v = supply.maximum_voltage;
            }
        }

        match self.core.forced_role {
            Role::Supply => self.out_data.header.demand_mode = false,
            Role::Demand => self.out_data.header.demand_mode = true,
            Role::None => {
                //Only arbitrate once the peer has echoed a frame back.
                if self.in_data.header.frame_loopback > 0 {
                    if self.out_data.header.demand_mode {
                        //Peer gave up Demand; we take Supply once enough
                        //frames have passed since our own last flip.
                        if self.in_data.header.demand_mode
                            && self.core.frames_since_flip > self.core.loop_latency
                        {
                            self.out_data.header.demand_mode = false;
                            self.core.frames_since_flip = 0;
                            self.core.push_notification(
                                NotificationLevel::Info,
                                "flipping to Supply role in response to remote's takeover of Demand role.",
                            );
                        }
                    } else if avail_v < self.in_data.supply_voltage {
                        //Peer has a higher voltage source than we can offer.
                        self.out_data.header.demand_mode = true;
                        self.core.frames_since_flip = 0;
                        let msg = format!(
                            "flipping to Demand role with available V: {} < remote V: {}.",
                            avail_v, self.in_data.supply_voltage
                        );
                        self.core.push_notification(NotificationLevel::Info, &msg);
                    }
                }
            }
        }

        //In Demand we publish the voltage we could supply, which lets the
        //peer decide when to hand Supply back, plus our actual load. In
        //Supply we publish the actual voltage at our interface location as
        //the peer's boundary condition, and force our load output to zero.
        if self.out_data.header.demand_mode {
            self.out_data.supply_voltage = avail_v;
            self.out_data.demand_power = local_power_demand;
        } else {
            self.out_data.supply_voltage = local_voltage;
            self.out_data.demand_power = 0.0;
        }
    }

    pub fn is_in_demand_role(&self) -> bool {
        self.out_data.header.demand_mode
    }

    /*
    The power demand from the remote model to place as a load on this side.
    Only meaningful while in Supply; returns zero in Demand.
     */
    pub fn get_remote_load(&self) -> f32 {
        if self.out_data.header.demand_mode {
            return 0.0;
        }
        self.in_data.demand_power
    }

    /// Returns the peer's supply voltage in either role. In the Supply role
    /// the local model may still use the peer's potential voltage as a diode
    /// fallback when the local regulator briefly drops out.
    pub fn get_remote_supply(&self) -> f32 {
        self.in_data.supply_voltage
    }

    pub fn force_supply_role(&mut self) {
        self.core.force_supply_role();
    }

    pub fn force_demand_role(&mut self) {
        self.core.force_demand_role();
    }

    pub fn reset_force_role(&mut self) {
        self.core.reset_force_role();
    }

    pub fn pop_notification(&mut self) -> (Notification, usize) {
        self.core.pop_notification()
    }
}
