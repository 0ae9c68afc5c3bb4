use libm::pow;
use serde_derive::{Deserialize, Serialize};
use super::base::{BusCore, FrameHeader, Notification, NotificationLevel, Role};
use super::mixture::MixtureData;

/// Supply-over-Demand capacitance ratio that triggers the runtime flip to
/// Demand, and the ceiling on the filter's capacitance ratio term. The
/// margin keeps roles from thrashing across equal-capacitance conditions.
pub const MODING_CAPACITANCE_RATIO: f64 = 1.25;
/// Constants in the lag gain equation: lag_gain = 1.5 * 0.75^lag_frames.
pub const DEMAND_FILTER_CONST_A: f64 = 1.5;
pub const DEMAND_FILTER_CONST_B: f64 = 0.75;
/// Slope applied to the capacitance-ratio term of the demand filter gain.
pub const DEMAND_FILTER_GAIN_SLOPE: f64 = 4.0;
/// Clamp on the lag gain exponent.
pub const DEMAND_FILTER_MAX_EXPONENT: i32 = 100;

const FLOAT_EPSILON: f64 = f32::EPSILON as f64;

/// Wire payload for the fluid interface. source is dual-meaning: interface
/// pressure (Pa) while this side is in Supply, demanded molar flow rate
/// (mol/s, positive from the Supply side into the Demand side) while in
/// Demand. capacitance is the local moles-per-pressure at the interface.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct FluidSnapshot {
    pub header: FrameHeader,
    pub capacitance: f64, //mol/Pa
    pub source: f64,      //Pa in Supply, mol/s in Demand
    pub mixture: MixtureData,
}

impl FluidSnapshot {
    /*
    Allocates the mixture arrays. Safe to call again.
     */
    pub fn initialize(&mut self, n_bulk: usize, n_tc: usize) {
        self.mixture.initialize(n_bulk, n_tc);
    }

    /*
    Valid when the peer has sent at least one post-init frame, the energy is
    positive, the capacitance is non-negative, the source is non-negative
    while the peer is in Supply (a pressure can't be negative, a demanded
    flow can), and no mixture fraction is negative.
     */
    pub fn has_valid_data(&self) -> bool {
        if !self.header.has_valid_data()
            || self.mixture.energy <= 0.0
            || self.capacitance < 0.0
            || (self.source < 0.0 && !self.header.demand_mode)
        {
            return false;
        }
        for fraction in self.mixture.mole_fractions.iter() {
            if *fraction < 0.0 {
                return false;
            }
        }
        for fraction in self.mixture.tc_mole_fractions.iter() {
            if *fraction < 0.0 {
                return false;
            }
        }
        true
    }

    /*
    Deep copy bounded by the receiver's mixture sizes. The receiver's arrays
    are never resized.
     */
    pub fn assign_from(&mut self, that: &FluidSnapshot) {
        self.header = that.header.clone();
        self.capacitance = that.capacitance;
        self.source = that.source;
        self.mixture.assign_from(&that.mixture);
    }
}

/// Fluid state of the interface volume: pressure plus energy and mixture.
/// What the Supply side publishes and the Demand side applies as its
/// boundary condition.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct FluidState {
    pub pressure: f64, //Pa
    pub mixture: MixtureData,
}

impl FluidState {
    pub fn new(n_bulk: usize, n_tc: usize) -> FluidState {
        let mut state = FluidState::default();
        state.mixture.initialize(n_bulk, n_tc);
        state
    }
}

/// State of the flow to/from the interface volume: molar flow rate plus
/// energy and mixture. What the Demand side publishes and the Supply side
/// applies as a flow source. Positive flow rates pull fluid from the Supply
/// side into the Demand side.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct FlowState {
    pub flow_rate: f64, //mol/s
    pub mixture: MixtureData,
}

impl FlowState {
    pub fn new(n_bulk: usize, n_tc: usize) -> FlowState {
        let mut state = FlowState::default();
        state.mixture.initialize(n_bulk, n_tc);
        state
    }
}

/// Fluid distributed two-way bus interface. The side with the larger fluid
/// capacitance holds Supply so the smaller side integrates against a stable
/// pressure boundary, and the Demand side's requested flow rate is limited
/// by a stability filter tuned to the measured data lag.
#[derive(Default)]
#[derive(Clone)]
pub struct FluidBus {
    pub in_data: FluidSnapshot,  //Latest snapshot received from the peer
    pub out_data: FluidSnapshot, //Snapshot to transmit to the peer
    pub core: BusCore,
    pub demand_limit_gain: f64,      //Current stability filter gain, for observability
    pub demand_limit_flow_rate: f64, //Current Demand-side flow limit (mol/s)
}

impl FluidBus {
    pub fn new() -> FluidBus {
        Default::default()
    }

    /*
    Allocates the mixture arrays in both interface records and resets the
    arbitration state. Calling twice is equivalent to calling once.
     */
    pub fn initialize(&mut self, is_pair_master: bool, n_bulk: usize, n_tc: usize) {
        self.in_data.initialize(n_bulk, n_tc);
        self.out_data.initialize(n_bulk, n_tc);

        self.core.initialize(is_pair_master, &mut self.out_data.header);
        self.demand_limit_gain = 0.0;
        self.demand_limit_flow_rate = 0.0;
    }

    /*
    Advances frame counters, then handles role flips driven by the incoming
    data: forced overrides, taking Supply when the peer grabs Demand, and
    the initial smaller-capacitance-takes-Demand negotiation at run start.
    Call exactly once per model step, before reading boundary state.
     */
    pub fn process_inputs(&mut self) {
        self.core
            .update_frame_counts(&self.in_data.header, &mut self.out_data.header);
        self.flip_modes_on_input();
    }

    fn flip_modes_on_input(&mut self) {
        if Role::Demand == self.core.forced_role && !self.is_in_demand_role() {
            self.flip_to_demand_mode();
        } else if Role::Supply == self.core.forced_role && self.is_in_demand_role() {
            self.flip_to_supply_mode();
        } else if self.in_data.has_valid_data() {
            if self.out_data.header.demand_mode
                && self.in_data.header.demand_mode
                && !self.core.in_data_last_demand_mode
            {
                //The peer initiated the demand/supply swap ahead of us, so
                //we take the Supply side of it.
                self.flip_to_supply_mode();
            } else if !self.in_data.header.demand_mode && !self.out_data.header.demand_mode {
                //Both sides Supply: this is run start. The side with the
                //smaller capacitance takes Demand, master breaks exact ties.
                if self.out_data.capacitance < self.in_data.capacitance
                    || (self.core.is_pair_master
                        && self.out_data.capacitance == self.in_data.capacitance)
                {
                    self.flip_to_demand_mode();
                }
            }
            self.core.in_data_last_demand_mode = self.in_data.header.demand_mode;
        }
    }

    /*
    Flips to Demand unless forced to Supply. Returns whether it flipped.
     */
    fn flip_to_demand_mode(&mut self) -> bool {
        if Role::Supply != self.core.forced_role {
            self.out_data.header.demand_mode = true;
            self.core.frames_since_flip = 0;
            self.core
                .push_notification(NotificationLevel::Info, "switched to Demand mode.");
            return true;
        }
        false
    }

    fn flip_to_supply_mode(&mut self) -> bool {
        if Role::Demand != self.core.forced_role {
            self.out_data.header.demand_mode = false;
            self.core.frames_since_flip = 0;
            self.core
                .push_notification(NotificationLevel::Info, "switched to Supply mode.");
            return true;
        }
        false
    }

    /*
    Flips from Supply to Demand when the peer's capacitance exceeds ours by
    the hysteresis margin. No check until we've held Supply for a full lag
    cycle, which stops extra flips during large transients.
     */
    fn flip_modes_on_capacitance(&mut self) {
        if self.core.frames_since_flip > self.core.loop_latency
            && self.out_data.capacitance * MODING_CAPACITANCE_RATIO < self.in_data.capacitance
        {
            if self.flip_to_demand_mode() {
                //The source field's meaning is changing from pressure to
                //flow rate. Zero it so the peer doesn't read our old
                //pressure as a huge flow demand. It gets a real demand flux
                //on the next full pass in Demand mode.
                self.out_data.source = 0.0;
            }
        }
    }

    /*
    Maximum molar flow rate between the Demand-side model and the interface
    volume that keeps the lagged loop stable. A model in the Demand role
    should clamp its solved interface flow to this. Returns zero (and stores
    zero gain) when not in Demand, when peer data is missing or invalid, or
    when the inputs would divide by zero.
     */
    pub fn compute_demand_limit(&mut self, timestep: f64, demand_side_pressure: f64) -> f64 {
        let mut gain = 0.0;
        let mut ndot_limit = 0.0;
        if self.is_in_demand_role()
            && !self.in_data.header.demand_mode
            && self.in_data.has_valid_data()
        {
            if timestep > FLOAT_EPSILON
                && self.out_data.capacitance > FLOAT_EPSILON
                && self.in_data.capacitance > FLOAT_EPSILON
            {
                let exponent = self
                    .core
                    .loop_latency
                    .max(1)
                    .min(DEMAND_FILTER_MAX_EXPONENT);

                //Lag gain falls off quickly as the round-trip lag grows.
                let lag_gain =
                    1.0_f64.min(DEMAND_FILTER_CONST_A * pow(DEMAND_FILTER_CONST_B, exponent as f64));

                //When the capacitances are nearly equal the gain collapses
                //to the lag gain; when the Supply side's capacitance exceeds
                //ours by the full ratio it rises back toward one.
                let cs_over_cd = (self.in_data.capacitance / self.out_data.capacitance)
                    .max(1.0)
                    .min(MODING_CAPACITANCE_RATIO);
                gain = lag_gain + (1.0 - lag_gain) * (cs_over_cd - 1.0) * DEMAND_FILTER_GAIN_SLOPE;

                ndot_limit = gain * (demand_side_pressure - self.in_data.source).abs()
                    / (timestep
                        * (1.0 / self.out_data.capacitance + 1.0 / self.in_data.capacitance));
            }
        }
        self.demand_limit_gain = gain;
        self.demand_limit_flow_rate = ndot_limit;
        self.demand_limit_flow_rate
    }

    /*
    Final output updates before transmission: stores the latest local
    capacitance and, while in Supply, checks for the capacitance-driven flip
    to Demand. Call exactly once per model step, after the local solve.
     */
    pub fn process_outputs(&mut self, capacitance: f64) {
        self.out_data.capacitance = capacitance;
        if !self.is_in_demand_role() {
            self.flip_modes_on_capacitance();
        }
    }

    /*
    Supply-only: publishes the fluid state of the interface volume to the
    peer. Pushes a warning and leaves the outputs alone if called in Demand.
     */
    pub fn set_fluid_state(&mut self, fluid: &FluidState) {
        if self.is_in_demand_role() {
            self.core.push_notification(
                NotificationLevel::Warn,
                "set_fluid_state was called when in the Demand role.",
            );
        } else {
            self.out_data.source = fluid.pressure;
            self.out_data.mixture.energy = fluid.mixture.energy;
            self.out_data
                .mixture
                .set_mole_fractions(&fluid.mixture.mole_fractions);
            self.out_data
                .mixture
                .set_tc_mole_fractions(&fluid.mixture.tc_mole_fractions);
        }
    }

    /*
    Demand-only: copies the peer's supplied fluid state into the given
    object and returns true. Returns false (object untouched) when not in
    Demand, or when Supply data hasn't arrived from the peer yet, which
    happens briefly at run start and during role swaps.
     */
    pub fn get_fluid_state(&self, fluid: &mut FluidState) -> bool {
        if self.is_in_demand_role()
            && self.in_data.has_valid_data()
            && !self.in_data.header.demand_mode
        {
            fluid.pressure = self.in_data.source;
            fluid.mixture.energy = self.in_data.mixture.energy;
            self.in_data
                .mixture
                .get_mole_fractions(&mut fluid.mixture.mole_fractions);
            self.in_data
                .mixture
                .get_tc_mole_fractions(&mut fluid.mixture.tc_mole_fractions);
            return true;
        }
        false
    }

    /*
    Demand-only: publishes the flow state between the local model and the
    interface volume. Positive flow rates are flow from the Supply side into
    the Demand side. Pushes a warning and no-ops if called in Supply.
     */
    pub fn set_flow_state(&mut self, flow: &FlowState) {
        if !self.is_in_demand_role() {
            self.core.push_notification(
                NotificationLevel::Warn,
                "set_flow_state was called when in the Supply role.",
            );
        } else {
            self.out_data.source = flow.flow_rate;
            self.out_data.mixture.energy = flow.mixture.energy;
            self.out_data
                .mixture
                .set_mole_fractions(&flow.mixture.mole_fractions);
            self.out_data
                .mixture
                .set_tc_mole_fractions(&flow.mixture.tc_mole_fractions);
        }
    }

    /*
    Supply-only: copies the peer's demanded flow state into the given object
    and returns true. The local volume model should subtract the integral of
    this flow rate from its fluid contents. Returns false (object untouched)
    when not in Supply or when Demand data hasn't arrived from the peer.
     */
    pub fn get_flow_state(&self, flow: &mut FlowState) -> bool {
        if !self.is_in_demand_role()
            && self.in_data.has_valid_data()
            && self.in_data.header.demand_mode
        {
            flow.flow_rate = self.in_data.source;
            flow.mixture.energy = self.in_data.mixture.energy;
            self.in_data
                .mixture
                .get_mole_fractions(&mut flow.mixture.mole_fractions);
            self.in_data
                .mixture
                .get_tc_mole_fractions(&mut flow.mixture.tc_mole_fractions);
            return true;
        }
        false
    }

    pub fn is_in_demand_role(&self) -> bool {
        self.out_data.header.demand_mode
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
