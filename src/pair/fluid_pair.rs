use uuid::Uuid;
use super::route_notification;
use super::side_model::FluidSideModel;
use super::tank_model::TankModel;
use crate::interop::base::{NotificationLevel, Role};
use crate::interop::fluid::{FluidBus, FluidSnapshot};
use crate::io::pair_config_io::PairConfig;
use crate::numerical::lag_buffer::LagBuffer;
use crate::telemetry::Recorder;

const FLUX_EPSILON: f64 = f64::EPSILON;

/// One side of a coupled fluid interface: its bus, its local model, and an
/// id for log lines and telemetry.
#[derive(Clone)]
pub struct FluidSide {
    pub id: Uuid,
    pub name: String,
    pub bus: FluidBus,
    pub model: Box<dyn FluidSideModel>,
}

/// Recorded series indices for one fluid side.
#[derive(Clone, Copy, Default)]
struct FluidSideRecord {
    demand_mode: usize,
    source: usize,
    capacitance: usize,
    loop_latency: usize,
    demand_limit_gain: usize,
    demand_limit_flow_rate: usize,
}

/// Couples two fluid bus sides through a pair of frame-lag buffers and
/// drives the per-step interface call ordering: deliver incoming data,
/// process inputs, run the local models (which clamp to the demand limit),
/// process outputs with the latest capacitances, drain notifications into
/// the log, transmit outgoing data.
#[derive(Clone)]
pub struct FluidPair {
    pub a: FluidSide,
    pub b: FluidSide,
    pub timestep: f64, //s
    pub recorder: Recorder,
    pub frame: usize,
    /// Set when both sides demanded inflow on the same frame, which would
    /// create mass out of nothing. The exchanged flow is zeroed when this
    /// happens; the flag stays up for inspection.
    pub mass_creation_detected: bool,
    lag_ab: LagBuffer<FluidSnapshot>,
    lag_ba: LagBuffer<FluidSnapshot>,
    rec_a: FluidSideRecord,
    rec_b: FluidSideRecord,
}

impl FluidPair {
    /*
    Builds and initializes a coupled pair. Side a is the pair master for
    tie-breaking. Both buses are sized with the same mixture counts here;
    sides with different species counts can still be coupled by hand using
    the buses directly.
     */
    pub fn new(
        a_model: Box<dyn FluidSideModel>,
        b_model: Box<dyn FluidSideModel>,
        lag_frames: usize,
        timestep: f64,
        n_bulk: usize,
        n_tc: usize,
    ) -> FluidPair {
        let mut a = FluidSide {
            id: Uuid::new_v4(),
            name: a_model.get_name().to_string(),
            bus: FluidBus::new(),
            model: a_model,
        };
        let mut b = FluidSide {
            id: Uuid::new_v4(),
            name: b_model.get_name().to_string(),
            bus: FluidBus::new(),
            model: b_model,
        };

        a.bus.initialize(true, n_bulk, n_tc);
        b.bus.initialize(false, n_bulk, n_tc);
        a.model.initialize(&mut a.bus);
        b.model.initialize(&mut b.bus);

        let mut recorder = Recorder::new();
        let rec_a = Self::add_side_series(&mut recorder, &a.name);
        let rec_b = Self::add_side_series(&mut recorder, &b.name);

        FluidPair {
            a,
            b,
            timestep,
            recorder,
            frame: 0,
            mass_creation_detected: false,
            lag_ab: LagBuffer::new(lag_frames),
            lag_ba: LagBuffer::new(lag_frames),
            rec_a,
            rec_b,
        }
    }

    /*
    Builds a pair of gas tanks from a pair configuration. The side flagged
    master becomes side a. Forced roles are applied right after
    construction; they are runtime-mutable thereafter.
     */
    pub fn from_config(config: &PairConfig) -> FluidPair {
        if config.side_a.master == config.side_b.master {
            panic!("Error in pair config. Exactly one side must be the master side.");
        }
        let (master, other) = if config.side_a.master {
            (&config.side_a, &config.side_b)
        } else {
            (&config.side_b, &config.side_a)
        };

        let a_model = TankModel::new(
            &master.name,
            master.capacitance,
            master.pressure,
            master.temperature,
            config.n_bulk,
            config.n_tc,
        );
        let b_model = TankModel::new(
            &other.name,
            other.capacitance,
            other.pressure,
            other.temperature,
            config.n_bulk,
            config.n_tc,
        );

        let mut pair = FluidPair::new(
            Box::new(a_model),
            Box::new(b_model),
            config.lag_frames,
            config.timestep,
            config.n_bulk,
            config.n_tc,
        );
        apply_forced_role(&mut pair.a.bus, master.forced_role);
        apply_forced_role(&mut pair.b.bus, other.forced_role);
        pair
    }

    fn add_side_series(recorder: &mut Recorder, name: &str) -> FluidSideRecord {
        FluidSideRecord {
            demand_mode: recorder.get_or_add_series(&format!("{}.demand_mode", name)),
            source: recorder.get_or_add_series(&format!("{}.source", name)),
            capacitance: recorder.get_or_add_series(&format!("{}.capacitance", name)),
            loop_latency: recorder.get_or_add_series(&format!("{}.loop_latency", name)),
            demand_limit_gain: recorder.get_or_add_series(&format!("{}.demand_limit_gain", name)),
            demand_limit_flow_rate: recorder
                .get_or_add_series(&format!("{}.demand_limit_flow_rate", name)),
        }
    }

    /*
    One coupled frame for both sides.
     */
    pub fn step(&mut self) {
        //Transport delivery: each side's previous outgoing snapshot arrives
        //at the peer after the configured lag.
        let mut to_b = self.lag_ab.push(self.a.bus.out_data.clone());
        let mut to_a = self.lag_ba.push(self.b.bus.out_data.clone());

        //Both sides demanding inflow at once implies the pair is creating
        //mass out of nothing, which can happen briefly during a role swap.
        //Relaxed handling: zero the exchanged flow and raise the flag.
        if to_a.header.demand_mode
            && to_b.header.demand_mode
            && to_a.source > FLUX_EPSILON
            && to_b.source > FLUX_EPSILON
        {
            self.mass_creation_detected = true;
            to_a.source = 0.0;
            to_b.source = 0.0;
        }

        //Assignment into in_data keeps each receiver's own mixture sizing.
        self.a.bus.in_data.assign_from(&to_a);
        self.b.bus.in_data.assign_from(&to_b);

        self.a.bus.process_inputs();
        self.b.bus.process_inputs();

        self.a.model.step(&mut self.a.bus, self.timestep);
        self.b.model.step(&mut self.b.bus, self.timestep);

        let cap_a = self.a.model.capacitance();
        self.a.bus.process_outputs(cap_a);
        let cap_b = self.b.model.capacitance();
        self.b.bus.process_outputs(cap_b);

        drain_notifications(&mut self.a);
        drain_notifications(&mut self.b);

        self.record_frame();
        self.frame += 1;
    }

    pub fn run(&mut self, n_steps: usize) {
        for _ in 0..n_steps {
            self.step();
        }
    }

    fn record_frame(&mut self) {
        record_side(&mut self.recorder, &self.rec_a, &self.a.bus);
        record_side(&mut self.recorder, &self.rec_b, &self.b.bus);
    }

    /*
    True when exactly one side is in the Demand role.
     */
    pub fn roles_settled(&self) -> bool {
        self.a.bus.is_in_demand_role() != self.b.bus.is_in_demand_role()
    }
}

fn record_side(recorder: &mut Recorder, rec: &FluidSideRecord, bus: &FluidBus) {
    recorder.add_value_at_index(rec.demand_mode, bus.is_in_demand_role() as u8 as f64);
    recorder.add_value_at_index(rec.source, bus.out_data.source);
    recorder.add_value_at_index(rec.capacitance, bus.out_data.capacitance);
    recorder.add_value_at_index(rec.loop_latency, bus.core.loop_latency as f64);
    recorder.add_value_at_index(rec.demand_limit_gain, bus.demand_limit_gain);
    recorder.add_value_at_index(rec.demand_limit_flow_rate, bus.demand_limit_flow_rate);
}

fn drain_notifications(side: &mut FluidSide) {
    loop {
        let (notification, _remaining) = side.bus.pop_notification();
        if notification.level == NotificationLevel::None {
            break;
        }
        route_notification(&side.name, &side.id, &notification);
    }
}

fn apply_forced_role(bus: &mut FluidBus, role: Role) {
    match role {
        Role::Supply => bus.force_supply_role(),
        Role::Demand => bus.force_demand_role(),
        Role::None => {}
    }
}
