use uuid::Uuid;
use super::route_notification;
use super::side_model::ElectSideModel;
use super::busbar_model::BusbarModel;
use crate::interop::base::{NotificationLevel, Role};
use crate::interop::elect::{ElectBus, ElectSnapshot};
use crate::io::pair_config_io::PairConfig;
use crate::numerical::lag_buffer::LagBuffer;
use crate::telemetry::Recorder;

/// One side of a coupled electrical interface: its bus, its local model,
/// and an id for log lines and telemetry.
#[derive(Clone)]
pub struct ElectSide {
    pub id: Uuid,
    pub name: String,
    pub bus: ElectBus,
    pub model: Box<dyn ElectSideModel>,
}

/// Recorded series indices for one electrical side.
#[derive(Clone, Copy, Default)]
struct ElectSideRecord {
    demand_mode: usize,
    supply_voltage: usize,
    demand_power: usize,
    loop_latency: usize,
}

/// Couples two electrical bus sides through a pair of frame-lag buffers and
/// drives the per-step interface call ordering: deliver incoming data,
/// process inputs, run the local models, drain notifications into the log,
/// transmit outgoing data.
#[derive(Clone)]
pub struct ElectPair {
    pub a: ElectSide,
    pub b: ElectSide,
    pub recorder: Recorder,
    pub frame: usize,
    lag_ab: LagBuffer<ElectSnapshot>,
    lag_ba: LagBuffer<ElectSnapshot>,
    rec_a: ElectSideRecord,
    rec_b: ElectSideRecord,
}

impl ElectPair {
    /*
    Builds and initializes a coupled pair. Side a is the primary side and
    bootstraps in Supply. lag_frames is the one-way transport delay in
    frames on top of the one frame each way the stepping itself imposes.
     */
    pub fn new(
        a_model: Box<dyn ElectSideModel>,
        b_model: Box<dyn ElectSideModel>,
        lag_frames: usize,
        initial_voltage: f32,
    ) -> ElectPair {
        let mut a = ElectSide {
            id: Uuid::new_v4(),
            name: a_model.get_name().to_string(),
            bus: ElectBus::new(),
            model: a_model,
        };
        let mut b = ElectSide {
            id: Uuid::new_v4(),
            name: b_model.get_name().to_string(),
            bus: ElectBus::new(),
            model: b_model,
        };

        a.bus.initialize(true, initial_voltage);
        b.bus.initialize(false, initial_voltage);
        a.model.initialize(&mut a.bus);
        b.model.initialize(&mut b.bus);

        let mut recorder = Recorder::new();
        let rec_a = Self::add_side_series(&mut recorder, &a.name);
        let rec_b = Self::add_side_series(&mut recorder, &b.name);

        ElectPair {
            a,
            b,
            recorder,
            frame: 0,
            lag_ab: LagBuffer::new(lag_frames),
            lag_ba: LagBuffer::new(lag_frames),
            rec_a,
            rec_b,
        }
    }

    /*
    Builds a pair of regulated busbars from a pair configuration. The side
    flagged master is the primary side. Forced roles are applied right after
    construction; they are runtime-mutable thereafter.
     */
    pub fn from_config(config: &PairConfig) -> ElectPair {
        if config.side_a.master == config.side_b.master {
            panic!("Error in pair config. Exactly one side must be the master/primary side.");
        }
        let (primary, secondary) = if config.side_a.master {
            (&config.side_a, &config.side_b)
        } else {
            (&config.side_b, &config.side_a)
        };

        let a_model = BusbarModel::new(&primary.name, primary.voltage, primary.load);
        let b_model = BusbarModel::new(&secondary.name, secondary.voltage, secondary.load);

        let mut pair = ElectPair::new(
            Box::new(a_model),
            Box::new(b_model),
            config.lag_frames,
            primary.voltage,
        );
        apply_forced_role(&mut pair.a.bus, primary.forced_role);
        apply_forced_role(&mut pair.b.bus, secondary.forced_role);
        pair
    }

    fn add_side_series(recorder: &mut Recorder, name: &str) -> ElectSideRecord {
        ElectSideRecord {
            demand_mode: recorder.get_or_add_series(&format!("{}.demand_mode", name)),
            supply_voltage: recorder.get_or_add_series(&format!("{}.supply_voltage", name)),
            demand_power: recorder.get_or_add_series(&format!("{}.demand_power", name)),
            loop_latency: recorder.get_or_add_series(&format!("{}.loop_latency", name)),
        }
    }

    /*
    One coupled frame for both sides.
     */
    pub fn step(&mut self) {
        //Transport delivery: each side's previous outgoing snapshot arrives
        //at the peer after the configured lag.
        let to_b = self.lag_ab.push(self.a.bus.out_data.clone());
        let to_a = self.lag_ba.push(self.b.bus.out_data.clone());
        self.a.bus.in_data = to_a;
        self.b.bus.in_data = to_b;

        self.a.bus.process_inputs();
        self.b.bus.process_inputs();

        self.a.model.step(&mut self.a.bus);
        self.b.model.step(&mut self.b.bus);

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

fn record_side(recorder: &mut Recorder, rec: &ElectSideRecord, bus: &ElectBus) {
    recorder.add_value_at_index(rec.demand_mode, bus.is_in_demand_role() as u8 as f64);
    recorder.add_value_at_index(rec.supply_voltage, bus.out_data.supply_voltage as f64);
    recorder.add_value_at_index(rec.demand_power, bus.out_data.demand_power as f64);
    recorder.add_value_at_index(rec.loop_latency, bus.core.loop_latency as f64);
}

fn drain_notifications(side: &mut ElectSide) {
    loop {
        let (notification, _remaining) = side.bus.pop_notification();
        if notification.level == NotificationLevel::None {
            break;
        }
        route_notification(&side.name, &side.id, &notification);
    }
}

fn apply_forced_role(bus: &mut ElectBus, role: Role) {
    match role {
        Role::Supply => bus.force_supply_role(),
        Role::Demand => bus.force_demand_role(),
        Role::None => {}
    }
}
