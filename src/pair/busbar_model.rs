use super::side_model::ElectSideModel;
use crate::interop::elect::ElectBus;

/// A minimal local electrical model: one regulated busbar with a single
/// voltage regulator and a lumped power load. Exists to exercise the
/// interface contract from both roles; it does no real network solving.
#[derive(Default)]
#[derive(Clone)]
pub struct BusbarModel {
    pub name: String,
    pub setpoint: f32,     //Regulated voltage (V)
    pub regulator_on: bool,
    pub load: f32,         //Local power demand (W)
    pub bus_voltage: f32,  //Voltage at the interface location (V)
    supply_idx: usize,
}

impl BusbarModel {
    pub fn new(name: &str, setpoint: f32, load: f32) -> BusbarModel {
        BusbarModel {
            name: name.to_string(),
            setpoint,
            regulator_on: true,
            load,
            bus_voltage: setpoint,
            ..Default::default()
        }
    }
}

impl ElectSideModel for BusbarModel {
    fn initialize(&mut self, bus: &mut ElectBus) {
        self.supply_idx = bus.add_voltage_supply();
        let supply = bus.voltage_supply_mut(self.supply_idx);
        supply.available = self.regulator_on;
        supply.maximum_voltage = self.setpoint;
        self.bus_voltage = self.setpoint;
    }

    fn step(&mut self, bus: &mut ElectBus) {
        //Drive the supply descriptor from the current regulator state.
        let supply = bus.voltage_supply_mut(self.supply_idx);
        supply.available = self.regulator_on;
        supply.maximum_voltage = self.setpoint;

        //Trivial solve. In Demand we ride the remote boundary voltage. In
        //Supply we hold our regulated setpoint and carry the remote load;
        //with the regulator off we fall back on the remote potential.
        if bus.is_in_demand_role() {
            self.bus_voltage = bus.get_remote_supply();
        } else if self.regulator_on {
            self.bus_voltage = self.setpoint;
            let _total_load = self.load + bus.get_remote_load();
        } else {
            self.bus_voltage = bus.get_remote_supply();
        }

        bus.update(self.bus_voltage, self.load);
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn set_load(&mut self, load: f32) {
        self.load = load;
    }

    fn set_regulator(&mut self, available: bool, setpoint: f32) {
        self.regulator_on = available;
        self.setpoint = setpoint;
    }
}
