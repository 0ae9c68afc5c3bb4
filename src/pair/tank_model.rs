use super::side_model::FluidSideModel;
use crate::interop::fluid::{FlowState, FluidBus, FluidState};

/// A minimal local fluid model: a well-stirred gas volume characterized by
/// a fixed interface capacitance. In Demand it integrates toward the
/// supplied boundary pressure through a linear conductance, clamped by the
/// bus's stability limit; in Supply it publishes its own pressure and
/// integrates the peer's returned flow out of its contents. No real network
/// solving happens here.
#[derive(Default)]
#[derive(Clone)]
pub struct TankModel {
    pub name: String,
    pub cap: f64,         //Interface capacitance (mol/Pa)
    pub pressure: f64,    //Pa
    pub temperature: f64, //K
    pub moles: f64,
    pub conductance: f64, //Flow coefficient toward the boundary (mol/s/Pa)
    pub fractions: Vec<f64>,
    pub tc_fractions: Vec<f64>,
    pub last_flow: f64,     //Last interface molar flow applied (mol/s)
    pub limit_active: bool, //True when the last demand flow was clamped
}

impl TankModel {
    pub fn new(name: &str, cap: f64, pressure: f64, temperature: f64, n_bulk: usize, n_tc: usize) -> TankModel {
        let mut fractions = vec![0_f64; n_bulk];
        if n_bulk > 0 {
            fractions[0] = 1.0;
        }
        TankModel {
            name: name.to_string(),
            cap,
            pressure,
            temperature,
            moles: cap * pressure,
            conductance: cap / 100.0,
            fractions,
            tc_fractions: vec![0_f64; n_tc],
            ..Default::default()
        }
    }

    fn fluid_state(&self) -> FluidState {
        let mut fluid = FluidState::new(self.fractions.len(), self.tc_fractions.len());
        fluid.pressure = self.pressure;
        fluid.mixture.energy = self.temperature;
        fluid.mixture.set_mole_fractions(&self.fractions);
        fluid.mixture.set_tc_mole_fractions(&self.tc_fractions);
        fluid
    }
}

impl FluidSideModel for TankModel {
    fn initialize(&mut self, bus: &mut FluidBus) {
        self.moles = self.cap * self.pressure;
        self.last_flow = 0.0;
        self.limit_active = false;

        //Both sides boot in Supply, so publish our starting state and
        //capacitance for the peer's first valid frame.
        let fluid = self.fluid_state();
        bus.set_fluid_state(&fluid);
        bus.out_data.capacitance = self.cap;
    }

    fn step(&mut self, bus: &mut FluidBus, timestep: f64) {
        self.limit_active = false;

        if bus.is_in_demand_role() {
            let mut boundary = FluidState::new(self.fractions.len(), self.tc_fractions.len());
            if bus.get_fluid_state(&mut boundary) {
                //Flow toward equalizing with the supplied boundary
                //pressure, clamped to the interface stability limit.
                let mut ndot = self.conductance * (boundary.pressure - self.pressure);
                let limit = bus.compute_demand_limit(timestep, self.pressure);
                if limit > 0.0 && ndot.abs() > limit {
                    ndot = limit * ndot.signum();
                    self.limit_active = true;
                }

                self.moles += ndot * timestep;
                self.pressure = self.moles / self.cap;
                self.last_flow = ndot;

                let mut flow = FlowState::new(self.fractions.len(), self.tc_fractions.len());
                flow.flow_rate = ndot;
                flow.mixture.energy = self.temperature;
                flow.mixture.set_mole_fractions(&self.fractions);
                flow.mixture.set_tc_mole_fractions(&self.tc_fractions);
                bus.set_flow_state(&flow);
            }
        } else {
            let mut flow = FlowState::new(self.fractions.len(), self.tc_fractions.len());
            if bus.get_flow_state(&mut flow) {
                //Positive demanded flow leaves the Supply side.
                self.moles -= flow.flow_rate * timestep;
                if self.moles < 0.0 {
                    self.moles = 0.0;
                }
                self.pressure = self.moles / self.cap;
                self.last_flow = flow.flow_rate;
            }

            let fluid = self.fluid_state();
            bus.set_fluid_state(&fluid);
        }
    }

    fn capacitance(&self) -> f64 {
        self.cap
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn set_capacitance(&mut self, capacitance: f64) {
        self.cap = capacitance;
    }
}
