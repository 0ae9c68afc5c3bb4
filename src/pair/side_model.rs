use dyn_clone::{clone_trait_object, DynClone};
use crate::interop::elect::ElectBus;
use crate::interop::fluid::FluidBus;

/// A local electrical model driven by the pair harness. The harness calls
/// step after the bus has processed its inputs; the implementation must
/// drive its voltage supply descriptors, apply the remote boundary, and
/// finish with a call to bus.update.
pub trait ElectSideModel: DynClone + Send + Sync {
    fn initialize(&mut self, bus: &mut ElectBus);
    fn step(&mut self, bus: &mut ElectBus);
    fn get_name(&self) -> &str;
    /// External drivers vary the local load between steps.
    fn set_load(&mut self, load: f32);
    /// External drivers vary the local regulator between steps.
    fn set_regulator(&mut self, available: bool, setpoint: f32);
}

clone_trait_object!(ElectSideModel);

/// A local fluid model driven by the pair harness. The harness calls step
/// after the bus has processed its inputs, then collects the model's
/// capacitance for the bus output pass.
pub trait FluidSideModel: DynClone + Send + Sync {
    fn initialize(&mut self, bus: &mut FluidBus);
    fn step(&mut self, bus: &mut FluidBus, timestep: f64);
    /// Local model capacitance at the interface (mol/Pa).
    fn capacitance(&self) -> f64;
    fn get_name(&self) -> &str;
    /// External drivers vary the interface capacitance between steps.
    fn set_capacitance(&mut self, capacitance: f64);
}

clone_trait_object!(FluidSideModel);
