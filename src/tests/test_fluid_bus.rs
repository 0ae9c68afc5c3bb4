use crate::interop::base::NotificationLevel;
use crate::interop::fluid::{
    FluidBus, FluidState, FlowState, DEMAND_FILTER_CONST_A, DEMAND_FILTER_CONST_B,
    MODING_CAPACITANCE_RATIO,
};

/*
Drives the incoming record to a valid peer snapshot in the given mode.
 */
fn set_valid_in_data(bus: &mut FluidBus, peer_in_demand: bool, capacitance: f64) {
    bus.in_data.header.frame_count = 2;
    bus.in_data.header.demand_mode = peer_in_demand;
    bus.in_data.capacitance = capacitance;
    bus.in_data.source = if peer_in_demand { 0.001 } else { 101325.0 };
    bus.in_data.mixture.energy = 294.261;
}

fn supply_state(pressure: f64) -> FluidState {
    let mut fluid = FluidState::new(4, 2);
    fluid.pressure = pressure;
    fluid.mixture.energy = 294.261;
    fluid.mixture.set_mole_fractions(&[0.79, 0.21, 0.0, 0.0]);
    fluid
}

#[test]
fn test_initialization() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    assert!(bus.core.is_pair_master);
    assert_eq!(bus.in_data.mixture.num_bulk(), 4);
    assert_eq!(bus.in_data.mixture.num_tc(), 2);
    assert_eq!(bus.out_data.mixture.num_bulk(), 4);
    assert_eq!(bus.out_data.mixture.num_tc(), 2);
    assert_eq!(bus.is_in_demand_role(), false);
    assert_eq!(bus.demand_limit_gain, 0.0);
    assert_eq!(bus.demand_limit_flow_rate, 0.0);
}

/// Initializing twice is equivalent to initializing once.
#[test]
fn test_initialization_is_repeatable() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    bus.out_data.mixture.set_mole_fractions(&[0.5, 0.5, 0.0, 0.0]);
    bus.core.frames_since_flip = 9;

    bus.initialize(true, 4, 2);
    assert_eq!(bus.out_data.mixture.num_bulk(), 4);
    assert!(bus.out_data.mixture.mole_fractions.iter().all(|f| *f == 0.0));
    assert_eq!(bus.core.frames_since_flip, 0);
}

#[test]
fn test_snapshot_validity() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    assert!(!bus.in_data.has_valid_data());

    set_valid_in_data(&mut bus, false, 1.0);
    assert!(bus.in_data.has_valid_data());

    bus.in_data.mixture.energy = 0.0;
    assert!(!bus.in_data.has_valid_data());

    set_valid_in_data(&mut bus, false, -1.0);
    assert!(!bus.in_data.has_valid_data());

    //A negative source is a bad pressure from a Supply peer, but a fine
    //return flow from a Demand peer
    set_valid_in_data(&mut bus, false, 1.0);
    bus.in_data.source = -1.0;
    assert!(!bus.in_data.has_valid_data());
    bus.in_data.header.demand_mode = true;
    assert!(bus.in_data.has_valid_data());

    set_valid_in_data(&mut bus, false, 1.0);
    bus.in_data.mixture.mole_fractions[1] = -0.1;
    assert!(!bus.in_data.has_valid_data());
}

/// Run start: both sides Supply, the smaller capacitance takes Demand.
#[test]
fn test_bootstrap_flip_on_capacitance() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    bus.out_data.capacitance = 1.0;
    set_valid_in_data(&mut bus, false, 2.0);

    bus.process_inputs();
    assert_eq!(bus.is_in_demand_role(), true);
    let (notification, _) = bus.pop_notification();
    assert_eq!(notification.level, NotificationLevel::Info);
    assert_eq!(notification.message, "switched to Demand mode.");

    //The larger side stays in Supply
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    bus.out_data.capacitance = 2.0;
    set_valid_in_data(&mut bus, false, 1.0);

    bus.process_inputs();
    assert_eq!(bus.is_in_demand_role(), false);
}

/// An exact capacitance tie is broken by the pair master taking Demand.
#[test]
fn test_bootstrap_tie_break() {
    let mut master = FluidBus::new();
    master.initialize(true, 4, 2);
    master.out_data.capacitance = 1.0;
    set_valid_in_data(&mut master, false, 1.0);
    master.process_inputs();
    assert_eq!(master.is_in_demand_role(), true);

    let mut other = FluidBus::new();
    other.initialize(false, 4, 2);
    other.out_data.capacitance = 1.0;
    set_valid_in_data(&mut other, false, 1.0);
    other.process_inputs();
    assert_eq!(other.is_in_demand_role(), false);
}

/// Demand flips to Supply when the peer is seen newly taking Demand.
#[test]
fn test_demand_to_supply_on_peer_transition() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    bus.out_data.header.demand_mode = true;
    set_valid_in_data(&mut bus, true, 2.0);
    assert_eq!(bus.core.in_data_last_demand_mode, false);

    bus.process_inputs();
    assert_eq!(bus.is_in_demand_role(), false);
    assert_eq!(bus.core.in_data_last_demand_mode, true);

    //No flip when the peer was already in Demand on the previous pass
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    bus.out_data.header.demand_mode = true;
    bus.core.in_data_last_demand_mode = true;
    set_valid_in_data(&mut bus, true, 2.0);

    bus.process_inputs();
    assert_eq!(bus.is_in_demand_role(), true);
}

/// Force-Demand followed by a step ends in Demand; force-Supply in Supply.
#[test]
fn test_forced_roles() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    set_valid_in_data(&mut bus, false, 100.0);
    bus.out_data.capacitance = 1.0;
    bus.force_supply_role();
    bus.process_inputs();
    assert_eq!(bus.is_in_demand_role(), false);

    bus.force_demand_role();
    bus.process_inputs();
    assert_eq!(bus.is_in_demand_role(), true);
}

/// The literal demand limit scenario: equal capacitances, 4 frames of lag.
#[test]
fn test_demand_limit_filter_values() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    bus.out_data.header.demand_mode = true;
    set_valid_in_data(&mut bus, false, 1.0e-6);
    bus.in_data.source = 101000.0;
    bus.out_data.capacitance = 1.0e-6;
    bus.core.loop_latency = 4;

    let limit = bus.compute_demand_limit(0.1, 101325.0);

    let expected_gain = DEMAND_FILTER_CONST_A * DEMAND_FILTER_CONST_B.powi(4);
    assert!((expected_gain - 0.474609375).abs() < 1.0e-12);
    assert!((bus.demand_limit_gain - expected_gain).abs() < 1.0e-12);

    let expected_limit = expected_gain * (101325.0_f64 - 101000.0).abs()
        / (0.1 * (1.0 / 1.0e-6 + 1.0 / 1.0e-6));
    assert!((limit - expected_limit).abs() < 1.0e-12);
    assert_eq!(limit, bus.demand_limit_flow_rate);
    assert!(limit > 0.0);
}

/// The lag gain exponent is clamped to [1, 100].
#[test]
fn test_demand_limit_latency_clamp() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    bus.out_data.header.demand_mode = true;
    set_valid_in_data(&mut bus, false, 1.0e-6);
    bus.out_data.capacitance = 1.0e-6;

    //Latency below 1 clamps to an exponent of 1: lag gain = min(1, 1.125)
    bus.core.loop_latency = -5;
    bus.compute_demand_limit(0.1, 101325.0);
    assert_eq!(bus.demand_limit_gain, 1.0);

    //Huge latency clamps to an exponent of 100
    bus.core.loop_latency = 100000;
    bus.compute_demand_limit(0.1, 101325.0);
    assert!(bus.demand_limit_gain > 0.0);
    assert!(bus.demand_limit_gain < 1.0e-10);
}

/// The capacitance ratio term is clamped at the moding ratio, where the
/// gain recovers all the way to one.
#[test]
fn test_demand_limit_capacitance_ratio_clamp() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    bus.out_data.header.demand_mode = true;
    set_valid_in_data(&mut bus, false, 10.0e-6);
    bus.out_data.capacitance = 1.0e-6;
    bus.core.loop_latency = 4;

    bus.compute_demand_limit(0.1, 101325.0);
    //cs/cd = 10 clamps to 1.25: gain = lag + (1 - lag) * 0.25 * 4 = 1
    assert!((bus.demand_limit_gain - 1.0).abs() < 1.0e-12);
    assert!(MODING_CAPACITANCE_RATIO == 1.25);
}

/// The demand limit degrades to zero whenever it cannot be computed.
#[test]
fn test_demand_limit_zero_cases() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);

    //Not in the Demand role
    set_valid_in_data(&mut bus, false, 1.0e-6);
    bus.out_data.capacitance = 1.0e-6;
    assert_eq!(bus.compute_demand_limit(0.1, 101325.0), 0.0);
    assert_eq!(bus.demand_limit_gain, 0.0);

    //Peer also in Demand
    bus.out_data.header.demand_mode = true;
    set_valid_in_data(&mut bus, true, 1.0e-6);
    assert_eq!(bus.compute_demand_limit(0.1, 101325.0), 0.0);

    //Missing or invalid peer data
    set_valid_in_data(&mut bus, false, 1.0e-6);
    bus.in_data.mixture.energy = 0.0;
    assert_eq!(bus.compute_demand_limit(0.1, 101325.0), 0.0);

    //Degenerate timestep or capacitances
    set_valid_in_data(&mut bus, false, 1.0e-6);
    assert_eq!(bus.compute_demand_limit(0.0, 101325.0), 0.0);
    bus.out_data.capacitance = 0.0;
    assert_eq!(bus.compute_demand_limit(0.1, 101325.0), 0.0);
    bus.out_data.capacitance = 1.0e-6;
    bus.in_data.capacitance = 0.0;
    assert_eq!(bus.compute_demand_limit(0.1, 101325.0), 0.0);
}

/// Runtime role swap: Supply hands off to Demand when the peer's
/// capacitance exceeds ours by the hysteresis ratio, and the outgoing
/// source is zeroed so the peer doesn't read a stale pressure as a flow.
#[test]
fn test_runtime_swap_zeroes_source() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    bus.set_fluid_state(&supply_state(101325.0));
    assert_eq!(bus.out_data.source, 101325.0);

    set_valid_in_data(&mut bus, false, 2.0);
    bus.core.frames_since_flip = 10;
    bus.core.loop_latency = 3;

    bus.process_outputs(1.0);
    assert_eq!(bus.is_in_demand_role(), true);
    assert_eq!(bus.out_data.source, 0.0);
    assert_eq!(bus.out_data.capacitance, 1.0);
    assert_eq!(bus.core.frames_since_flip, 0);
}

/// Exactly at the hysteresis ratio there is no flip (strict less-than).
#[test]
fn test_no_swap_at_exact_hysteresis_ratio() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    bus.set_fluid_state(&supply_state(101325.0));
    set_valid_in_data(&mut bus, false, 1.25);
    bus.core.frames_since_flip = 10;
    bus.core.loop_latency = 3;

    bus.process_outputs(1.0);
    assert_eq!(bus.is_in_demand_role(), false);
    assert_eq!(bus.out_data.source, 101325.0);
}

/// The capacitance flip waits out a full lag cycle since the last flip.
#[test]
fn test_swap_gated_on_frames_since_flip() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    set_valid_in_data(&mut bus, false, 2.0);
    bus.core.frames_since_flip = 3;
    bus.core.loop_latency = 3;

    bus.process_outputs(1.0);
    assert_eq!(bus.is_in_demand_role(), false);
}

/// A forced Supply role suppresses the capacitance flip and leaves the
/// published pressure alone.
#[test]
fn test_swap_suppressed_by_forced_supply() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    bus.set_fluid_state(&supply_state(101325.0));
    set_valid_in_data(&mut bus, false, 10.0);
    bus.core.frames_since_flip = 10;
    bus.core.loop_latency = 3;
    bus.force_supply_role();

    bus.process_outputs(1.0);
    assert_eq!(bus.is_in_demand_role(), false);
    assert_eq!(bus.out_data.source, 101325.0);
}

/// Role-inappropriate state setters warn and leave the outputs alone.
#[test]
fn test_state_setters_check_role() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);

    //set_flow_state in Supply: warn, no-op
    let mut flow = FlowState::new(4, 2);
    flow.flow_rate = 0.5;
    bus.out_data.source = 7.0;
    bus.set_flow_state(&flow);
    assert_eq!(bus.out_data.source, 7.0);
    let (notification, _) = bus.pop_notification();
    assert_eq!(notification.level, NotificationLevel::Warn);
    assert_eq!(notification.message, "set_flow_state was called when in the Supply role.");

    //set_fluid_state in Demand: warn, no-op
    bus.out_data.header.demand_mode = true;
    bus.set_fluid_state(&supply_state(101325.0));
    assert_eq!(bus.out_data.source, 7.0);
    let (notification, _) = bus.pop_notification();
    assert_eq!(notification.level, NotificationLevel::Warn);
    assert_eq!(notification.message, "set_fluid_state was called when in the Demand role.");
}

#[test]
fn test_set_fluid_state_publishes() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    bus.set_fluid_state(&supply_state(101325.0));
    assert_eq!(bus.out_data.source, 101325.0);
    assert_eq!(bus.out_data.mixture.energy, 294.261);
    assert_eq!(bus.out_data.mixture.mole_fractions[0], 0.79);
    assert_eq!(bus.out_data.mixture.mole_fractions[1], 0.21);
}

#[test]
fn test_set_flow_state_publishes() {
    let mut bus = FluidBus::new();
    bus.initialize(true, 4, 2);
    bus.out_data.header.demand_mode = true;

    let mut flow = FlowState::new(4, 2);
    flow.flow_rate = -0.002;
    flow.mixture.energy = 295.0;
    flow.mixture.set_mole_fractions(&[1.0, 0.0, 0.0, 0.0]);
    bus.set_flow_state(&flow);
    assert_eq!(bus.out_data.source, -0.002);
    assert_eq!(bus.out_data.mixture.energy, 295.0);
}

/// getFluidState only delivers in Demand with valid Supply data from the
/// peer, and zero-fills when the local state is sized larger.
#[test]
fn test_get_fluid_state() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    let mut fluid = FluidState::new(6, 2);

    //Not in Demand: no update
    assert!(!bus.get_fluid_state(&mut fluid));

    bus.out_data.header.demand_mode = true;
    //No valid peer data yet: no update
    assert!(!bus.get_fluid_state(&mut fluid));

    set_valid_in_data(&mut bus, false, 2.0);
    bus.in_data.mixture.set_mole_fractions(&[0.79, 0.21, 0.0, 0.0]);
    assert!(bus.get_fluid_state(&mut fluid));
    assert_eq!(fluid.pressure, 101325.0);
    assert_eq!(fluid.mixture.energy, 294.261);
    assert_eq!(fluid.mixture.mole_fractions, vec![0.79, 0.21, 0.0, 0.0, 0.0, 0.0]);

    //Peer in Demand is not Supply data: no update
    bus.in_data.header.demand_mode = true;
    assert!(!bus.get_fluid_state(&mut fluid));
}

#[test]
fn test_get_flow_state() {
    let mut bus = FluidBus::new();
    bus.initialize(false, 4, 2);
    let mut flow = FlowState::new(4, 2);

    //No valid Demand data from the peer yet
    assert!(!bus.get_flow_state(&mut flow));

    set_valid_in_data(&mut bus, true, 1.0);
    bus.in_data.source = 0.0025;
    assert!(bus.get_flow_state(&mut flow));
    assert_eq!(flow.flow_rate, 0.0025);

    //Not available in the Demand role
    bus.out_data.header.demand_mode = true;
    assert!(!bus.get_flow_state(&mut flow));
}

/// Snapshots of differently sized interfaces assign safely in both
/// directions.
#[test]
fn test_snapshot_assignment_across_sizes() {
    let mut big = FluidBus::new();
    big.initialize(true, 4, 2);
    big.out_data.capacitance = 3.0;
    big.out_data.source = 101325.0;
    big.out_data.mixture.energy = 294.261;
    big.out_data.mixture.set_mole_fractions(&[0.7, 0.2, 0.08, 0.02]);
    big.out_data.header.frame_count = 5;

    let mut small = FluidBus::new();
    small.initialize(false, 2, 1);
    small.in_data.assign_from(&big.out_data);
    assert_eq!(small.in_data.header.frame_count, 5);
    assert_eq!(small.in_data.capacitance, 3.0);
    assert_eq!(small.in_data.source, 101325.0);
    assert_eq!(small.in_data.mixture.num_bulk(), 2);
    assert_eq!(small.in_data.mixture.mole_fractions, vec![0.7, 0.2]);
}
