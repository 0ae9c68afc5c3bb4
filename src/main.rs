use chrono::Utc;
use rand::Rng;

use twinbus::io::csv_io::write_recorder;
use twinbus::io::pair_config_io::{read_pair_config, PairConfig};
use twinbus::pair::{ElectPair, FluidPair};

/*
Demo pair runner. Couples two interface sides in one process through the
frame-lag buffers and steps them with a little random jitter on the local
models, so the role arbitration and the demand stability filter can be
watched in the logs and telemetry.

Usage: twinbus [pair_config.ini] [telemetry_out.csv]
 */
fn main() {
    env_logger::init();

    println!("twinbus {} pair runner", env!("TWINBUS_VERSION"));
    println!("Started: {}", Utc::now().to_rfc3339());

    let args: Vec<String> = std::env::args().collect();
    let config = if args.len() > 1 {
        read_pair_config(&args[1]).expect("Error reading pair config")
    } else {
        PairConfig::default()
    };
    let csv_out = args.get(2).cloned();

    match config.kind.as_str() {
        "elect" => run_elect_pair(&config, csv_out),
        _ => run_fluid_pair(&config, csv_out),
    }

    println!("Done!")
}

fn run_elect_pair(config: &PairConfig, csv_out: Option<String>) {
    let mut pair = ElectPair::from_config(config);
    let mut rng = rand::thread_rng();
    let nominal_load_a = config.side_a.load;
    let nominal_load_b = config.side_b.load;

    for _ in 0..config.steps {
        //Jitter the local loads around their nominal values.
        pair.a.model.set_load(nominal_load_a * rng.gen_range(0.8..1.2));
        pair.b.model.set_load(nominal_load_b * rng.gen_range(0.8..1.2));
        pair.step();
    }

    println!("Electrical pair after {} frames:", pair.frame);
    print_side_summary(&pair.a.name, pair.a.bus.is_in_demand_role(), pair.a.bus.core.loop_latency);
    print_side_summary(&pair.b.name, pair.b.bus.is_in_demand_role(), pair.b.bus.core.loop_latency);
    println!("Roles settled: {}", pair.roles_settled());
    print_flip_counts(&pair.recorder);

    if let Some(path) = csv_out {
        write_recorder(&path, &pair.recorder).expect("Error writing telemetry");
        println!("Telemetry written to {}", path);
    }
}

fn run_fluid_pair(config: &PairConfig, csv_out: Option<String>) {
    let mut pair = FluidPair::from_config(config);
    let mut rng = rand::thread_rng();
    let nominal_cap_b = pair.b.model.capacitance();

    for _ in 0..config.steps {
        //Jitter the non-master capacitance so the hysteresis margin gets a
        //workout without causing role thrash.
        pair.b.model.set_capacitance(nominal_cap_b * rng.gen_range(0.98..1.02));
        pair.step();
    }

    println!("Fluid pair after {} frames:", pair.frame);
    print_side_summary(&pair.a.name, pair.a.bus.is_in_demand_role(), pair.a.bus.core.loop_latency);
    print_side_summary(&pair.b.name, pair.b.bus.is_in_demand_role(), pair.b.bus.core.loop_latency);
    println!("Roles settled: {}", pair.roles_settled());
    println!("Mass creation detected: {}", pair.mass_creation_detected);
    print_flip_counts(&pair.recorder);

    if let Some(path) = csv_out {
        write_recorder(&path, &pair.recorder).expect("Error writing telemetry");
        println!("Telemetry written to {}", path);
    }
}

fn print_side_summary(name: &str, demand_mode: bool, loop_latency: i32) {
    let role = if demand_mode { "Demand" } else { "Supply" };
    println!("  {}: role = {}, loop latency = {} frames", name, role, loop_latency);
}

fn print_flip_counts(recorder: &twinbus::telemetry::Recorder) {
    for series in recorder.series.iter() {
        if series.name.ends_with(".demand_mode") {
            println!("  {} changed role {} times", series.name, series.count_changes());
        }
    }
}
