//! Headless fleet-simulation harness.
//!
//! Validates the demo blueprint and the simulation behavior end to end —
//! no rendering, no persistence, everything in-process.
//!
//! Usage:
//!   cargo run -p modufleet-simtest
//!   cargo run -p modufleet-simtest -- --verbose

use modufleet_core::geometry::Coord;
use modufleet_core::module::{Module, ModuleArena, ModuleType};
use modufleet_core::risk::{ExponentialFailure, RiskModel};
use modufleet_core::robot::{PerformanceAttribute, Robot, RobotType};
use modufleet_core::task::Task;
use modufleet_core::{SimError, WorldSpec};

use std::collections::BTreeMap;

// ── Demo fleet blueprint (same JSON ships with the crate) ───────────────
const FLEET_JSON: &str = include_str!("../../../data/demo_fleet.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    env_logger::init();
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== ModuFleet Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Blueprint parsing and validation
    results.extend(validate_blueprint(verbose));

    // 2. Geometry primitives
    results.extend(validate_geometry(verbose));

    // 3. Battery draw/charge loop
    results.extend(validate_power_loop(verbose));

    // 4. Failure model
    results.extend(validate_failure_model(verbose));

    // 5. Transport arithmetic
    results.extend(validate_transport(verbose));

    // 6. Full demo run, twice, for determinism
    results.extend(validate_demo_run(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Blueprint ────────────────────────────────────────────────────────

fn validate_blueprint(verbose: bool) -> Vec<TestResult> {
    println!("--- Blueprint ---");
    let mut results = Vec::new();

    let spec: WorldSpec = match serde_json::from_str(FLEET_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(check(
                "blueprint_parse",
                false,
                format!("JSON parse error: {}", e),
            ));
            return results;
        }
    };
    results.push(check("blueprint_parse", true, "demo fleet JSON parsed"));

    let built = match spec.build() {
        Ok(b) => b,
        Err(e) => {
            results.push(check("blueprint_build", false, format!("{}", e)));
            return results;
        }
    };
    let world = &built.world;

    results.push(check(
        "blueprint_counts",
        world.modules.len() == 4 && world.robots.len() == 2 && world.map.len() == 1,
        format!(
            "{} modules, {} robots, {} stations",
            world.modules.len(),
            world.robots.len(),
            world.map.len()
        ),
    ));

    // r2 is built with its drive out of position, so an assembly task is
    // generated for it
    let assemble = world.task_id("assemble_r2");
    results.push(check(
        "blueprint_assembly_generated",
        assemble.is_some_and(|id| world.tasks.get(id).total_workload() == 1.0),
        "assemble_r2 generated with workload 1",
    ));

    // every robot's priority list covers every work task
    let full_cover = built
        .priorities
        .values()
        .all(|list| list.len() == world.work.len());
    results.push(check(
        "blueprint_priorities_cover_work",
        full_cover,
        format!("{} work tasks in every priority list", world.work.len()),
    ));

    // duplicate names are rejected
    let mut broken = spec.clone();
    broken.modules.push(broken.modules[0].clone());
    results.push(check(
        "blueprint_rejects_duplicates",
        matches!(broken.build(), Err(SimError::Validation(_))),
        "duplicate module name rejected",
    ));

    // dependency cycles are rejected
    let mut cyclic = spec.clone();
    cyclic
        .dependencies
        .insert("fabricate".to_string(), vec!["finish".to_string()]);
    results.push(check(
        "blueprint_rejects_cycles",
        matches!(cyclic.build(), Err(SimError::Validation(_))),
        "fabricate↔finish cycle rejected",
    ));

    if verbose {
        for (robot, list) in &built.priorities {
            println!("  priority[{}] = {:?}", robot, list);
        }
    }

    results
}

// ── 2. Geometry ─────────────────────────────────────────────────────────

fn validate_geometry(_verbose: bool) -> Vec<TestResult> {
    println!("--- Geometry ---");
    let mut results = Vec::new();

    let a = Coord::new(0.0, 0.0);
    let b = Coord::new(3.0, 4.0);
    results.push(check(
        "geometry_distance",
        a.distance(b) == 5.0,
        "3-4-5 triangle",
    ));

    // stepping the full distance snaps exactly onto the target
    let stepped = a.step_toward(b, 10.0);
    results.push(check(
        "geometry_step_snaps",
        stepped == b,
        "overshooting step lands exactly on target",
    ));

    // partial steps keep direction
    let half = a.step_toward(b, 2.5);
    results.push(check(
        "geometry_step_direction",
        half.within_range(Coord::new(1.5, 2.0)),
        format!("half step lands at ({}, {})", half.x, half.y),
    ));

    results
}

// ── 3. Power loop ───────────────────────────────────────────────────────

fn validate_power_loop(_verbose: bool) -> Vec<TestResult> {
    println!("--- Power Loop ---");
    let mut results = Vec::new();

    let mut modules = ModuleArena::new();
    let first = modules.insert(
        Module::new(ModuleType::new("cell", 100.0), "first", (0.0, 0.0), 100.0, 0.0).unwrap(),
    );
    let second = modules.insert(
        Module::new(ModuleType::new("cell", 100.0), "second", (0.0, 0.0), 100.0, 0.0).unwrap(),
    );
    let ty = RobotType {
        name: "probe".into(),
        required_modules: BTreeMap::from([("cell".to_string(), 2)]),
        performance: BTreeMap::from([(PerformanceAttribute::Mobility, 1.0)]),
        power_consumption: 30.0,
        recharge_trigger: 50.0,
    };
    let robot = Robot::new(ty, "probe_0", (0.0, 0.0), vec![first, second], &modules).unwrap();

    // draw empties the last-mounted module first, spilling into the next
    for _ in 0..4 {
        robot.draw_battery_power(&mut modules).unwrap();
    }
    results.push(check(
        "power_draw_order",
        modules.get(first).battery() == 80.0 && modules.get(second).battery() == 0.0,
        format!(
            "after four draws: first={} second={}",
            modules.get(first).battery(),
            modules.get(second).battery()
        ),
    ));

    // charge tops up the first-mounted module first
    robot.charge_battery_power(50.0, &mut modules).unwrap();
    results.push(check(
        "power_charge_order",
        modules.get(first).battery() == 100.0 && modules.get(second).battery() == 30.0,
        "charge refills in mounting order",
    ));

    // overflow beyond total capacity is discarded
    robot.charge_battery_power(1000.0, &mut modules).unwrap();
    results.push(check(
        "power_charge_capped",
        robot.is_battery_full(&modules) && robot.total_battery(&modules) == 200.0,
        format!("total battery {}", robot.total_battery(&modules)),
    ));

    results
}

// ── 4. Failure model ────────────────────────────────────────────────────

fn validate_failure_model(_verbose: bool) -> Vec<TestResult> {
    println!("--- Failure Model ---");
    let mut results = Vec::new();

    let model = ExponentialFailure::new("wearout", 0.1, 1);
    results.push(check(
        "risk_zero_at_start",
        model.failure_probability(0.0) == 0.0,
        "p(0) = 0",
    ));
    results.push(check(
        "risk_monotonic",
        (1..100).all(|t| {
            model.failure_probability(t as f64) > model.failure_probability((t - 1) as f64)
        }),
        "p(t) strictly increasing",
    ));

    // same seed, same verdict sequence
    let mut a = ExponentialFailure::new("a", 0.05, 99);
    let mut b = ExponentialFailure::new("b", 0.05, 99);
    a.initialize().unwrap();
    b.initialize().unwrap();
    let identical = (0..500).all(|t| {
        a.malfunction(t as f64).unwrap() == b.malfunction(t as f64).unwrap()
    });
    results.push(check(
        "risk_seed_reproducible",
        identical,
        "500 draws identical across equal seeds",
    ));

    results
}

// ── 5. Transport arithmetic ─────────────────────────────────────────────

fn validate_transport(_verbose: bool) -> Vec<TestResult> {
    println!("--- Transport ---");
    let mut results = Vec::new();

    let mut modules = ModuleArena::new();
    let cell = modules.insert(
        Module::new(ModuleType::new("cell", 1000.0), "cell_0", (0.0, 0.0), 1000.0, 0.0).unwrap(),
    );
    let ty = RobotType {
        name: "hauler".into(),
        required_modules: BTreeMap::from([("cell".to_string(), 1)]),
        performance: BTreeMap::from([
            (PerformanceAttribute::Transport, 1.0),
            (PerformanceAttribute::Mobility, 5.0),
        ]),
        power_consumption: 1.0,
        recharge_trigger: 10.0,
    };
    let mut robots =
        vec![Robot::new(ty, "h1", (0.0, 0.0), vec![cell], &modules).unwrap()];

    // 10 units at resistance 2: workload 20, payload speed 5/2 per step
    let mut task = Task::transport("haul", (0.0, 0.0), (10.0, 0.0), 2.0, 20.0).unwrap();
    task.init_dependencies(vec![]).unwrap();
    task.assign_robot(modufleet_core::robot::RobotId(0), &robots[0])
        .unwrap();
    task.update(true, &mut robots, &mut modules).unwrap();

    results.push(check(
        "transport_payload_speed",
        task.coordinate().within_range(Coord::new(2.5, 0.0)),
        format!("payload at ({}, {})", task.coordinate().x, task.coordinate().y),
    ));
    results.push(check(
        "transport_workload_progress",
        (task.completed_workload() - 5.0).abs() < 1e-9,
        format!("completed workload {}", task.completed_workload()),
    ));
    results.push(check(
        "transport_robot_follows",
        robots[0].coordinate().within_range(task.coordinate()),
        "hauler moved with the payload",
    ));

    results
}

// ── 6. Demo run ─────────────────────────────────────────────────────────

fn validate_demo_run(verbose: bool) -> Vec<TestResult> {
    println!("--- Demo Run ---");
    let mut results = Vec::new();

    let spec: WorldSpec = match serde_json::from_str(FLEET_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(check("demo_parse", false, format!("{}", e)));
            return results;
        }
    };

    let run = |label: &str| -> Result<(u64, f64, f64), SimError> {
        let mut sim = spec.build_simulator()?;
        let steps = sim.run(200)?;
        if verbose {
            println!(
                "  {} finished={} steps={} remaining={} wear_variance={:.3}",
                label,
                sim.is_finished(),
                steps,
                sim.total_remaining_workload(),
                sim.variance_operating_time()
            );
        }
        Ok((
            steps,
            sim.total_remaining_workload(),
            sim.variance_operating_time(),
        ))
    };

    let first = run("run_a");
    let second = run("run_b");
    match (first, second) {
        (Ok((steps_a, remaining_a, wear_a)), Ok((steps_b, remaining_b, wear_b))) => {
            results.push(check(
                "demo_completes",
                remaining_a == 0.0 && steps_a < 200,
                format!("all work tasks done in {} steps", steps_a),
            ));
            results.push(check(
                "demo_deterministic",
                steps_a == steps_b && remaining_a == remaining_b && wear_a == wear_b,
                "two builds of the same blueprint run identically",
            ));
            results.push(check(
                "demo_wear_spread",
                wear_a > 0.0,
                format!("operating-time variance {:.3}", wear_a),
            ));
        }
        (Err(e), _) | (_, Err(e)) => {
            results.push(check("demo_run", false, format!("{}", e)));
        }
    }

    results
}
