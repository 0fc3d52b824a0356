//! Basic demonstration of the isometric RTS simulation.
//!
//! Run with: RUST_LOG=isorts_sim=debug cargo run --example basic_demo
//!
//! An optional first argument names a JSON config file.

use isorts_sim::iso::grid_to_screen;
use isorts_sim::{AnimationState, SimConfig, SimEvent, SimWorld, UnitType, Vec2, BOSS_ID};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::from_json_path(std::path::Path::new(&path))?,
        None => SimConfig::default(),
    };

    println!("=== Isometric RTS - Simulation Demo ===\n");
    let mut sim = SimWorld::with_default_roster(config)?;

    println!("Initial state:");
    print_snapshot(&mut sim);

    // Send the warriors at the boss and the mages into a line behind them.
    println!("\n--- Warriors charge, mages form a line ---\n");
    sim.select_type(UnitType::Warrior, false);
    sim.order_move_selected(Vec2::new(15.0, 15.0), false);

    sim.select_type(UnitType::Mage, false);
    let camera = sim.camera();
    let proj = sim.config().projection;
    sim.begin_formation(grid_to_screen(Vec2::new(9.0, 12.0), camera, &proj));
    sim.extend_formation(grid_to_screen(Vec2::new(12.0, 9.0), camera, &proj), false);
    if let Some(plan) = sim.commit_formation() {
        println!("  formation: {} mages, reversed={}", plan.assignments.len(), plan.reversed);
    }

    // 15 seconds of frames at 60 fps.
    let frame_dt = 1.0 / 60.0;
    for frame in 0..900 {
        sim.step(frame_dt);

        for event in sim.drain_events() {
            match event {
                SimEvent::SpecialBlast { victims, at_ms, .. } => {
                    println!("  [{:>6.0} ms] blast hits {:?}", at_ms, victims)
                }
                SimEvent::Died { unit, at_ms } => {
                    println!("  [{:>6.0} ms] unit {} died", at_ms, unit.0)
                }
                SimEvent::Heckle { text, .. } => println!("  boss: \"{text}\""),
                _ => {}
            }
        }

        if (frame + 1) % 300 == 0 {
            let secs = sim.current_time_ms() / 1000.0;
            println!("\n--- Tick {} (t={:.1}s) ---", sim.current_tick(), secs);
            print_snapshot(&mut sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty()?);
    Ok(())
}

fn print_snapshot(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    for unit in &snapshot.units {
        let marker = if unit.id == BOSS_ID { "*" } else { " " };
        let state = match unit.animation {
            AnimationState::Die => "dead".to_string(),
            other => format!("{other:?}").to_lowercase(),
        };
        println!(
            "  {marker}{:>3} {:<16} pos=({:>5.1}, {:>5.1}) hp={:>4.0}/{:<4.0} [{}]{}",
            unit.id,
            unit.name,
            unit.x,
            unit.y,
            unit.health,
            unit.max_health,
            state,
            if unit.selected { " selected" } else { "" }
        );
    }
}
