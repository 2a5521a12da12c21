use std::thread;
use std::time::{Duration, Instant};

use rover_rs::config::Config;
use rover_rs::http_service::HttpService;
use rover_rs::power::PowerSwitch;
use rover_rs::scheduler::Scheduler;
use rover_rs::telemetry::{TelemetryClient, spawn_reporter};
use rover_rs::vehicle::Vehicle;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting rover control core...");

    let cfg = Config::default();
    let power = PowerSwitch::new(false);

    // The control loop works without the network: a failed bind only costs
    // the remote toggle.
    match HttpService::bind(&cfg.http_bind) {
        Ok(service) => {
            println!("Power service listening on {}", cfg.http_bind);
            println!("  GET /toggle - flip power");
            println!("  GET /status - current state");
            service.spawn(power.clone());
        }
        Err(e) => {
            eprintln!("Power service unavailable ({}); running local-only", e);
        }
    }

    let mut vehicle = Vehicle::new(&cfg, power)?;

    let client = TelemetryClient::new(&cfg.telemetry_addr, &cfg.telemetry_path);
    vehicle.set_telemetry(spawn_reporter(client));
    println!(
        "Telemetry every {:?} to {}{}",
        cfg.telemetry_interval, cfg.telemetry_addr, cfg.telemetry_path
    );

    let mut scheduler = Scheduler::new(&cfg);
    println!("Control loop started (power is OFF until toggled).\n");

    loop {
        if let Err(e) = scheduler.tick(&mut vehicle, Instant::now()) {
            eprintln!("Task error: {}", e);
        }
        thread::sleep(Duration::from_millis(10));
    }
}
