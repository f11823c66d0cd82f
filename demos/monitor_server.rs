//! Battery monitor server example
//!
//! Run with: cargo run --example monitor_server --features axum
//!
//! Then test with:
//!   curl -X POST http://localhost:3000/setVoltages -d '{"relay-barn": 45}'
//!   curl 'http://localhost:3000/getVoltageById?deviceId=relay-barn'
//!   curl -X POST http://localhost:3000/deleteDevice -d '{"deviceId": "relay-barn"}'

use std::sync::{Arc, Mutex};

use battreg::axum_ext::router;
use battreg::{charge_percentage, divider_voltage, DeviceRegistry, FileBacking, SystemType};

#[tokio::main]
async fn main() {
    let mut registry =
        DeviceRegistry::open(FileBacking::new("battreg.bin")).expect("open registry");

    // What the firmware's sampling loop would do: read the ADC, classify
    // the pack, cache the results. Here a canned count stands in for the
    // ADC read.
    let voltage = divider_voltage(2256);
    let system = SystemType::detect(voltage);
    registry.set_system_type(system).expect("persist system type");
    registry
        .set_last_percentage(f32::from(charge_percentage(voltage, system)))
        .expect("persist percentage");

    let settings = registry.settings();
    println!("Starting battery monitor server on http://localhost:3000");
    println!();
    println!(
        "Pack: {:.1}V ({}V system), charge {}%, threshold {}%",
        voltage,
        settings.system_type.nominal_volts(),
        settings.last_percentage,
        settings.threshold_percentage
    );
    println!(
        "Registry: {}/{} slots occupied",
        registry.occupied(),
        registry.capacity()
    );
    println!();
    println!("Endpoints:");
    println!("  POST /setVoltages       - Bulk upsert device thresholds");
    println!("  GET  /getVoltageById    - Per-device threshold (falls back to unit threshold)");
    println!("  POST /deleteDevice      - Remove a device record");
    println!();
    println!("Whether a relay engages above or below its threshold is the");
    println!("relay client's own wiring choice; this server only stores values.");

    let app = router(Arc::new(Mutex::new(registry)));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("bind");
    axum::serve(listener, app).await.expect("serve");
}
