use std::thread;
use std::time::Duration;

use clap::Parser;
use ev3imu::{DeviceFamily, Ev3Imu, SampleProvider, SerialTransport, Vector3};

#[derive(Parser)]
#[command(name = "read-ev3imu")]
#[command(about = "Stream samples from an EV3 IMU sensor board")]
struct Args {
    /// Serial device the sensor port is bridged to
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    #[arg(short, long, default_value = "57600")]
    baud: u32,

    /// Board family: lsm6ds3, lsm9ds0 or lsm330dlc
    #[arg(short, long, default_value = "lsm6ds3")]
    family: DeviceFamily,

    /// Print raw register values instead of physical units
    #[arg(long)]
    raw: bool,

    /// Milliseconds between samples
    #[arg(long, default_value = "100")]
    interval: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let transport = SerialTransport::new(&args.port, args.baud)?;
    println!("Opened {} at {} baud as {}", args.port, args.baud, args.family);
    let mut imu = Ev3Imu::new(transport, args.family, args.raw)?;

    let mut sample = vec![0.0; imu.sample_size()];
    loop {
        match imu.fetch_sample(&mut sample) {
            Ok(()) => {
                for table in args.family.axes() {
                    let v = Vector3::from_slice(&sample, table.combined_offset).unwrap_or_default();
                    println!(
                        "{:<13} x: {: >10.3} y: {: >10.3} z: {: >10.3}",
                        table.kind.to_string(),
                        v.x,
                        v.y,
                        v.z
                    );
                }
                println!();
            }
            Err(e) => eprintln!("Failed to read sample: {}", e),
        }
        thread::sleep(Duration::from_millis(args.interval));
    }
}
