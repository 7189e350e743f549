use std::error::Error;
use std::io::{self, BufRead, Write};

use clap::Parser;
use ev3imu::{DeviceFamily, Ev3Imu, SerialTransport, SystemDelay};
use imu_calibration::{
    reset_calibration_store, AxisKind, CalibrationSettings, CancelToken, DataSource,
    FileDataSource, FileTemplate, GyroOffsetCalibration, ImuDataProvider, ImuError, ImuResult,
    MeasurementDataSource, Operator, SavingDataSource, SensorInfo, SixPointCalibration,
};
use strum_macros::{Display, EnumString};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
enum Mode {
    SixPoint,
    GyroOffset,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
enum Source {
    Measurement,
    File,
}

#[derive(Parser)]
#[command(name = "six-point")]
#[command(about = "Calibrate an EV3 IMU sensor board and write the result to its store")]
struct Args {
    /// Serial device the sensor port is bridged to
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    #[arg(short, long, default_value = "57600")]
    baud: u32,

    /// Board family: lsm6ds3, lsm9ds0 or lsm330dlc
    #[arg(short, long, default_value = "lsm6ds3")]
    family: DeviceFamily,

    /// Axis group for six-point calibration: accel or gyro
    #[arg(short, long, default_value = "accel")]
    axis: AxisKind,

    /// six-point, gyro-offset or reset
    #[arg(short, long, default_value = "six-point")]
    mode: Mode,

    /// measurement or file; asked interactively when omitted
    #[arg(short, long)]
    source: Option<Source>,

    /// Samples per position and scale
    #[arg(long, default_value = "2000")]
    samples: usize,

    /// Seconds to wait after each position is confirmed
    #[arg(long, default_value = "10")]
    countdown: u64,

    /// Raw sample files, one per scale
    #[arg(long, default_value = "w[{}].txt")]
    replay: FileTemplate,

    /// Solved matrix files, one per scale
    #[arg(long, default_value = "X[{}].txt")]
    audit: FileTemplate,

    /// Do not persist measured samples
    #[arg(long)]
    no_save: bool,
}

/// Prompts on stdout and reads answers from stdin.
struct ConsoleOperator {
    cancel: CancelToken,
    input: io::StdinLock<'static>,
}

impl ConsoleOperator {
    fn new(cancel: CancelToken) -> Self {
        ConsoleOperator {
            cancel,
            input: io::stdin().lock(),
        }
    }

    fn read_line(&mut self) -> ImuResult<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl Operator for ConsoleOperator {
    fn select_from_menu(&mut self, title: &str, options: &[&str]) -> Option<usize> {
        println!("{}", title);
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        print!("> ");
        let _ = io::stdout().flush();
        let answer = self.read_line().ok()??;
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => Some(n - 1),
            _ => None,
        }
    }

    fn wait_for_confirmation(&mut self, message: &str) -> ImuResult<()> {
        println!();
        print!("{}, then press Enter (q to abort) ", message);
        let _ = io::stdout().flush();
        match self.read_line()? {
            Some(answer) if answer != "q" => Ok(()),
            _ => {
                self.cancel.cancel();
                Err(ImuError::Cancelled)
            }
        }
    }

    fn show_progress(&mut self, label: &str, value: usize) {
        print!("\r{} {:<4}", label, value);
        let _ = io::stdout().flush();
    }

    fn beep(&mut self) {
        print!("\x07");
        let _ = io::stdout().flush();
    }
}

fn choose_source(operator: &mut dyn Operator) -> Option<Source> {
    match operator.select_from_menu("Data source", &["Measurement", "Files", "Exit"])? {
        0 => Some(Source::Measurement),
        1 => Some(Source::File),
        _ => None,
    }
}

fn six_point(
    imu: Ev3Imu<SerialTransport>,
    args: &Args,
    settings: CalibrationSettings,
    operator: &mut ConsoleOperator,
    cancel: &CancelToken,
) -> Result<(), Box<dyn Error>> {
    let info = SensorInfo::for_device(args.family, args.axis)?;
    let scale_count = info.scale_count();
    let calibration =
        SixPointCalibration::new(info.clone(), settings.clone()).with_cancel(cancel.clone());
    let mut provider = ImuDataProvider::new(imu, info)?;

    let Some(source) = args.source.or_else(|| choose_source(operator)) else {
        return Ok(());
    };
    let raw = match source {
        Source::Measurement => {
            let measurement =
                MeasurementDataSource::new(&mut provider, operator, scale_count, settings.clone())
                    .with_cancel(cancel.clone());
            let mut source: Box<dyn DataSource + '_> = if args.no_save {
                Box::new(measurement)
            } else {
                Box::new(SavingDataSource::new(
                    measurement,
                    settings.replay_template.clone(),
                ))
            };
            calibration.collect(&mut source)?
        }
        Source::File => calibration.collect(&mut FileDataSource::new(
            scale_count,
            settings.replay_template.clone(),
        ))?,
    };
    println!();

    for fit in calibration.calibrate(&raw, &mut provider)? {
        println!(
            "scale {}: rms residual {:.3} LSB ({:.3} after device rounding), payload {:?}",
            fit.scale,
            fit.rms_residual,
            fit.device_residual,
            fit.payload.words()
        );
    }
    Ok(())
}

fn gyro_offset(
    imu: Ev3Imu<SerialTransport>,
    args: &Args,
    settings: CalibrationSettings,
    operator: &mut ConsoleOperator,
    cancel: &CancelToken,
) -> Result<(), Box<dyn Error>> {
    let info = SensorInfo::zero_rate(args.family, AxisKind::Gyroscope)?;
    let calibration = GyroOffsetCalibration::new(info.scale_count(), settings)
        .with_cancel(cancel.clone());
    let mut provider = ImuDataProvider::new(imu, info)?;

    let Some(source) = args.source.or_else(|| choose_source(operator)) else {
        return Ok(());
    };
    let captures = match source {
        Source::Measurement => {
            let captures = calibration.capture(&mut provider, operator, &SystemDelay)?;
            if !args.no_save {
                calibration.save(&captures)?;
            }
            captures
        }
        Source::File => calibration.load()?,
    };
    println!();

    for fit in calibration.calibrate(&captures, &mut provider)? {
        println!(
            "scale {}: mean ({:.2}, {:.2}, {:.2}), deviation ({:.2}, {:.2}, {:.2})",
            fit.scale,
            fit.mean.x,
            fit.mean.y,
            fit.mean.z,
            fit.deviation.x,
            fit.deviation.y,
            fit.deviation.z
        );
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let transport = SerialTransport::new(&args.port, args.baud)?;
    // calibration works on raw LSB values
    let mut imu = Ev3Imu::new(transport, args.family, true)?;
    info!("connected to {} on {}", args.family, args.port);

    let cancel = CancelToken::new();
    let mut operator = ConsoleOperator::new(cancel.clone());
    let settings = CalibrationSettings {
        sample_count: args.samples,
        countdown_s: args.countdown,
        audit_template: args.audit.clone(),
        replay_template: args.replay.clone(),
        ..Default::default()
    };

    match args.mode {
        Mode::Reset => {
            let written = reset_calibration_store(&mut imu, &cancel)?;
            println!("Reset {} calibration slots", written);
            Ok(())
        }
        Mode::SixPoint => six_point(imu, args, settings, &mut operator, &cancel),
        Mode::GyroOffset => gyro_offset(imu, args, settings, &mut operator, &cancel),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
