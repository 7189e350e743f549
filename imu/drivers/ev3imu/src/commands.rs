use num_derive::{FromPrimitive, ToPrimitive};

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum Lsm6ds3Command {
    DeviceReset = 0x11,

    AccScale2g = 0x20,
    AccScale4g = 0x21,
    AccScale8g = 0x22,
    AccScale16g = 0x23,

    GyroScale245dps = 0x30,
    GyroScale500dps = 0x31,
    GyroScale1000dps = 0x32,
    GyroScale2000dps = 0x33,
    GyroScale125dps = 0x34,

    CalibrateAcc2g = 0x40,
    CalibrateAcc4g = 0x41,
    CalibrateAcc8g = 0x42,
    CalibrateAcc16g = 0x43,

    CalibrateGyro245dps = 0x50,
    CalibrateGyro500dps = 0x51,
    CalibrateGyro1000dps = 0x52,
    CalibrateGyro2000dps = 0x53,
    CalibrateGyro125dps = 0x54,
}

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum Lsm9ds0Command {
    DeviceReset = 0x11,

    AccScale2g = 0x20,
    AccScale4g = 0x21,
    AccScale6g = 0x22,
    AccScale8g = 0x23,
    AccScale16g = 0x24,

    GyroScale245dps = 0x30,
    GyroScale500dps = 0x31,
    GyroScale2000dps = 0x32,

    MagScale2gs = 0x40,
    MagScale4gs = 0x41,
    MagScale8gs = 0x42,
    MagScale12gs = 0x43,

    CalibrateAcc2g = 0x50,
    CalibrateAcc4g = 0x51,
    CalibrateAcc6g = 0x52,
    CalibrateAcc8g = 0x53,
    CalibrateAcc16g = 0x54,

    CalibrateGyro245dps = 0x60,
    CalibrateGyro500dps = 0x61,
    CalibrateGyro2000dps = 0x62,

    CalibrateMag2gs = 0x70,
    CalibrateMag4gs = 0x71,
    CalibrateMag8gs = 0x72,
    CalibrateMag12gs = 0x73,
}

// This board has no calibration store.
#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum Lsm330dlcCommand {
    DeviceReset = 0x11,

    AccScale2g = 0x20,
    AccScale4g = 0x21,
    AccScale8g = 0x22,
    AccScale16g = 0x23,

    GyroScale250dps = 0x30,
    GyroScale500dps = 0x31,
    GyroScale2000dps = 0x32,
}

/// EV3 UART message types, the top two bits of a header byte.
#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum UartMessage {
    Command = 0x40,
    Data = 0xC0,
}

/// Low three bits of a `Command` header.
#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive)]
pub enum UartCommand {
    Select = 0x03,
    Write = 0x04,
}
