use std::io::{Read, Write};
use std::time::Duration;

use imu_traits::{ImuError, ImuResult, Transport};
use log::{debug, trace, warn};
use serialport::SerialPort;

use crate::commands::UartMessage;
use crate::wire;

const DATA_MASK: u8 = 0xC0;
const MODE_MASK: u8 = 0x07;
const MAX_SKIPPED_BYTES: usize = 256;

/// EV3 sensor port carrying framed UART messages.
pub struct SerialTransport {
    serial_port: Box<dyn SerialPort>,
    mode: u8,
}

impl SerialTransport {
    pub fn new(port_name: &str, baud_rate: u32) -> ImuResult<Self> {
        let serial_port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_secs(2))
            .open()?;
        debug!("Opened port: {}", port_name);
        Self::from_port(serial_port)
    }

    /// Uses an already opened port, discarding anything it has buffered.
    pub fn from_port(serial_port: Box<dyn SerialPort>) -> ImuResult<Self> {
        let mut ret = Self {
            serial_port,
            mode: 0,
        };
        ret.clear(Duration::from_millis(10))?;
        Ok(ret)
    }

    fn send_message(&mut self, message: &[u8]) -> ImuResult<()> {
        trace!("Sending {:02X?}", message);
        self.serial_port
            .write_all(message)
            .map_err(|e| ImuError::WriteError(format!("serial write failed: {}", e)))?;
        self.serial_port.flush()?;
        Ok(())
    }

    fn clear(&mut self, timeout: Duration) -> ImuResult<()> {
        let mut buffer = [0u8; 64];
        self.serial_port.set_timeout(timeout)?;
        for _ in 0..4 {
            match self.serial_port.read(&mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(n) => trace!("Cleared {} stale bytes", n),
            }
        }
        self.serial_port.set_timeout(Duration::from_secs(2))?;
        Ok(())
    }

    fn read_byte(&mut self) -> ImuResult<u8> {
        let mut byte = [0u8; 1];
        self.serial_port
            .read_exact(&mut byte)
            .map_err(|e| ImuError::ReadError(format!("serial read failed: {}", e)))?;
        Ok(byte[0])
    }

    /// Reads the next DATA message for the current mode and returns its payload.
    fn read_data_message(&mut self) -> ImuResult<Vec<u8>> {
        for _ in 0..MAX_SKIPPED_BYTES {
            let header = self.read_byte()?;
            if header & DATA_MASK != UartMessage::Data as u8 {
                continue;
            }
            let size = 1usize << ((header >> 3) & MODE_MASK);
            if size > wire::MAX_MESSAGE_PAYLOAD {
                continue;
            }
            let mut message = vec![0u8; size + 1];
            self.serial_port
                .read_exact(&mut message)
                .map_err(|e| ImuError::ReadError(format!("serial read failed: {}", e)))?;

            let checksum = message[size];
            let mut covered = Vec::with_capacity(size + 1);
            covered.push(header);
            covered.extend_from_slice(&message[..size]);
            if wire::uart_checksum(&covered) != checksum {
                warn!("Dropping DATA message with bad checksum");
                continue;
            }
            if header & MODE_MASK != self.mode {
                trace!("Skipping DATA for mode {}", header & MODE_MASK);
                continue;
            }
            message.truncate(size);
            return Ok(message);
        }
        Err(ImuError::ReadError(format!(
            "no DATA message for mode {} within {} bytes",
            self.mode, MAX_SKIPPED_BYTES
        )))
    }
}

impl Transport for SerialTransport {
    /// Sends `bytes` as one WRITE message; the firmware ignores bare command bytes.
    fn write(&mut self, bytes: &[u8]) -> ImuResult<usize> {
        let message = wire::write_message(bytes)?;
        self.send_message(&message)?;
        Ok(bytes.len())
    }

    fn read_shorts(&mut self, buffer: &mut [i16]) -> ImuResult<()> {
        let payload = self.read_data_message()?;
        wire::decode_shorts(&payload, buffer)
    }

    fn set_mode(&mut self, mode: u8) -> ImuResult<()> {
        let message = wire::select_message(mode)?;
        self.send_message(&message)?;
        self.mode = mode;
        Ok(())
    }
}
