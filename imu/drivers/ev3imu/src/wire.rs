use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use imu_traits::{ImuError, ImuResult, CALIBRATION_WORDS};

use crate::commands::{UartCommand, UartMessage};

/// Directive byte followed by twelve little-endian i16 words.
pub const CALIBRATION_FRAME_LEN: usize = 1 + 2 * CALIBRATION_WORDS;
/// Largest payload of one EV3 UART message.
pub const MAX_MESSAGE_PAYLOAD: usize = 32;

/// Returns `base + idx` as a single command byte.
pub fn indexed_command(base: u8, idx: usize) -> ImuResult<u8> {
    u8::try_from(idx)
        .ok()
        .and_then(|idx| base.checked_add(idx))
        .ok_or_else(|| {
            ImuError::ConfigurationError(format!(
                "command 0x{:02X} + {} does not fit in one byte",
                base, idx
            ))
        })
}

/// Serializes a calibration write: directive byte, 3x3 block row-major, then the bias row.
pub fn calibration_frame(
    base: u8,
    idx: usize,
    payload: &[i16; CALIBRATION_WORDS],
) -> ImuResult<Vec<u8>> {
    let mut frame = Vec::with_capacity(CALIBRATION_FRAME_LEN);
    frame.push(indexed_command(base, idx)?);
    for &word in payload {
        frame.write_i16::<LittleEndian>(word)?;
    }
    Ok(frame)
}

/// Decodes little-endian i16 words from `bytes` into `out`.
pub fn decode_shorts(bytes: &[u8], out: &mut [i16]) -> ImuResult<()> {
    let needed = out.len() * 2;
    if bytes.len() < needed {
        return Err(ImuError::ReadError(format!(
            "expected {} bytes, got {}",
            needed,
            bytes.len()
        )));
    }
    LittleEndian::read_i16_into(&bytes[..needed], out);
    Ok(())
}

/// Checksum used by EV3 UART messages: 0xFF xor every byte.
pub fn uart_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0xFF, |acc, &b| acc ^ b)
}

/// Wraps `payload` in a host command message.
///
/// The header is `0x40 | log2(len) << 3 | command`. The payload is zero-padded to
/// the next power of two and followed by the checksum of header and padded payload.
pub fn command_message(command: UartCommand, payload: &[u8]) -> ImuResult<Vec<u8>> {
    if payload.is_empty() || payload.len() > MAX_MESSAGE_PAYLOAD {
        return Err(ImuError::ConfigurationError(format!(
            "message payload of {} bytes, expected 1..={}",
            payload.len(),
            MAX_MESSAGE_PAYLOAD
        )));
    }
    let padded = payload.len().next_power_of_two();
    let header = UartMessage::Command as u8
        | ((padded.trailing_zeros() as u8) << 3)
        | command as u8;

    let mut message = Vec::with_capacity(padded + 2);
    message.push(header);
    message.extend_from_slice(payload);
    message.resize(padded + 1, 0);
    message.push(uart_checksum(&message));
    Ok(message)
}

/// SELECT message switching the sensor to output `mode`.
pub fn select_message(mode: u8) -> ImuResult<Vec<u8>> {
    command_message(UartCommand::Select, &[mode])
}

/// WRITE message carrying a device command and its arguments.
pub fn write_message(bytes: &[u8]) -> ImuResult<Vec<u8>> {
    command_message(UartCommand::Write, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_command() {
        assert_eq!(indexed_command(0x30, 2).unwrap(), 0x32);
        assert!(indexed_command(0xFF, 1).is_err());
        assert!(indexed_command(0x20, 300).is_err());
    }

    #[test]
    fn test_calibration_frame_layout() {
        let payload = [0x4000, 0, 0, 0, 0x4000, 0, 0, 0, 0x4000, -1, 2, -300];
        let frame = calibration_frame(0x40, 3, &payload).unwrap();

        assert_eq!(frame.len(), CALIBRATION_FRAME_LEN);
        assert_eq!(frame[0], 0x43);
        assert_eq!(&frame[1..3], &[0x00, 0x40]);
        // bias row starts after the nine block words
        assert_eq!(&frame[19..21], &[0xFF, 0xFF]);
        assert_eq!(&frame[21..23], &[0x02, 0x00]);
        assert_eq!(&frame[23..25], &(-300i16).to_le_bytes());
    }

    #[test]
    fn test_decode_shorts() {
        let bytes = [0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80];
        let mut out = [0i16; 3];
        decode_shorts(&bytes, &mut out).unwrap();
        assert_eq!(out, [1, -1, i16::MIN]);

        let mut too_many = [0i16; 4];
        assert!(decode_shorts(&bytes, &mut too_many).is_err());
    }

    #[test]
    fn test_uart_checksum() {
        assert_eq!(uart_checksum(&[0x43, 0x00]), 0xFF ^ 0x43);
        assert_eq!(uart_checksum(&[]), 0xFF);
    }

    #[test]
    fn test_select_message() {
        assert_eq!(select_message(2).unwrap(), vec![0x43, 0x02, 0xFF ^ 0x43 ^ 0x02]);
    }

    #[test]
    fn test_scale_select_is_wrapped_in_write() {
        let message = write_message(&[0x21]).unwrap();
        assert_eq!(message, vec![0x44, 0x21, 0xFF ^ 0x44 ^ 0x21]);
    }

    #[test]
    fn test_calibration_frame_is_padded_to_32_bytes() {
        let payload = [0x4000, 0, 0, 0, 0x4000, 0, 0, 0, 0x4000, 0, 0, 0];
        let frame = calibration_frame(0x40, 1, &payload).unwrap();
        let message = write_message(&frame).unwrap();

        assert_eq!(message.len(), 34);
        assert_eq!(message[0], 0x6C);
        assert_eq!(&message[1..26], frame.as_slice());
        assert!(message[26..33].iter().all(|&b| b == 0));
        assert_eq!(message[33], uart_checksum(&message[..33]));
    }

    #[test]
    fn test_message_payload_bounds() {
        assert!(write_message(&[]).is_err());
        assert!(write_message(&[0u8; 33]).is_err());
        let three = write_message(&[1, 2, 3]).unwrap();
        assert_eq!(three[0], 0x54);
        assert_eq!(three.len(), 6);
    }
}
