//! Serial port transport.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;
use valvelink_messenger::{Transport, TransportError};

/// Read timeout for the underlying port; reads only ever ask for bytes
/// that are already buffered, so this is rarely reached.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A [`Transport`] over a local serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `path` and wait `settle` for the board to come out of reset.
    ///
    /// Opening the port toggles DTR, which restarts most Arduino boards;
    /// frames sent before the bootloader hands over are lost.
    pub fn open(path: &str, baud_rate: u32, settle: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(io::Error::from)?;
        debug!(port = path, baud_rate, "Serial port opened");
        if !settle.is_zero() {
            thread::sleep(settle);
        }
        let transport = SerialTransport { port };
        transport
            .port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)?;
        Ok(transport)
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let pending = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; pending];
        match self.port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Names of the serial ports present on this machine.
pub fn list_ports() -> Result<Vec<String>, TransportError> {
    let ports = serialport::available_ports().map_err(io::Error::from)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
