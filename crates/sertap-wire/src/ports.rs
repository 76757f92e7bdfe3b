use serialport::{available_ports, SerialPortType};

use sertap_foundation::SourceError;

/// Substrings that mark a port as a likely Arduino-compatible adapter.
const ARDUINO_KEYWORDS: &[&str] = &[
    "arduino", "ch340", "ch341", "cp210", "ftdi", "uno", "mega", "nano", "leonardo",
];

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub device: String,
    pub description: String,
    pub arduino: bool,
}

/// Enumerate serial ports, likely Arduino adapters sorted first.
pub fn scan_ports() -> Result<Vec<PortInfo>, SourceError> {
    let mut ports = Vec::new();
    for port in available_ports().map_err(SourceError::Serial)? {
        let (description, haystack) = match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                let product = usb.product.clone().unwrap_or_default();
                let manufacturer = usb.manufacturer.clone().unwrap_or_default();
                let haystack = format!("{} {}", product, manufacturer).to_lowercase();
                (product, haystack)
            }
            SerialPortType::PciPort => ("PCI serial".to_string(), String::new()),
            SerialPortType::BluetoothPort => ("Bluetooth serial".to_string(), String::new()),
            SerialPortType::Unknown => (String::new(), String::new()),
        };
        ports.push(PortInfo {
            device: port.port_name,
            description,
            arduino: is_arduino_like(&haystack),
        });
    }
    ports.sort_by(|a, b| b.arduino.cmp(&a.arduino).then(a.device.cmp(&b.device)));
    Ok(ports)
}

fn is_arduino_like(haystack: &str) -> bool {
    ARDUINO_KEYWORDS.iter().any(|k| haystack.contains(k))
}
