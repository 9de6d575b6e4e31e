//! Audio device enumeration and selection

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SupportedStreamConfigRange};
use parking_lot::RwLock;

use crate::{AudioError, AudioResult};

/// Audio device information
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub input_channels: u16,
    pub output_channels: u16,
    pub sample_rates: Vec<u32>,
}

/// Get the audio host (platform-specific backend)
pub fn get_host() -> Host {
    // macOS: CoreAudio. Windows: prefer ASIO. Linux: prefer JACK.

    #[cfg(target_os = "windows")]
    {
        if let Some(id) = cpal::available_hosts()
            .into_iter()
            .find(|h| *h == cpal::HostId::Asio)
        {
            if let Ok(host) = cpal::host_from_id(id) {
                return host;
            }
        }
        cpal::default_host()
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(id) = cpal::available_hosts()
            .into_iter()
            .find(|h| *h == cpal::HostId::Jack)
        {
            if let Ok(host) = cpal::host_from_id(id) {
                return host;
            }
        }
        cpal::default_host()
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        cpal::default_host()
    }
}

/// List available output devices
pub fn list_output_devices() -> AudioResult<Vec<DeviceInfo>> {
    let host = get_host();
    let default_name = host
        .default_output_device()
        .as_ref()
        .and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host
        .output_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        if let Ok(name) = device.name() {
            let is_default = default_name.as_ref() == Some(&name);
            let (output_channels, sample_rates) = output_device_info(&device);
            devices.push(DeviceInfo {
                name,
                is_default,
                input_channels: 0,
                output_channels,
                sample_rates,
            });
        }
    }
    Ok(devices)
}

/// List available input devices
pub fn list_input_devices() -> AudioResult<Vec<DeviceInfo>> {
    let host = get_host();
    let default_name = host
        .default_input_device()
        .as_ref()
        .and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host
        .input_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        if let Ok(name) = device.name() {
            let is_default = default_name.as_ref() == Some(&name);
            let (input_channels, sample_rates) = input_device_info(&device);
            devices.push(DeviceInfo {
                name,
                is_default,
                input_channels,
                output_channels: 0,
                sample_rates,
            });
        }
    }
    Ok(devices)
}

/// Get default output device
pub fn get_default_output_device() -> AudioResult<Device> {
    get_host().default_output_device().ok_or(AudioError::NoDevice)
}

/// Get default input device
pub fn get_default_input_device() -> AudioResult<Device> {
    get_host().default_input_device().ok_or(AudioError::NoDevice)
}

/// Get output device by name
pub fn get_output_device_by_name(name: &str) -> AudioResult<Device> {
    let host = get_host();
    for device in host
        .output_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(name.to_string()))
}

/// Get input device by name
pub fn get_input_device_by_name(name: &str) -> AudioResult<Device> {
    let host = get_host();
    for device in host
        .input_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(name.to_string()))
}

fn output_device_info(device: &Device) -> (u16, Vec<u32>) {
    let configs: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map(|c| c.collect())
        .unwrap_or_default();
    extract_device_info(&configs)
}

fn input_device_info(device: &Device) -> (u16, Vec<u32>) {
    let configs: Vec<SupportedStreamConfigRange> = device
        .supported_input_configs()
        .map(|c| c.collect())
        .unwrap_or_default();
    extract_device_info(&configs)
}

fn extract_device_info(configs: &[SupportedStreamConfigRange]) -> (u16, Vec<u32>) {
    let max_channels = configs.iter().map(|c| c.channels()).max().unwrap_or(0);

    let mut sample_rates: Vec<u32> = configs
        .iter()
        .flat_map(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            [44_100, 48_000, 88_200, 96_000, 176_400, 192_000]
                .into_iter()
                .filter(move |&rate| rate >= min && rate <= max)
        })
        .collect();
    sample_rates.sort_unstable();
    sample_rates.dedup();

    (max_channels, sample_rates)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEVICE SELECTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Device selection state
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub block_frames: usize,
}

impl Default for DeviceSelection {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            sample_rate: 48_000,
            block_frames: 256,
        }
    }
}

/// Off-RT device manager: cached enumeration plus the current selection.
pub struct DeviceManager {
    selection: RwLock<DeviceSelection>,
    input_devices: RwLock<Vec<DeviceInfo>>,
    output_devices: RwLock<Vec<DeviceInfo>>,
}

impl DeviceManager {
    pub fn new() -> Self {
        let manager = Self {
            selection: RwLock::new(DeviceSelection::default()),
            input_devices: RwLock::new(Vec::new()),
            output_devices: RwLock::new(Vec::new()),
        };
        manager.refresh_devices();
        manager
    }

    /// Refresh device lists
    pub fn refresh_devices(&self) {
        if let Ok(inputs) = list_input_devices() {
            *self.input_devices.write() = inputs;
        }
        if let Ok(outputs) = list_output_devices() {
            *self.output_devices.write() = outputs;
        }
    }

    pub fn input_devices(&self) -> Vec<DeviceInfo> {
        self.input_devices.read().clone()
    }

    pub fn output_devices(&self) -> Vec<DeviceInfo> {
        self.output_devices.read().clone()
    }

    pub fn selection(&self) -> DeviceSelection {
        self.selection.read().clone()
    }

    pub fn set_output_device(&self, name: Option<String>) {
        self.selection.write().output_device = name;
    }

    pub fn set_input_device(&self, name: Option<String>) {
        self.selection.write().input_device = name;
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.selection.write().sample_rate = rate;
    }

    pub fn set_block_frames(&self, frames: usize) {
        self.selection.write().block_frames = frames;
    }

    pub fn default_output_name(&self) -> Option<String> {
        self.output_devices
            .read()
            .iter()
            .find(|d| d.is_default)
            .map(|d| d.name.clone())
    }

    /// Check if a device is currently present
    pub fn is_device_available(&self, name: &str, is_input: bool) -> bool {
        let devices = if is_input {
            self.input_devices.read()
        } else {
            self.output_devices.read()
        };
        devices.iter().any(|d| d.name == name)
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
