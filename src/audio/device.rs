// Output device enumeration and lookup (cpal)

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use super::{AudioError, AudioResult};

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List every output device the host exposes
    pub fn list_output_devices(&self) -> AudioResult<Vec<AudioDeviceInfo>> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let mut devices = Vec::new();
        for (index, device) in self.host.output_devices()?.enumerate() {
            match device.name() {
                Ok(name) => devices.push(AudioDeviceInfo {
                    id: format!("audio_out_{}", index),
                    is_default: name == default_name,
                    name,
                }),
                Err(e) => log::debug!("Skipping output device {index}: {e}"),
            }
        }

        Ok(devices)
    }

    /// Named device, or the host default when `name` is None
    pub fn output_device(&self, name: Option<&str>) -> AudioResult<Device> {
        match name {
            None => self.host.default_output_device().ok_or(AudioError::NoDevice),
            Some(wanted) => self
                .host
                .output_devices()?
                .find(|device| device.name().is_ok_and(|n| n == wanted))
                .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string())),
        }
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
