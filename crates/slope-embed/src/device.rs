use candle_core::Device;

use slope_core::error::{Error, Result};

/// Map the `device` setting to a candle device.
///
/// Accepts `cpu`, `cuda`, `cuda:N`, `metal` and `mps`. An accelerator that
/// cannot be opened (missing feature, no hardware) falls back to the CPU.
pub fn select_device(name: &str) -> Result<Device> {
    let name = name.trim().to_ascii_lowercase();
    let opened = match name.as_str() {
        "cpu" | "" => return Ok(Device::Cpu),
        "metal" | "mps" => Device::new_metal(0),
        n if n == "cuda" || n.starts_with("cuda:") => {
            let ordinal = match n.split_once(':') {
                Some((_, idx)) => idx.parse::<usize>().map_err(|_| Error::InvalidConfig(format!("bad cuda ordinal in device '{}'", n)))?,
                None => 0,
            };
            Device::new_cuda(ordinal)
        }
        other => return Err(Error::InvalidConfig(format!("unknown device '{}'", other))),
    };
    match opened {
        Ok(dev) => {
            tracing::info!(device = %name, "Using accelerator");
            Ok(dev)
        }
        Err(e) => {
            tracing::warn!(device = %name, error = %e, "Accelerator unavailable, using CPU");
            Ok(Device::Cpu)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_and_unknown() {
        assert!(matches!(select_device("CPU").unwrap(), Device::Cpu));
        assert!(select_device("tpu").is_err());
        assert!(select_device("cuda:x").is_err());
    }

    #[cfg(not(any(feature = "cuda", feature = "metal")))]
    #[test]
    fn unavailable_accelerator_falls_back_to_cpu() {
        assert!(matches!(select_device("cuda:1").unwrap(), Device::Cpu));
        assert!(matches!(select_device("mps").unwrap(), Device::Cpu));
    }
}
