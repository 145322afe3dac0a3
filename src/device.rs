use std::env;

use tracing::warn;

use crate::error::{Error, Result};

/// Comma separated device ids, e.g. `CONVBENCH_DEVICES=0,1`.
pub const DEVICES_ENV: &str = "CONVBENCH_DEVICES";

/// Picks the device a driver runs on. Only the first id is used; any
/// further ids are accepted and ignored.
pub fn select_device(devices: &[u32]) -> Result<u32> {
    let (&device, rest) = devices
        .split_first()
        .ok_or_else(|| Error::Config("device list is empty".to_string()))?;

    if !rest.is_empty() {
        warn!(
            "benchmarking runs on a single device, using {} and ignoring {:?}",
            device, rest
        );
    }

    Ok(device)
}

pub fn devices_from_env() -> Result<Option<Vec<u32>>> {
    match env::var(DEVICES_ENV) {
        Ok(value) => parse_devices(&value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_devices(value: &str) -> Result<Vec<u32>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|e| {
                Error::Config(format!("invalid device id {s:?} in {DEVICES_ENV}: {e}"))
            })
        })
        .collect()
}
