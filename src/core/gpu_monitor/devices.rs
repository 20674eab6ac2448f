use crate::error::{Result, TopError};

use super::metrics::DeviceHandle;
use super::provider::MetricsProvider;

/// List every device the provider can see, in ascending index order.
///
/// No devices is a valid answer; only a failing count query is an error.
pub fn list_devices(provider: &dyn MetricsProvider) -> Result<Vec<DeviceHandle>> {
    let count = provider
        .device_count()
        .map_err(TopError::DeviceEnumeration)?;

    Ok((0..count).map(DeviceHandle).collect())
}
