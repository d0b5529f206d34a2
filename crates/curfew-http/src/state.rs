use std::sync::Arc;

use curfew_config::Policy;
use curfew_core::StatusReceiver;
use curfew_device::DeviceClient;
use curfew_store::UsageStore;

#[derive(Clone)]
pub struct HttpState {
    pub policy: Arc<Policy>,
    pub store: Arc<dyn UsageStore>,
    pub device: Arc<dyn DeviceClient>,
    pub status: StatusReceiver,
}

impl HttpState {
    pub fn new(
        policy: Arc<Policy>,
        store: Arc<dyn UsageStore>,
        device: Arc<dyn DeviceClient>,
        status: StatusReceiver,
    ) -> Self {
        Self {
            policy,
            store,
            device,
            status,
        }
    }
}
