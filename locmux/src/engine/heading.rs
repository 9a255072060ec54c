//! Heading subscriptions on the engine.

use tracing::{debug, info};

use super::LocationEngine;
use crate::heading::{HeadingCallback, HeadingReport, HeadingRequest, HeadingSample};
use crate::registry::Registry;
use crate::request::RequestId;

impl LocationEngine {
    /// Subscribe to heading updates.
    ///
    /// On devices without a compass the callback fires once with
    /// `Unavailable` and nothing is tracked.
    pub fn subscribe_heading(&self, callback: HeadingCallback) -> RequestId {
        let request = HeadingRequest::new(callback);
        let id = request.id();

        if !self.inner.sensor.heading_available() {
            debug!(request_id = %id, "Heading unavailable on this device");
            (request.callback())(&HeadingReport::unavailable());
            return id;
        }

        let mut registry = self.inner.registry.lock();
        registry.insert_heading(request);
        self.sync_heading_session(&mut registry);
        debug!(request_id = %id, "Heading subscription added");
        id
    }

    /// Fan a heading reading out to every live heading subscription.
    pub fn handle_heading(&self, sample: HeadingSample) {
        let report = HeadingReport::from_sample(sample);
        let ids = {
            let mut registry = self.inner.registry.lock();
            registry.record_heading(sample);
            registry.heading_ids()
        };

        for id in ids {
            let callback = match self.inner.registry.lock().get_heading(id) {
                Some(request) => request.callback(),
                None => continue,
            };
            callback(&report);
        }
    }

    /// Number of live heading subscriptions.
    pub fn live_heading_count(&self) -> usize {
        self.inner.registry.lock().heading_len()
    }

    pub fn is_heading_session_running(&self) -> bool {
        self.inner.registry.lock().heading_running
    }

    pub(super) fn sync_heading_session(&self, registry: &mut Registry) {
        let wanted = registry.heading_len() > 0;
        if wanted == registry.heading_running {
            return;
        }
        if wanted {
            info!("Starting heading updates");
            self.inner.sensor.start_heading_updates();
        } else {
            info!("Stopping heading updates");
            self.inner.sensor.stop_heading_updates();
        }
        registry.heading_running = wanted;
    }
}
