//! Default render endpoint tracking

use cpal::traits::{DeviceTrait, HostTrait};

/// Opaque identity of an audio render endpoint
pub type EndpointId = String;

/// Queries the current default audio render endpoint
pub trait EndpointQuery: Send {
    /// `None` when no default output device exists
    fn current_default_endpoint(&self) -> Option<EndpointId>;
}

/// Default output device of the cpal host, identified by name.
///
/// cpal exposes no stable device id, so a swap between two devices that
/// report the same name (two headsets of one model, say) goes unnoticed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOutputEndpoint;

impl EndpointQuery for DefaultOutputEndpoint {
    fn current_default_endpoint(&self) -> Option<EndpointId> {
        cpal::default_host()
            .default_output_device()
            .and_then(|device| device.name().ok())
    }
}

/// Detects swaps of the default render endpoint between polls
pub struct EndpointMonitor {
    query: Box<dyn EndpointQuery>,
    current: Option<EndpointId>,
}

impl EndpointMonitor {
    /// Record the endpoint active at construction time
    pub fn new(query: Box<dyn EndpointQuery>) -> Self {
        let current = query.current_default_endpoint();
        Self { query, current }
    }

    pub fn current(&self) -> Option<&EndpointId> {
        self.current.as_ref()
    }

    /// Query the endpoint and record it if it changed.
    ///
    /// Returns true when the endpoint differs from the last recorded one.
    pub fn poll(&mut self) -> bool {
        let id = self.query.current_default_endpoint();
        if id == self.current {
            return false;
        }

        log::info!(
            "Default audio endpoint changed: {} -> {}",
            self.current.as_deref().unwrap_or("<none>"),
            id.as_deref().unwrap_or("<none>")
        );
        self.current = id;
        true
    }

    /// Give back the query so it can be reused by a later monitor
    pub fn into_query(self) -> Box<dyn EndpointQuery> {
        self.query
    }
}
