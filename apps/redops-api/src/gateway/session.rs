//! Per-connection endpoint: identity plus the producer side of its outbound queue.

use redops_common::id::{prefix, prefixed_ulid};
use tokio::sync::mpsc;

use super::events::Frame;

/// Default number of frames an endpoint may have queued before it is
/// considered unresponsive.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Unique per connection (`ep_` prefixed ULID). Several endpoints may share
/// one identity.
pub type EndpointId = String;

/// A logical client as the hub sees it.
///
/// Deliberately not `Clone`: the sender inside is the only one for this
/// queue, so whoever owns the `Endpoint` (the hub registry, once registered)
/// is the only party able to close it.
#[derive(Debug)]
pub struct Endpoint {
    id: EndpointId,
    identity: String,
    outbound: mpsc::Sender<Frame>,
}

impl Endpoint {
    /// Create an endpoint with a bounded outbound queue. The receiver is
    /// handed to the outbound pump.
    pub fn new(identity: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let endpoint = Self {
            id: prefixed_ulid(prefix::ENDPOINT),
            identity: identity.into(),
            outbound,
        };
        (endpoint, rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The authenticated user this connection belongs to.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Non-blocking enqueue used by the fan-out pass.
    pub(crate) fn try_enqueue(&self, frame: Frame) -> Result<(), mpsc::error::TrySendError<Frame>> {
        self.outbound.try_send(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_get_distinct_prefixed_ids() {
        let (a, _rx_a) = Endpoint::new("usr_a", 4);
        let (b, _rx_b) = Endpoint::new("usr_a", 4);
        assert!(a.id().starts_with("ep_"));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn dropping_the_endpoint_closes_its_queue() {
        let (endpoint, mut rx) = Endpoint::new("usr_a", 2);
        endpoint.try_enqueue(Frame::from("one")).unwrap();
        drop(endpoint);
        assert_eq!(rx.try_recv().unwrap().as_str(), "one");
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (endpoint, _rx) = Endpoint::new("usr_a", 0);
        assert!(endpoint.try_enqueue(Frame::from("x")).is_ok());
        assert!(matches!(
            endpoint.try_enqueue(Frame::from("y")),
            Err(mpsc::error::TrySendError::Full(_))
        ));
    }
}
