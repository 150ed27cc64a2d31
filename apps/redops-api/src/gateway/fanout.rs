//! Broadcast hub for pushing live events to connected endpoints.
//!
//! A single control loop owns the [`Registry`]. Registration, removal and
//! fan-out are all messages to that loop, so they are applied one at a time
//! in arrival order and the registry is never touched from anywhere else.
//! The [`Hub`] handle is cheap to clone and every entry point returns
//! immediately; a slow client can only get itself evicted, never stall the
//! loop.

use std::fmt;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::events::{Frame, HubEvent};
use super::registry::{Audience, MemberInfo, Registry};
use super::session::{Endpoint, EndpointId};

/// Instructions accepted by the control loop.
enum Command {
    Register(Endpoint),
    Unregister(EndpointId),
    Broadcast { frame: Frame, audience: Audience },
    Members(oneshot::Sender<Vec<MemberInfo>>),
    Shutdown,
}

/// Returned when the control loop is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubClosed;

impl fmt::Display for HubClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("broadcast hub is not running")
    }
}

impl std::error::Error for HubClosed {}

/// Handle to the broadcast hub. Cheap to clone; kept in `AppState`.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::UnboundedSender<Command>,
}

impl Hub {
    /// Spawn the control loop on the current tokio runtime.
    pub fn start() -> Self {
        Self::spawn().0
    }

    /// Like [`Hub::start`], also returning the loop's join handle.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (commands, inbox) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(inbox, Registry::new()));
        (Self { commands }, task)
    }

    /// Add an endpoint. On a stopped hub the endpoint is dropped, which
    /// closes its queue.
    pub fn register(&self, endpoint: Endpoint) -> Result<(), HubClosed> {
        self.commands
            .send(Command::Register(endpoint))
            .map_err(|_| HubClosed)
    }

    /// Remove an endpoint and close its queue. Safe to call repeatedly and
    /// from either pump.
    pub fn unregister(&self, endpoint_id: &str) {
        let _ = self
            .commands
            .send(Command::Unregister(endpoint_id.to_string()));
    }

    /// Push an event to every connected endpoint.
    pub fn broadcast(&self, event: &HubEvent) {
        self.publish(event, Audience::All);
    }

    /// Push an event to every connection of one user.
    pub fn send_to_user(&self, user_id: &str, event: &HubEvent) {
        self.publish(event, Audience::User(user_id.to_string()));
    }

    /// Push an already-encoded frame.
    pub fn broadcast_frame(&self, frame: Frame, audience: Audience) {
        // Err only means the loop is gone; there is nobody left to deliver to.
        let _ = self.commands.send(Command::Broadcast { frame, audience });
    }

    /// Wrap `body` as the payload of a `kind` event and push it to `audience`.
    pub fn dispatch<T: Serialize>(&self, kind: &str, body: &T, audience: Audience) {
        match HubEvent::from_body(kind, body) {
            Ok(event) => self.publish(&event, audience),
            Err(err) => tracing::error!(?err, event_type = %kind, "failed to build hub event"),
        }
    }

    fn publish(&self, event: &HubEvent, audience: Audience) {
        match event.encode() {
            Ok(frame) => self.broadcast_frame(frame, audience),
            Err(err) => tracing::error!(?err, event_type = %event.kind, "failed to encode hub event"),
        }
    }

    /// Snapshot of the current membership, taken in order with all
    /// previously submitted commands.
    pub async fn members(&self) -> Result<Vec<MemberInfo>, HubClosed> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Members(reply))
            .map_err(|_| HubClosed)?;
        rx.await.map_err(|_| HubClosed)
    }

    /// Close every endpoint queue and stop the control loop.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

async fn run(mut inbox: mpsc::UnboundedReceiver<Command>, mut registry: Registry) {
    tracing::debug!("broadcast hub started");

    while let Some(command) = inbox.recv().await {
        match command {
            Command::Register(endpoint) => {
                let endpoint_id = endpoint.id().to_string();
                let user_id = endpoint.identity().to_string();
                if !registry.register(endpoint) {
                    tracing::warn!(%endpoint_id, "endpoint re-registered, previous entry closed");
                }
                tracing::debug!(%endpoint_id, %user_id, members = registry.len(), "endpoint registered");
            }
            Command::Unregister(endpoint_id) => {
                if registry.unregister(&endpoint_id) {
                    tracing::debug!(%endpoint_id, members = registry.len(), "endpoint unregistered");
                }
            }
            Command::Broadcast { frame, audience } => {
                let report = registry.fan_out(&frame, &audience);
                if !report.evicted.is_empty() {
                    tracing::info!(
                        delivered = report.delivered,
                        evicted = report.evicted.len(),
                        "fan-out evicted unresponsive endpoints"
                    );
                }
            }
            Command::Members(reply) => {
                let _ = reply.send(registry.members());
            }
            Command::Shutdown => break,
        }
    }

    let closed = registry.clear();
    tracing::info!(closed, "broadcast hub stopped");
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use tokio::time;

    use super::super::events::EventType;
    use super::*;

    async fn member_ids(hub: &Hub) -> HashSet<EndpointId> {
        hub.members()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.endpoint_id)
            .collect()
    }

    async fn recv(rx: &mut mpsc::Receiver<Frame>) -> Option<Frame> {
        time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for frame")
    }

    fn notification() -> HubEvent {
        HubEvent::new(EventType::NOTIFICATION, serde_json::json!({ "title": "x" }))
    }

    #[tokio::test]
    async fn broadcast_reaches_all_registered_endpoints_once() {
        let hub = Hub::start();
        let (a, mut a_rx) = Endpoint::new("usr_a", 8);
        let (b, mut b_rx) = Endpoint::new("usr_b", 8);
        let (c, mut c_rx) = Endpoint::new("usr_c", 8);
        for e in [a, b, c] {
            hub.register(e).unwrap();
        }

        hub.broadcast(&notification());
        let expected = notification().encode().unwrap();

        for rx in [&mut a_rx, &mut b_rx, &mut c_rx] {
            assert_eq!(recv(rx).await.unwrap().as_str(), expected.as_str());
        }
        // Round-trip through the loop so any stray second copy would be queued by now.
        hub.members().await.unwrap();
        for rx in [&mut a_rx, &mut b_rx, &mut c_rx] {
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn slow_endpoint_is_evicted_and_others_still_receive() {
        let hub = Hub::start();
        let (a, mut a_rx) = Endpoint::new("usr_a", 1);
        let (b, mut b_rx) = Endpoint::new("usr_b", 8);
        let (c, mut c_rx) = Endpoint::new("usr_c", 8);
        let a_id = a.id().to_string();
        for e in [a, b, c] {
            hub.register(e).unwrap();
        }

        hub.broadcast(&HubEvent::new("fill", serde_json::json!(1)));
        hub.broadcast(&notification());

        let members = member_ids(&hub).await;
        assert!(!members.contains(&a_id));
        assert_eq!(members.len(), 2);

        let fill = HubEvent::new("fill", serde_json::json!(1)).encode().unwrap();
        let note = notification().encode().unwrap();
        assert_eq!(recv(&mut a_rx).await.unwrap().as_str(), fill.as_str());
        assert!(recv(&mut a_rx).await.is_none());
        for rx in [&mut b_rx, &mut c_rx] {
            assert_eq!(recv(rx).await.unwrap().as_str(), fill.as_str());
            assert_eq!(recv(rx).await.unwrap().as_str(), note.as_str());
        }
    }

    #[tokio::test]
    async fn unregister_is_idempotent_and_stops_delivery() {
        let hub = Hub::start();
        let (a, mut a_rx) = Endpoint::new("usr_a", 8);
        let (b, mut b_rx) = Endpoint::new("usr_b", 8);
        let (c, mut c_rx) = Endpoint::new("usr_c", 8);
        let b_id = b.id().to_string();
        for e in [a, b, c] {
            hub.register(e).unwrap();
        }

        hub.unregister(&b_id);
        hub.broadcast(&notification());
        hub.unregister(&b_id);

        assert_eq!(member_ids(&hub).await.len(), 2);
        assert!(recv(&mut b_rx).await.is_none());
        assert!(recv(&mut a_rx).await.is_some());
        assert!(recv(&mut c_rx).await.is_some());
    }

    #[tokio::test]
    async fn fifo_order_per_endpoint() {
        let hub = Hub::start();
        let (a, mut rx) = Endpoint::new("usr_a", 16);
        hub.register(a).unwrap();

        for i in 0..10 {
            hub.broadcast(&HubEvent::new("seq", serde_json::json!(i)));
        }
        for i in 0..10 {
            let frame = recv(&mut rx).await.unwrap();
            let event: HubEvent = serde_json::from_str(frame.as_str()).unwrap();
            assert_eq!(event.payload, serde_json::json!(i));
        }
    }

    #[tokio::test]
    async fn send_to_user_skips_other_users() {
        let hub = Hub::start();
        let (a, mut a_rx) = Endpoint::new("usr_a", 8);
        let (b, mut b_rx) = Endpoint::new("usr_b", 8);
        hub.register(a).unwrap();
        hub.register(b).unwrap();

        hub.send_to_user("usr_b", &notification());
        hub.members().await.unwrap();

        assert!(a_rx.try_recv().is_err());
        assert!(recv(&mut b_rx).await.is_some());
    }

    #[tokio::test]
    async fn dispatch_wraps_body_as_payload() {
        let hub = Hub::start();
        let (a, mut rx) = Endpoint::new("usr_a", 8);
        hub.register(a).unwrap();

        hub.dispatch(
            EventType::TASK_DELETED,
            &serde_json::json!({ "id": "tsk_1" }),
            Audience::All,
        );

        let frame = recv(&mut rx).await.unwrap();
        let event: HubEvent = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(event.kind, "task_deleted");
        assert_eq!(event.payload["id"], "tsk_1");
    }

    #[tokio::test]
    async fn shutdown_closes_all_queues_and_rejects_new_endpoints() {
        let (hub, task) = Hub::spawn();
        let (a, mut a_rx) = Endpoint::new("usr_a", 8);
        hub.register(a).unwrap();

        hub.shutdown();
        task.await.unwrap();

        assert!(recv(&mut a_rx).await.is_none());
        let (late, mut late_rx) = Endpoint::new("usr_late", 8);
        assert_eq!(hub.register(late), Err(HubClosed));
        assert!(recv(&mut late_rx).await.is_none());
        assert_eq!(hub.members().await, Err(HubClosed));
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_loop() {
        let (hub, task) = Hub::spawn();
        let (a, mut a_rx) = Endpoint::new("usr_a", 8);
        hub.register(a).unwrap();
        drop(hub);

        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("hub loop did not stop")
            .unwrap();
        assert!(recv(&mut a_rx).await.is_none());
    }
}
