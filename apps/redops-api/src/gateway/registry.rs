//! Endpoint registry and the single fan-out pass over it.
//!
//! Owned exclusively by the hub control loop (see [`super::fanout`]); nothing
//! here is shared or locked.

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;

use super::events::Frame;
use super::session::{Endpoint, EndpointId};

/// Who a fan-out pass targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every registered endpoint.
    All,
    /// Every endpoint whose identity matches (all sessions of one user).
    User(String),
}

impl Audience {
    fn includes(&self, endpoint: &Endpoint) -> bool {
        match self {
            Audience::All => true,
            Audience::User(identity) => endpoint.identity() == identity,
        }
    }
}

/// Outcome of one fan-out pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub evicted: Vec<EndpointId>,
}

/// Snapshot of one registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub endpoint_id: EndpointId,
    pub identity: String,
}

/// The set of live endpoints.
///
/// Holding an [`Endpoint`] means holding the only sender of its outbound
/// queue, so removing an entry is what closes that queue. An endpoint can
/// therefore be closed at most once, and never while still a member.
#[derive(Debug, Default)]
pub struct Registry {
    endpoints: HashMap<EndpointId, Endpoint>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint. Returns `false` if an entry with the same id was
    /// replaced (the replaced entry's queue is closed).
    pub fn register(&mut self, endpoint: Endpoint) -> bool {
        self.endpoints
            .insert(endpoint.id().to_string(), endpoint)
            .is_none()
    }

    /// Remove an endpoint, closing its queue. No-op if absent.
    pub fn unregister(&mut self, endpoint_id: &str) -> bool {
        self.endpoints.remove(endpoint_id).is_some()
    }

    /// Try to enqueue `frame` on every targeted endpoint without waiting.
    ///
    /// An endpoint whose queue is full (slow consumer) or already closed on
    /// the consumer side is evicted in the same pass.
    pub fn fan_out(&mut self, frame: &Frame, audience: &Audience) -> FanoutReport {
        let mut report = FanoutReport::default();

        self.endpoints.retain(|id, endpoint| {
            if !audience.includes(endpoint) {
                return true;
            }
            match endpoint.try_enqueue(frame.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        endpoint_id = %id,
                        user_id = %endpoint.identity(),
                        "outbound queue full, evicting endpoint"
                    );
                    report.evicted.push(id.clone());
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(endpoint_id = %id, "outbound pump gone, evicting endpoint");
                    report.evicted.push(id.clone());
                    false
                }
            }
        });

        report
    }

    pub fn contains(&self, endpoint_id: &str) -> bool {
        self.endpoints.contains_key(endpoint_id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn members(&self) -> Vec<MemberInfo> {
        self.endpoints
            .values()
            .map(|e| MemberInfo {
                endpoint_id: e.id().to_string(),
                identity: e.identity().to_string(),
            })
            .collect()
    }

    /// Drop every endpoint (closing all queues). Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.endpoints.len();
        self.endpoints.clear();
        n
    }
}
