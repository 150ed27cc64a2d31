pub mod notification;
pub mod operation;
pub mod result;
pub mod task;
pub mod tool;
pub mod user;

use redops_common::PrefixedId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record persisted as one JSON document in a named collection.
pub trait Document: PrefixedId + Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}
