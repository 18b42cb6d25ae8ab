use crate::models::{LocationNode, Machine};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Virtualization inventory: machine listing, tags, and location hierarchy.
///
/// Not-found is data, not an error: lookups return empty collections or
/// `None` and callers decide what absence means.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// List all machines registered under a datacenter scope.
    async fn list_machines(&self, scope: &str) -> Result<Vec<Machine>>;

    /// Location ancestor chain for a machine, leaf first, hierarchy root last.
    /// Empty if the machine is unknown.
    async fn location_ancestors(&self, machine: &str) -> Result<Vec<LocationNode>>;

    /// Live tag lookup, category -> value. Authoritative over any cached
    /// tag state carried on a `Machine`.
    async fn get_tags(&self, machine: &str) -> Result<HashMap<String, String>>;

    /// Create or overwrite one tag on a machine.
    async fn set_tag(&self, machine: &str, category: &str, value: &str) -> Result<()>;
}
