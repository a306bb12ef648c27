//! Declared-pool reconciliation and pool list parsing

use crate::error::PoolListError;
use crate::pool::PoolTracker;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

/// Owns the tracked pool set, keyed by name. Ordered, so every cycle builds
/// its batch in a stable pool order.
#[derive(Default)]
pub struct PoolRegistry {
    pools: BTreeMap<String, PoolTracker>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PoolTracker> {
        self.pools.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PoolTracker> {
        self.pools.get_mut(name)
    }

    /// Tracked pools in name order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PoolTracker> {
        self.pools.values_mut()
    }

    /// Aligns the tracked set with the declared list. Newly declared names
    /// get a zeroed tracker, names no longer declared are discarded along
    /// with their baselines, unchanged names keep their state untouched.
    pub fn reconcile(&mut self, declared: &[(String, String)]) {
        for (name, status_path) in declared {
            if !self.pools.contains_key(name) {
                info!(pool = %name, status_path = %status_path, "adding pool");
                self.pools
                    .insert(name.clone(), PoolTracker::new(name, status_path));
            }
        }

        let declared_names: HashSet<&str> =
            declared.iter().map(|(name, _)| name.as_str()).collect();
        let removed: Vec<String> = self
            .pools
            .keys()
            .filter(|name| !declared_names.contains(name.as_str()))
            .cloned()
            .collect();
        for name in removed {
            info!(pool = %name, "removing pool");
            self.pools.remove(&name);
        }
    }
}

/// Reads the declared pool list: one `name status-path` pair per line,
/// whitespace separated. Blank lines are ignored; anything else malformed
/// fails the whole read.
pub async fn read_pool_list(path: &Path) -> Result<Vec<(String, String)>, PoolListError> {
    let contents = tokio::fs::read_to_string(path).await?;
    let mut declared = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(status_path), None) => {
                declared.push((name.to_string(), status_path.to_string()));
            }
            _ => {
                return Err(PoolListError::Malformed {
                    line_no: idx + 1,
                    line: line.to_string(),
                });
            }
        }
    }
    Ok(declared)
}
