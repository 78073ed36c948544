//! Insertion-order resolution over data-models.
//!
//! Explicit dependencies are hard edges: a cycle among them is fatal.
//! Foreign-key dependencies from the composed schema are advisory: each
//! candidate edge is merged only if it keeps the graph acyclic, otherwise
//! it is logged and discarded. The sort is stable over input order, so the
//! result is deterministic.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{DbGearError, Result};
use crate::model::datamodel::DataModel;
use crate::model::schema::Schema;

/// Resolves the order in which data-models are inserted.
#[derive(Debug, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Order `datamodels` so that every dependency precedes its dependent.
    ///
    /// Explicit dependency cycles fail with [`DbGearError::Cycle`];
    /// FK-induced cycles degrade to a warning.
    pub fn resolve_insertion_order(
        &self,
        datamodels: Vec<DataModel>,
        schema: &Schema,
    ) -> Result<Vec<DataModel>> {
        let keys: Vec<String> = datamodels.iter().map(|dm| dm.key()).collect();
        let key_set: HashSet<&str> = keys.iter().map(String::as_str).collect();

        // Phase 1: explicit edges (hard).
        let mut deps: HashMap<String, HashSet<String>> =
            keys.iter().map(|k| (k.clone(), HashSet::new())).collect();
        for dm in &datamodels {
            let key = dm.key();
            for dep in &dm.dependencies {
                if !key_set.contains(dep.as_str()) {
                    warn!(
                        "{} depends on {}, but it's not in the data insertion set",
                        key, dep
                    );
                    continue;
                }
                debug!("explicit dependency: {} -> {}", key, dep);
                deps.get_mut(&key).unwrap().insert(dep.clone());
            }
        }

        // Explicit ordering must be acyclic.
        topo_sort(&keys, &deps).map_err(DbGearError::Cycle)?;

        // Phase 2: FK edges (advisory), merged one at a time.
        for dm in &datamodels {
            let key = dm.key();
            let table = match schema.tables.get(&dm.table_name) {
                Some(table) => table,
                None => continue,
            };
            for relation in &table.relations {
                let target = relation.target_key();
                if target == key || !key_set.contains(target.as_str()) {
                    continue;
                }
                if deps[&key].contains(&target) {
                    continue;
                }
                deps.get_mut(&key).unwrap().insert(target.clone());
                if topo_sort(&keys, &deps).is_err() {
                    deps.get_mut(&key).unwrap().remove(&target);
                    warn!("ignored FK (would cycle): {} -> {}", key, target);
                } else {
                    debug!("FK dependency: {} -> {}", key, target);
                }
            }
        }

        let order = topo_sort(&keys, &deps).map_err(DbGearError::Cycle)?;
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();

        let mut sorted = datamodels;
        sorted.sort_by_key(|dm| position[dm.key().as_str()]);
        debug!(
            "resolved insertion order: {:?}",
            sorted.iter().map(|dm| dm.key()).collect::<Vec<_>>()
        );
        Ok(sorted)
    }

    /// Advisory check: report explicit dependencies and FK targets that are
    /// not part of the insertion set. Does not block execution.
    pub fn validate_dependencies(
        &self,
        datamodels: &[DataModel],
        schema: &Schema,
    ) -> Vec<String> {
        let available: HashSet<String> = datamodels.iter().map(|dm| dm.key()).collect();
        let mut warnings = Vec::new();

        for dm in datamodels {
            for dep in &dm.dependencies {
                if !available.contains(dep) {
                    warnings.push(format!(
                        "Table {} depends on {}, but it's not in the data insertion set",
                        dm.key(),
                        dep
                    ));
                }
            }
            if let Some(table) = schema.tables.get(&dm.table_name) {
                for relation in &table.relations {
                    let target = relation.target_key();
                    if target != dm.key() && !available.contains(&target) {
                        warnings.push(format!(
                            "Table {} has FK to {}, but it's not in the data insertion set",
                            dm.key(),
                            target
                        ));
                    }
                }
            }
        }

        warnings
    }
}

/// Stable Kahn topological sort: among ready nodes, always pick the one
/// earliest in input order. On a cycle, returns a message naming one.
fn topo_sort(
    keys: &[String],
    deps: &HashMap<String, HashSet<String>>,
) -> std::result::Result<Vec<String>, String> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::with_capacity(keys.len());

    while order.len() < keys.len() {
        let next = keys.iter().find(|key| {
            !placed.contains(key.as_str())
                && deps[key.as_str()].iter().all(|d| placed.contains(d.as_str()))
        });
        match next {
            Some(key) => {
                placed.insert(key);
                order.push(key.clone());
            }
            None => {
                let remaining: Vec<&String> =
                    keys.iter().filter(|k| !placed.contains(k.as_str())).collect();
                return Err(describe_cycle(&remaining, deps, &placed));
            }
        }
    }
    Ok(order)
}

/// Walk unresolved dependency links from the first stuck node until a key
/// repeats, and format the loop as `a -> b -> a`.
fn describe_cycle(
    remaining: &[&String],
    deps: &HashMap<String, HashSet<String>>,
    placed: &HashSet<&str>,
) -> String {
    let remaining_set: HashSet<&str> = remaining.iter().map(|k| k.as_str()).collect();
    let mut path: Vec<&str> = Vec::new();
    let mut current = remaining[0].as_str();

    loop {
        if let Some(start) = path.iter().position(|k| *k == current) {
            let mut cycle: Vec<&str> = path[start..].to_vec();
            cycle.push(current);
            return cycle.join(" -> ");
        }
        path.push(current);
        current = deps[current]
            .iter()
            .filter(|d| remaining_set.contains(d.as_str()) && !placed.contains(d.as_str()))
            .min_by_key(|d| remaining.iter().position(|k| k.as_str() == d.as_str()))
            .map(|d| d.as_str())
            .unwrap_or(current);
    }
}
