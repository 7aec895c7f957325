use super::{DeltaAction, DeltaEntry, EntryId, ProductCmptDelta};
use crate::cmpt::{ContainerId, ProductCmpt, ProductCmptLink, PropertyValue, PropertyValueContainer};
use crate::error::ModelError;
use crate::result::Result;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::{debug, info};

/// What fixing a delta changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    /// Entries processed
    pub fixed: usize,
    pub values_created: usize,
    pub values_removed: usize,
    pub values_updated: usize,
    pub links_created: usize,
    pub links_removed: usize,
    /// Entries with nothing left to do, e.g. a part that was already removed
    pub skipped: usize,
}

impl FixReport {
    pub fn is_empty(&self) -> bool {
        self.fixed == 0
    }
}

/// Apply every entry of `delta` to `cmpt`, predecessors first.
///
/// The delta must have been computed for this component. Fixing is idempotent: an entry whose
/// part is already gone, or whose value or link already exists, is skipped. The entries are
/// applied to a copy that replaces `cmpt` only when every entry succeeded, so on error `cmpt` is
/// left untouched.
pub fn fix_delta(cmpt: &mut ProductCmpt, delta: &ProductCmptDelta) -> Result<FixReport> {
    if delta.cmpt != cmpt.qualified_name {
        return Err(ModelError::internal_error(format!(
            "Delta of {} cannot be applied to {}",
            delta.cmpt, cmpt.qualified_name
        )));
    }
    let order = fix_order(delta)?;
    let mut fixed = cmpt.clone();
    reserve_stored_ids(&mut fixed);

    let mut report = FixReport::default();
    for entry in order {
        debug!("Fixing #{} {}", entry.id, entry);
        apply(&mut fixed, entry, &mut report)?;
        report.fixed += 1;
    }
    *cmpt = fixed;
    info!(
        "Fixed {} delta entries of {} ({} skipped)",
        report.fixed, cmpt.qualified_name, report.skipped
    );
    Ok(report)
}

/// Ids read from storage or set by hand must not be handed out again
fn reserve_stored_ids(cmpt: &mut ProductCmpt) {
    let stored: Vec<u32> = cmpt
        .container_ids()
        .into_iter()
        .filter_map(|id| cmpt.container(id))
        .flat_map(|c| {
            c.values
                .iter()
                .map(|v| v.id)
                .chain(c.links.iter().map(|l| l.id))
        })
        .collect();
    for id in stored {
        cmpt.reserve_part_id(id);
    }
}

/// Entries ordered so that every predecessor comes before the entries depending on it
fn fix_order(delta: &ProductCmptDelta) -> Result<Vec<&DeltaEntry>> {
    let mut graph: DiGraph<&DeltaEntry, ()> = DiGraph::new();
    let mut nodes: HashMap<EntryId, NodeIndex> = HashMap::new();
    for entry in delta.entries() {
        nodes.insert(entry.id, graph.add_node(entry));
    }
    for entry in delta.entries() {
        let Some(predecessor) = entry.predecessor else {
            continue;
        };
        let edge = nodes.get(&predecessor).zip(nodes.get(&entry.id));
        let Some((&from, &to)) = edge else {
            return Err(ModelError::internal_error(format!(
                "Delta entry #{} depends on unknown entry #{predecessor}",
                entry.id
            )));
        };
        graph.add_edge(from, to, ());
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        ModelError::internal_error(format!(
            "Delta entries of {} depend on each other in a cycle at #{}",
            delta.cmpt,
            graph[cycle.node_id()].id
        ))
    })?;
    Ok(sorted.into_iter().map(|node| graph[node]).collect())
}

fn container_mut(cmpt: &mut ProductCmpt, id: ContainerId) -> Result<&mut PropertyValueContainer> {
    let name = cmpt.qualified_name.clone();
    cmpt.container_mut(id)
        .ok_or_else(|| ModelError::internal_error(format!("{name} has no container {id}")))
}

fn apply(cmpt: &mut ProductCmpt, entry: &DeltaEntry, report: &mut FixReport) -> Result<()> {
    match &entry.action {
        DeltaAction::CreateValue { value_type, value } => {
            let exists = container_mut(cmpt, entry.container)?
                .find_value(&entry.part_name, *value_type)
                .is_some();
            if exists {
                report.skipped += 1;
            } else {
                let id = cmpt.allocate_part_id();
                container_mut(cmpt, entry.container)?.add_value(PropertyValue::new(
                    id,
                    entry.part_name.as_str(),
                    *value_type,
                    value.clone(),
                ));
                report.values_created += 1;
            }
        }
        DeltaAction::RemoveValue { value_id } => {
            let container = container_mut(cmpt, entry.container)?;
            if container.remove_value(*value_id).is_some() {
                report.values_removed += 1;
            } else {
                report.skipped += 1;
            }
        }
        DeltaAction::ReplaceValues { remove, create } => {
            let container = container_mut(cmpt, entry.container)?;
            for value_id in remove {
                if container.remove_value(*value_id).is_some() {
                    report.values_removed += 1;
                }
            }
            for (value_type, value) in create {
                let exists = container_mut(cmpt, entry.container)?
                    .find_value(&entry.part_name, *value_type)
                    .is_some();
                if !exists {
                    let id = cmpt.allocate_part_id();
                    container_mut(cmpt, entry.container)?.add_value(PropertyValue::new(
                        id,
                        entry.part_name.as_str(),
                        *value_type,
                        value.clone(),
                    ));
                    report.values_created += 1;
                }
            }
        }
        DeltaAction::SetValue { value_id, value } => {
            let container = container_mut(cmpt, entry.container)?;
            match container.value_by_id_mut(*value_id) {
                Some(stored) => {
                    stored.value = value.clone();
                    report.values_updated += 1;
                }
                None => report.skipped += 1,
            }
        }
        DeltaAction::CreateLink {
            association,
            target,
            cardinality,
        } => {
            let exists = container_mut(cmpt, entry.container)?
                .find_link(association, target)
                .is_some();
            if exists {
                report.skipped += 1;
            } else {
                let id = cmpt.allocate_part_id();
                container_mut(cmpt, entry.container)?.add_link(ProductCmptLink {
                    id,
                    association: association.clone(),
                    target: target.clone(),
                    cardinality: cardinality.clone(),
                });
                report.links_created += 1;
            }
        }
        DeltaAction::RemoveLink { link_id } => {
            let container = container_mut(cmpt, entry.container)?;
            if container.remove_link(*link_id).is_some() {
                report.links_removed += 1;
            } else {
                report.skipped += 1;
            }
        }
        DeltaAction::MoveLink {
            link_id,
            link,
            destinations,
        } => {
            if container_mut(cmpt, entry.container)?.remove_link(*link_id).is_some() {
                report.links_removed += 1;
            }
            for &destination in destinations {
                let exists = container_mut(cmpt, destination)?
                    .find_link(&link.association, &link.target)
                    .is_some();
                if !exists {
                    let id = cmpt.allocate_part_id();
                    container_mut(cmpt, destination)?.add_link(ProductCmptLink {
                        id,
                        ..link.clone()
                    });
                    report.links_created += 1;
                }
            }
        }
    }
    Ok(())
}
