//! Template graph of a repository and the consistency checks on template references

use super::edit::allowed_statuses;
use crate::cmpt::ProductCmpt;
use crate::diagnostics::{Message, MessageList};
use crate::model::ModelContext;
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const MSGCODE_PREFIX: &str = "PRODUCTCMPT_TEMPLATE-";
pub const MSGCODE_INVALID_TEMPLATE: &str = "PRODUCTCMPT_TEMPLATE-InvalidTemplate";
pub const MSGCODE_INVALID_TEMPLATE_TYPE: &str = "PRODUCTCMPT_TEMPLATE-InvalidTemplateType";
pub const MSGCODE_TEMPLATE_CYCLE: &str = "PRODUCTCMPT_TEMPLATE-TemplateCycle";
pub const MSGCODE_INVALID_TEMPLATE_VALUE_STATUS: &str =
    "PRODUCTCMPT_TEMPLATE-InvalidTemplateValueStatus";

pub const PROPERTY_TEMPLATE: &str = "template";
pub const PROPERTY_TEMPLATE_VALUE_STATUS: &str = "templateValueStatus";

/// Directed graph with an edge from every component to the template it is based on.
///
/// References to components outside the graph are not edges; [`validate_template`] reports
/// them.
#[derive(Debug)]
pub struct TemplateHierarchy<'a> {
    graph: DiGraph<&'a str, ()>,
    nodes: HashMap<&'a str, NodeIndex>,
    cyclic: HashSet<&'a str>,
}

impl<'a> TemplateHierarchy<'a> {
    pub fn build<I>(cmpts: I) -> Self
    where
        I: IntoIterator<Item = &'a ProductCmpt>,
    {
        let cmpts: Vec<&'a ProductCmpt> = cmpts.into_iter().collect();
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for cmpt in &cmpts {
            let name = cmpt.qualified_name.as_str();
            nodes.insert(name, graph.add_node(name));
        }
        for cmpt in &cmpts {
            let Some(template) = cmpt.template.as_deref() else {
                continue;
            };
            let edge = nodes
                .get(cmpt.qualified_name.as_str())
                .zip(nodes.get(template));
            if let Some((&from, &to)) = edge {
                graph.add_edge(from, to, ());
            }
        }

        let mut cyclic = HashSet::new();
        for scc in tarjan_scc(&graph) {
            let self_loop = scc.len() == 1 && graph.contains_edge(scc[0], scc[0]);
            if scc.len() > 1 || self_loop {
                cyclic.extend(scc.iter().map(|&node| graph[node]));
            }
        }
        debug!(
            "Template graph: {} components, {} references, {} in cycles",
            graph.node_count(),
            graph.edge_count(),
            cyclic.len()
        );

        Self {
            graph,
            nodes,
            cyclic,
        }
    }

    /// The component followed by its templates, nearest first. Stops before a repeated name.
    pub fn template_chain(&self, qualified_name: &str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(qualified_name).copied();
        while let Some(node) = current {
            let name = self.graph[node];
            if !seen.insert(name) {
                break;
            }
            chain.push(name);
            current = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .next();
        }
        chain
    }

    /// Components directly based on `template`, sorted by name
    pub fn derived_from(&self, template: &str) -> Vec<&'a str> {
        let Some(&node) = self.nodes.get(template) else {
            return Vec::new();
        };
        let mut derived: Vec<&'a str> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        derived.sort_unstable();
        derived
    }

    pub fn in_cycle(&self, qualified_name: &str) -> bool {
        self.cyclic.contains(qualified_name)
    }

    pub fn has_cycles(&self) -> bool {
        !self.cyclic.is_empty()
    }
}

/// Check the template reference of `cmpt` and the statuses of its parts
pub fn validate_template<C>(ctx: &C, cmpt: &ProductCmpt, hierarchy: &TemplateHierarchy<'_>) -> MessageList
where
    C: ModelContext + ?Sized,
{
    let mut list = MessageList::new();
    let name = cmpt.qualified_name.as_str();

    if let Some(template_name) = cmpt.template.as_deref() {
        match ctx.find_product_cmpt(template_name) {
            None => list.add(
                Message::error(
                    MSGCODE_INVALID_TEMPLATE,
                    format!("Template {template_name} of {name} does not exist."),
                )
                .with_property(name, PROPERTY_TEMPLATE),
            ),
            Some(template) if !template.is_template => list.add(
                Message::error(
                    MSGCODE_INVALID_TEMPLATE,
                    format!("{template_name} is referenced as template of {name} but is no template."),
                )
                .with_property(name, PROPERTY_TEMPLATE),
            ),
            Some(template)
                if !ctx.is_same_or_supertype(&template.product_cmpt_type, &cmpt.product_cmpt_type) =>
            {
                list.add(
                    Message::error(
                        MSGCODE_INVALID_TEMPLATE_TYPE,
                        format!(
                            "Template {template_name} has type {}, which is neither {} nor one of its supertypes.",
                            template.product_cmpt_type, cmpt.product_cmpt_type
                        ),
                    )
                    .with_property(name, PROPERTY_TEMPLATE),
                )
            }
            Some(_) => {}
        }
    }

    if hierarchy.in_cycle(name) {
        let chain = hierarchy.template_chain(name);
        list.add(
            Message::error(
                MSGCODE_TEMPLATE_CYCLE,
                format!("Template hierarchy of {name} is cyclic: {} -> {name}", chain.join(" -> ")),
            )
            .with_property(name, PROPERTY_TEMPLATE),
        );
    }

    let allowed = allowed_statuses(cmpt);
    for id in cmpt.container_ids() {
        let Some(container) = cmpt.container(id) else {
            continue;
        };
        let parts = container
            .values
            .iter()
            .map(|v| (v.property_name.clone(), v.status()))
            .chain(container.links.iter().map(|l| (l.name(), l.status())));
        for (part, status) in parts {
            if !allowed.contains(&status) {
                list.add(
                    Message::error(
                        MSGCODE_INVALID_TEMPLATE_VALUE_STATUS,
                        format!("Status {status} is not allowed for {part}: {name} does not use a template."),
                    )
                    .with_property(cmpt.part_path(id, &part), PROPERTY_TEMPLATE_VALUE_STATUS),
                );
            }
        }
    }
    list
}
