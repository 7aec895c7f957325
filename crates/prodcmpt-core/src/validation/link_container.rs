//! Cardinality checks over the links of one container
//!
//! Links are checked per association role against the model cardinality of the association.
//! Only links with an effective cardinality take part in the cardinality checks: links marked
//! UNDEFINED and inherited links whose template chain supplies nothing are skipped. Duplicate
//! targets are looked for among every link not marked UNDEFINED.

use crate::cmpt::cardinality::{PROPERTY_MAX_CARDINALITY, PROPERTY_MIN_CARDINALITY};
use crate::cmpt::{Cardinality, ContainerId, MANY, ProductCmpt, ProductCmptLink, TemplateValueStatus};
use crate::diagnostics::{Message, MessageList};
use crate::model::{ModelContext, ProductAssociation};
use crate::template::effective_cardinality;
use indexmap::IndexMap;
use tracing::trace;

pub const MSGCODE_MIN_CARDINALITY_FALLS_BELOW_MODEL_MIN: &str =
    "PRODUCTCMPT_LINK-MinCardinalityFallsBelowModelMin";
pub const MSGCODE_MAX_CARDINALITY_EXCEEDS_MODEL_MAX: &str =
    "PRODUCTCMPT_LINK-MaxCardinalityExceedsModelMax";
pub const MSGCODE_DUPLICATE_RELATION_TARGET: &str = "PRODUCTCMPT_LINK-DuplicateRelationTarget";

/// Validate the links of container `id`.
///
/// The component level checks the static associations, a generation the ones changing over
/// time. Links of unknown associations are left to the delta.
pub fn validate_links<C>(ctx: &C, cmpt: &ProductCmpt, id: ContainerId) -> MessageList
where
    C: ModelContext + ?Sized,
{
    let mut list = MessageList::new();
    let Some(product_type) = ctx.find_product_cmpt_type(&cmpt.product_cmpt_type) else {
        return list;
    };
    let Some(container) = cmpt.container(id) else {
        return list;
    };

    for association in ctx.find_all_associations(&cmpt.product_cmpt_type) {
        let here = product_type.changing_over_time && association.changing_over_time;
        if here != id.is_generation() {
            continue;
        }
        let present: Vec<&ProductCmptLink> = container
            .links_for(&association.name)
            .filter(|link| link.status() != TemplateValueStatus::Undefined)
            .collect();
        let links: Vec<(&ProductCmptLink, Cardinality)> = present
            .iter()
            .map(|link| (*link, effective_cardinality(ctx, cmpt, id, link)))
            .filter(|(_, cardinality)| !cardinality.is_undefined())
            .collect();
        trace!(
            "Validating {} links of {} in {}",
            links.len(),
            association.name,
            cmpt.container_label(id)
        );

        for (link, cardinality) in &links {
            list.append(cardinality.validate(&cmpt.part_path(id, &link.name())));
        }
        validate_totals(cmpt, id, association, &links, &mut list);
        validate_targets(cmpt, id, association, &present, &mut list);
    }
    list
}

/// Sum of bounds, `None` once an unbounded maximum takes part
fn total(bounds: impl Iterator<Item = i32>) -> Option<i64> {
    bounds
        .map(|bound| (bound != MANY).then_some(i64::from(bound)))
        .sum()
}

fn validate_totals(
    cmpt: &ProductCmpt,
    id: ContainerId,
    association: &ProductAssociation,
    links: &[(&ProductCmptLink, Cardinality)],
    list: &mut MessageList,
) {
    let model_min = i64::from(association.min_cardinality);
    if let Some(max_total) = total(links.iter().map(|(_, c)| c.max()))
        && max_total < model_min
    {
        for (link, _) in links {
            list.add(
                Message::error(
                    MSGCODE_MIN_CARDINALITY_FALLS_BELOW_MODEL_MIN,
                    format!(
                        "The links of {} allow at most {max_total} targets, the model requires at least {model_min}.",
                        association.name
                    ),
                )
                .with_property(cmpt.part_path(id, &link.name()), PROPERTY_MIN_CARDINALITY),
            );
        }
    }

    if association.max_cardinality == MANY {
        return;
    }
    let model_max = i64::from(association.max_cardinality);
    if let Some(min_total) = total(links.iter().map(|(_, c)| c.min()))
        && min_total > model_max
    {
        for (link, _) in links {
            list.add(
                Message::error(
                    MSGCODE_MAX_CARDINALITY_EXCEEDS_MODEL_MAX,
                    format!(
                        "The links of {} require at least {min_total} targets, the model allows at most {model_max}.",
                        association.name
                    ),
                )
                .with_property(cmpt.part_path(id, &link.name()), PROPERTY_MAX_CARDINALITY),
            );
        }
    }
}

fn validate_targets(
    cmpt: &ProductCmpt,
    id: ContainerId,
    association: &ProductAssociation,
    links: &[&ProductCmptLink],
    list: &mut MessageList,
) {
    let mut by_target: IndexMap<&str, Vec<&ProductCmptLink>> = IndexMap::new();
    for link in links {
        by_target.entry(link.target.as_str()).or_default().push(link);
    }
    for (target, duplicates) in by_target {
        if duplicates.len() < 2 {
            continue;
        }
        let mut message = Message::error(
            MSGCODE_DUPLICATE_RELATION_TARGET,
            format!(
                "{target} is linked {} times through {}.",
                duplicates.len(),
                association.name
            ),
        );
        for link in duplicates {
            message = message.with_object(cmpt.part_path(id, &link.name()));
        }
        list.add(message);
    }
}
