//! Structural distance between two processing models.
//!
//! A score of `0.0` means the models are indistinguishable, `1.0` means they
//! share nothing.

use std::collections::BTreeSet;

use crate::graph::ProcessingModel;
use crate::node::Node;
use crate::parameter::Parameters;

/// `name=value` pairs for every parameter, using normalized names.
fn parameter_set(parameters: &Parameters) -> BTreeSet<String> {
    parameters
        .iter()
        .map(|p| format!("{}={}", p.normalized_name(), p.value().to_json()))
        .collect()
}

fn signature(class_name: &str, node: &dyn Node) -> String {
    let params: Vec<String> = parameter_set(node.parameters()).into_iter().collect();
    format!("{}({})", class_name, params.join(","))
}

/// Symmetric difference over union. `None` when both sets are empty.
fn set_distance(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    let union = a.union(b).count();
    if union == 0 {
        return None;
    }
    let difference = a.symmetric_difference(b).count();
    Some(difference as f64 / union as f64)
}

fn processor_distance(a: &ProcessingModel, b: &ProcessingModel) -> Option<f64> {
    let best_matches = |from: &ProcessingModel, to: &ProcessingModel| -> Vec<f64> {
        from.processors()
            .filter_map(|p| {
                let params = parameter_set(p.parameters());
                to.processors()
                    .filter(|q| q.class_name() == p.class_name())
                    .map(|q| set_distance(&params, &parameter_set(q.parameters())).unwrap_or(0.0))
                    .min_by(f64::total_cmp)
            })
            .collect()
    };

    let scores: Vec<f64> = best_matches(a, b)
        .into_iter()
        .chain(best_matches(b, a))
        .collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Distance in `[0, 1]` between two models.
///
/// Sources, sinks and processors are each scored on their own and the
/// result is the mean of the components that could be scored. Processors
/// only ever match processors of the same class.
pub fn tolerance(a: &ProcessingModel, b: &ProcessingModel) -> f64 {
    let sources = |m: &ProcessingModel| -> BTreeSet<String> {
        m.external_sources()
            .map(|s| signature(s.class_name(), s))
            .collect()
    };
    let sinks = |m: &ProcessingModel| -> BTreeSet<String> {
        m.external_sinks()
            .map(|s| signature(s.class_name(), s))
            .collect()
    };

    let components: Vec<f64> = [
        set_distance(&sources(a), &sources(b)),
        set_distance(&sinks(a), &sinks(b)),
        processor_distance(a, b),
    ]
    .into_iter()
    .flatten()
    .collect();

    if components.is_empty() {
        return 0.0;
    }
    components.iter().sum::<f64>() / components.len() as f64
}
