//! Counts and extents of a model graph.

use std::collections::BTreeMap;

use crate::config::Settings;
use crate::entity::DomainEntity;
use crate::model::Model;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub parts: usize,
    pub nodes: usize,
    pub steps: usize,
    pub loads: usize,
    /// Constraints per abstract class.
    pub constraint_counts: BTreeMap<String, usize>,
    /// Entities per resolved concrete class, across the whole graph.
    pub resolved_classes: BTreeMap<String, usize>,
    /// Axis-aligned node bounding box as `(min, max)`.
    pub bounds: Option<([f64; 3], [f64; 3])>,
}

impl ModelSummary {
    pub fn from_model(model: &Model) -> Self {
        let mut constraint_counts = BTreeMap::<String, usize>::new();
        let mut resolved_classes = BTreeMap::<String, usize>::new();
        let mut count_class = |entity: &dyn DomainEntity| {
            *resolved_classes
                .entry(entity.implementation().class_name().to_string())
                .or_insert(0) += 1;
        };

        count_class(model);
        let mut bounds: Option<([f64; 3], [f64; 3])> = None;
        for part in model.parts() {
            count_class(part);
            for node in part.nodes() {
                count_class(node);
                let xyz = node.xyz();
                bounds = Some(match bounds {
                    None => (xyz, xyz),
                    Some((mut lo, mut hi)) => {
                        for axis in 0..3 {
                            lo[axis] = lo[axis].min(xyz[axis]);
                            hi[axis] = hi[axis].max(xyz[axis]);
                        }
                        (lo, hi)
                    }
                });
            }
        }

        for constraint in model.constraints() {
            *constraint_counts
                .entry(constraint.kind().class_name().to_string())
                .or_insert(0) += 1;
            count_class(constraint.as_entity());
        }

        let mut loads = 0usize;
        for step in model.steps() {
            count_class(step);
            for load in step.loads() {
                loads += 1;
                count_class(load.as_entity());
            }
        }

        Self {
            parts: model.parts().len(),
            nodes: model.parts().iter().map(|p| p.nodes().len()).sum(),
            steps: model.steps().len(),
            loads,
            constraint_counts,
            resolved_classes,
            bounds,
        }
    }

    pub fn total_constraints(&self) -> usize {
        self.constraint_counts.values().sum()
    }

    /// One-line description; values use the configured precision.
    pub fn render(&self, settings: &Settings) -> String {
        let mut out = format!(
            "{} parts, {} nodes, {} constraints, {} steps, {} loads",
            self.parts,
            self.nodes,
            self.total_constraints(),
            self.steps,
            self.loads
        );
        if let Some((lo, hi)) = self.bounds {
            let fmt = |p: [f64; 3]| {
                p.iter()
                    .map(|v| settings.format_value(*v))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            out.push_str(&format!(", bounds [{}] .. [{}]", fmt(lo), fmt(hi)));
        }
        out
    }
}
