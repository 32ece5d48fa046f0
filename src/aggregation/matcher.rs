//! Matching decoded metrics against the aggregation rules.

use crate::core::{AggregationSpecification, Metric};

/// The fixed rule set, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AggregationTable {
    specifications: Vec<AggregationSpecification>,
}

impl AggregationTable {
    /// Wrap an already validated set of specifications.
    pub fn new(specifications: Vec<AggregationSpecification>) -> Self {
        Self { specifications }
    }

    /// Every specification the metric contributes to. Matching looks at the
    /// metric name only; a metric may match any number of rules.
    pub fn matches<'a>(
        &'a self,
        metric: &'a Metric,
    ) -> impl Iterator<Item = &'a AggregationSpecification> + 'a {
        self.specifications.iter().filter(move |spec| spec.matches(metric))
    }

    pub fn specifications(&self) -> &[AggregationSpecification] {
        &self.specifications
    }

    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }
}
