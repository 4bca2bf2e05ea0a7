//! Scenarios and the ordered plan they run in.

use crate::result::{ProbeError, ProbeResult};
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A named user journey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    name: String,
    order: u32,
    #[serde(default)]
    requires: Vec<String>,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            name: name.into(),
            order,
            requires: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Declare a scenario that must run earlier
    #[must_use]
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the run
    #[must_use]
    pub const fn order(&self) -> u32 {
        self.order
    }

    /// Names of scenarios this one depends on
    #[must_use]
    pub fn requirements(&self) -> &[String] {
        &self.requires
    }

    /// Steps in execution order
    #[must_use]
    pub fn step_list(&self) -> &[Step] {
        &self.steps
    }
}

/// Validated, ordered list of scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioPlan {
    scenarios: Vec<Scenario>,
}

impl ScenarioPlan {
    /// Sort by order and check names, orders, and requirements.
    ///
    /// # Errors
    ///
    /// `InvalidPlan` on duplicate names or orders, unknown requirements, or
    /// a requirement that does not run strictly earlier.
    pub fn new(mut scenarios: Vec<Scenario>) -> ProbeResult<Self> {
        scenarios.sort_by_key(Scenario::order);

        let mut orders: HashMap<&str, u32> = HashMap::new();
        for pair in scenarios.windows(2) {
            if pair[0].order == pair[1].order {
                return Err(invalid(format!(
                    "scenarios {:?} and {:?} share order {}",
                    pair[0].name, pair[1].name, pair[0].order
                )));
            }
        }
        for scenario in &scenarios {
            if orders.insert(&scenario.name, scenario.order).is_some() {
                return Err(invalid(format!("duplicate scenario name {:?}", scenario.name)));
            }
        }
        for scenario in &scenarios {
            for required in &scenario.requires {
                match orders.get(required.as_str()) {
                    None => {
                        return Err(invalid(format!(
                            "{:?} requires unknown scenario {required:?}",
                            scenario.name
                        )))
                    }
                    Some(&order) if order >= scenario.order => {
                        return Err(invalid(format!(
                            "{:?} (order {}) requires {required:?} (order {order}), which does not run earlier",
                            scenario.name, scenario.order
                        )))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(Self { scenarios })
    }

    /// Keep only the named scenarios, preserving order.
    ///
    /// A kept scenario whose requirement is filtered out stays in the plan;
    /// its dependent steps will fail on their own.
    ///
    /// # Errors
    ///
    /// `InvalidPlan` if a name matches no scenario.
    pub fn only(self, names: &[String]) -> ProbeResult<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.scenarios.iter().any(|s| &s.name == *n))
        {
            return Err(invalid(format!("no scenario named {unknown:?}")));
        }
        let scenarios: Vec<Scenario> = self
            .scenarios
            .into_iter()
            .filter(|s| names.contains(&s.name))
            .collect();
        for scenario in &scenarios {
            for required in &scenario.requires {
                if !scenarios.iter().any(|s| &s.name == required) {
                    warn!(
                        scenario = %scenario.name,
                        requirement = %required,
                        "requirement filtered out of the run"
                    );
                }
            }
        }
        Ok(Self { scenarios })
    }

    /// Scenarios in run order
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Names in run order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(Scenario::name).collect()
    }

    /// Number of scenarios
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the plan is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

fn invalid(message: String) -> ProbeError {
    ProbeError::InvalidPlan { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Vec<Scenario> {
        vec![
            Scenario::new("workout_flow", 3).requires("registration"),
            Scenario::new("registration", 1),
            Scenario::new("calculators", 2).requires("registration"),
        ]
    }

    #[test]
    fn test_sorted_by_order() {
        let plan = ScenarioPlan::new(plan()).unwrap();
        assert_eq!(plan.names(), vec!["registration", "calculators", "workout_flow"]);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_requirement_must_run_earlier() {
        let err = ScenarioPlan::new(vec![
            Scenario::new("a", 1).requires("b"),
            Scenario::new("b", 2),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_plan");
        assert!(err.to_string().contains("does not run earlier"));
    }

    #[test]
    fn test_unknown_requirement_rejected() {
        let err = ScenarioPlan::new(vec![Scenario::new("a", 1).requires("ghost")]).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let err = ScenarioPlan::new(vec![Scenario::new("a", 1), Scenario::new("b", 1)]).unwrap_err();
        assert!(err.to_string().contains("share order"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = ScenarioPlan::new(vec![Scenario::new("a", 1), Scenario::new("a", 2)]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_only_keeps_order_and_allows_missing_requirement() {
        let plan = ScenarioPlan::new(plan())
            .unwrap()
            .only(&["workout_flow".to_string(), "calculators".to_string()])
            .unwrap();
        assert_eq!(plan.names(), vec!["calculators", "workout_flow"]);
    }

    #[test]
    fn test_only_unknown_name() {
        let err = ScenarioPlan::new(plan())
            .unwrap()
            .only(&["nope".to_string()])
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_plan");
    }

    #[test]
    fn test_only_empty_is_identity() {
        let plan = ScenarioPlan::new(plan()).unwrap().only(&[]).unwrap();
        assert_eq!(plan.len(), 3);
    }
}
