//! Hypertrio scenario suite.
//!
//! Three journeys against the Hypertrio web app:
//!
//! | order | scenario                    | requires                    |
//! |-------|-----------------------------|-----------------------------|
//! | 1     | `registration_login_logout` |                             |
//! | 2     | `calculators`               | `registration_login_logout` |
//! | 3     | `workout_flow`              | `registration_login_logout` |
//!
//! Calculators are optional app features: a missing page or a broken
//! calculator is a soft failure. The workout lifecycle is mandatory up to
//! finishing the workout; only the dashboard confirmation is soft.

use crate::locator::{Locator, LocatorChain};
use crate::result::ProbeResult;
use crate::scenario::{Scenario, ScenarioPlan};
use crate::session::{slug, Session};
use crate::step::{Step, TextValue};
use std::time::Duration;

/// Account creation, logout, and login
pub const REGISTRATION: &str = "registration_login_logout";

/// BMI and TDEE calculators
pub const CALCULATORS: &str = "calculators";

/// Create, start, and finish a workout
pub const WORKOUT_FLOW: &str = "workout_flow";

const SHORT: Duration = Duration::from_secs(3);
const MEDIUM: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_secs(2);

/// Values typed into the calculators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculatorInputs {
    /// Age in years
    pub age: u32,
    /// Height in centimetres
    pub height_cm: u32,
    /// Weight in kilograms
    pub weight_kg: u32,
}

impl Default for CalculatorInputs {
    fn default() -> Self {
        Self {
            age: 21,
            height_cm: 190,
            weight_kg: 80,
        }
    }
}

/// Name of the workout created by this run
#[must_use]
pub fn workout_name(session: &Session) -> String {
    session.unique_label("Test Workout")
}

/// Sign in with the session credentials
#[must_use]
pub fn login_steps() -> Vec<Step> {
    vec![
        Step::navigate("/login"),
        Step::checkpoint("login_page"),
        Step::type_text(Locator::id("email-input"), TextValue::Email),
        Step::type_text(Locator::id("password-input"), TextValue::Password),
        Step::checkpoint("login_form_filled"),
        Step::click(Locator::id("login-button")),
        Step::confirm_authenticated(),
        Step::checkpoint("after_login"),
    ]
}

/// Register a new account, sign out, and sign back in
#[must_use]
pub fn registration_scenario() -> Scenario {
    Scenario::new(REGISTRATION, 1)
        .step(Step::navigate("/login"))
        .step(Step::click(Locator::id("switch-to-signup-link")))
        .step(Step::pause(Duration::from_secs(1)))
        .steps([
            Step::type_text(Locator::id("name-input"), TextValue::DisplayName),
            Step::type_text(Locator::id("email-input"), TextValue::Email),
            Step::type_text(Locator::id("password-input"), TextValue::Password),
            Step::type_text(Locator::id("confirm-password-input"), TextValue::Password),
            Step::checkpoint("signup_form_filled"),
            Step::click(Locator::id("register-button")),
            Step::confirm_authenticated(),
            Step::checkpoint("after_registration"),
            Step::click(Locator::id("nav-logout")),
            Step::confirm_signed_out(),
            Step::group("login", login_steps()),
        ])
}

fn bmi_group(inputs: &CalculatorInputs) -> Step {
    Step::group(
        "bmi",
        vec![
            Step::wait_present(Locator::xpath("//h2[contains(text(), 'BMI Calculator')]/parent::*"))
                .with_timeout(SHORT),
            Step::type_text(
                Locator::xpath("//input[@placeholder='Height (cm)']"),
                inputs.height_cm.to_string(),
            )
            .with_timeout(SHORT),
            Step::type_text(
                Locator::xpath("//input[@placeholder='Weight (kg)']"),
                inputs.weight_kg.to_string(),
            )
            .with_timeout(SHORT),
            Step::click(Locator::xpath("//button[contains(text(), 'Calculate BMI')]"))
                .with_timeout(SHORT),
            Step::assert_visible(
                Locator::xpath("//div[contains(text(), 'Your BMI')]"),
                "Your BMI",
            )
            .with_timeout(SHORT),
        ],
    )
    .soft()
}

fn tdee_group(inputs: &CalculatorInputs) -> Step {
    const TDEE: &str = "//h2[contains(text(), 'TDEE Calculator')]";
    Step::group(
        "tdee",
        vec![
            Step::wait_present(Locator::xpath(format!("{TDEE}/parent::*"))).with_timeout(SHORT),
            Step::type_text(Locator::xpath("//input[@placeholder='Age']"), inputs.age.to_string())
                .with_timeout(SHORT),
            Step::type_text(
                Locator::xpath(format!("{TDEE}/following::input[@placeholder='Height (cm)']")),
                inputs.height_cm.to_string(),
            )
            .with_timeout(SHORT),
            Step::type_text(
                Locator::xpath(format!("{TDEE}/following::input[@placeholder='Weight (kg)']")),
                inputs.weight_kg.to_string(),
            )
            .with_timeout(SHORT),
            Step::click(Locator::xpath("//input[@type='radio' and @value='male']"))
                .with_timeout(SHORT),
            Step::wait_present(Locator::xpath("//select[contains(@id, 'activity')]"))
                .with_timeout(SHORT),
            Step::select(Locator::xpath("//option[contains(text(), 'Moderate')]"))
                .with_timeout(SHORT),
            Step::click(Locator::xpath("//button[contains(text(), 'Calculate TDEE')]"))
                .with_timeout(SHORT),
            Step::assert_visible(
                Locator::xpath("//div[contains(text(), 'Your TDEE')]"),
                "Your TDEE",
            )
            .with_timeout(SHORT),
        ],
    )
    .soft()
}

/// Sign in, then exercise both calculators if the page exists
#[must_use]
pub fn calculators_scenario(inputs: &CalculatorInputs) -> Scenario {
    Scenario::new(CALCULATORS, 2)
        .requires(REGISTRATION)
        .steps(login_steps())
        .step(
            Step::group(
                "calculators",
                vec![
                    Step::navigate("/dashboard/calculators"),
                    Step::wait_present(Locator::xpath("//h1[contains(text(), 'Calculators')]"))
                        .with_timeout(MEDIUM),
                    Step::checkpoint("calculators_page"),
                    bmi_group(inputs),
                    tdee_group(inputs),
                ],
            )
            .soft(),
        )
}

/// Create a workout, run it, and look for it on the dashboard
#[must_use]
pub fn workout_scenario(session: &Session) -> Scenario {
    let name = workout_name(session);
    let workout_item = LocatorChain::labeled("workout item")
        .or(Locator::id(format!("workouts-item-{}", slug(&name))))
        .or(Locator::xpath(format!("//li[contains(., '{name}')]")));
    let exercise_option = LocatorChain::labeled("exercise option")
        .or(Locator::xpath("//option[text()='Bench Press']").with_timeout(SHORT))
        .or(Locator::xpath("//option[position()=2]").with_timeout(SHORT));
    let exercise_checkbox = LocatorChain::labeled("exercise checkbox")
        .or(Locator::id("exercise-checkbox-bench-press"))
        .or(Locator::xpath("//input[@type='checkbox']"));

    Scenario::new(WORKOUT_FLOW, 3)
        .requires(REGISTRATION)
        .steps(login_steps())
        .steps([
            Step::navigate("/dashboard/workouts"),
            Step::pause(SETTLE),
            Step::checkpoint("workouts_page"),
            Step::click(Locator::id("add-workout-button")).with_timeout(MEDIUM),
            Step::type_text(Locator::id("workout-name"), name).with_timeout(MEDIUM),
            Step::click(Locator::id("show-exercise-input-button"))
                .with_timeout(SHORT)
                .soft(),
            Step::wait_present(Locator::id("exercise-select")).with_timeout(MEDIUM),
            Step::select(exercise_option),
            Step::click(Locator::id("add-exercise-button")).with_timeout(MEDIUM),
            Step::pause(Duration::from_secs(1)),
            Step::checkpoint("exercise_added"),
            Step::click(Locator::id("create-workout-button")).with_timeout(MEDIUM),
            Step::pause(SETTLE),
            Step::checkpoint("after_save_workout"),
            Step::click(workout_item),
            Step::pause(SETTLE),
            Step::click(Locator::id("start-workout-button")).with_timeout(MEDIUM),
            Step::pause(SETTLE),
            Step::checkpoint("workout_in_progress"),
            Step::click(exercise_checkbox).soft(),
            Step::click(Locator::id("finish-workout-button")).with_timeout(MEDIUM),
            Step::pause(SETTLE),
            Step::checkpoint("after_finish_workout"),
            Step::group(
                "verify completion",
                vec![Step::assert_visible(
                    Locator::xpath("//div[contains(text(), 'Completed Workouts')]"),
                    "Completed Workouts",
                )
                .with_timeout(MEDIUM)],
            )
            .with_recovery(vec![
                Step::navigate("/dashboard"),
                Step::pause(SETTLE),
                Step::checkpoint("dashboard_after_workout"),
            ])
            .soft(),
        ])
}

/// The full suite in run order
///
/// # Errors
///
/// Never fails for the built-in scenarios; the plan is still validated.
pub fn suite(session: &Session) -> ProbeResult<ScenarioPlan> {
    ScenarioPlan::new(vec![
        registration_scenario(),
        calculators_scenario(&CalculatorInputs::default()),
        workout_scenario(session),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Action;

    #[test]
    fn test_suite_order_and_requirements() {
        let plan = suite(&Session::from_stamp(1_700_000_000)).unwrap();
        assert_eq!(plan.names(), vec![REGISTRATION, CALCULATORS, WORKOUT_FLOW]);
        for scenario in &plan.scenarios()[1..] {
            assert_eq!(scenario.requirements(), &[REGISTRATION.to_string()]);
        }
    }

    #[test]
    fn test_workout_item_locators() {
        let session = Session::from_stamp(1_700_000_000);
        assert_eq!(workout_name(&session), "Test Workout 1700000000");
        let scenario = workout_scenario(&session);
        let chain = scenario
            .step_list()
            .iter()
            .filter_map(Step::target)
            .find(|c| c.description() == "workout item")
            .unwrap();
        assert_eq!(
            chain.attempted(),
            vec![
                "id=workouts-item-test-workout-1700000000".to_string(),
                "xpath=//li[contains(., 'Test Workout 1700000000')]".to_string(),
            ]
        );
    }

    #[test]
    fn test_calculators_are_soft() {
        let scenario = calculators_scenario(&CalculatorInputs::default());
        let group = scenario.step_list().last().unwrap();
        assert_eq!(group.description(), "calculators");
        assert_eq!(group.severity(), crate::step::Severity::Soft);
        match group.action() {
            Action::Group { steps, .. } => {
                assert!(steps
                    .iter()
                    .filter(|s| matches!(s.action(), Action::Group { .. }))
                    .all(|s| s.severity() == crate::step::Severity::Soft));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn test_calculator_defaults() {
        let inputs = CalculatorInputs::default();
        assert_eq!((inputs.age, inputs.height_cm, inputs.weight_kg), (21, 190, 80));
    }
}
