use log::debug;

use crate::{act, error::PlanningError, problem::Problem, solver::Plan};

/// Replays `plan` from the initial state of `problem` and reports whether
/// the goal holds at the end.
///
/// Every step must be an instance of one of the problem's action schemas and
/// must be applicable when it is reached.
pub fn validate_plan(plan: &Plan, problem: &Problem) -> Result<bool, PlanningError> {
    let mut state = problem.init().clone();

    for step in plan.steps() {
        let unknown = || PlanningError::UnknownAction {
            action: step.render(),
        };
        let schema = problem
            .actions()
            .get_by_symbol(step.name())
            .ok_or_else(unknown)?;
        let binding = schema.binding_for(step.args()).ok_or_else(unknown)?;
        if schema.ground(&binding)? != *step {
            return Err(unknown());
        }

        state = act(&state, step)?;
    }

    let reached = problem.goal_test(&state);
    debug!(
        "{}: replayed {} steps, goal {}",
        problem.name(),
        plan.len(),
        if reached { "reached" } else { "not reached" }
    );
    Ok(reached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::{ActionSchema, GroundAction},
        expression::{parse_ground_atoms, parse_ground_literals},
        problem::{Goal, ProblemBuilder},
        solver::{GraphPlan, Solver},
        state::State,
        Symbol,
    };
    use alloc::vec;

    fn flights() -> Problem {
        let fly = ActionSchema::from_expr(
            "Fly(from, to)",
            "At(from) & Route(from, to)",
            "~At(from) & At(to)",
        )
        .unwrap();
        ProblemBuilder::new("flights")
            .actions([fly])
            .init(State::from_iter(
                parse_ground_atoms("At(Arad) & Route(Arad, Sibiu) & Route(Sibiu, Bucharest)")
                    .unwrap(),
            ))
            .goal(Goal::literals(parse_ground_literals("At(Bucharest)").unwrap()))
            .build()
    }

    fn step(problem: &Problem, args: &[&str]) -> GroundAction {
        let schema = problem.actions().get("Fly").unwrap();
        let args = args.iter().map(|&a| Symbol::new(a)).collect::<Vec<_>>();
        schema.ground(&schema.binding_for(&args).unwrap()).unwrap()
    }

    #[test]
    fn test_validate_found_plan() {
        let problem = flights();
        let plan = GraphPlan::new().solve(&problem).unwrap().unwrap();
        assert_eq!(validate_plan(&plan, &problem), Ok(true));
    }

    #[test]
    fn test_goal_not_reached() {
        let problem = flights();
        let plan = Plan::sequential(vec![step(&problem, &["Arad", "Sibiu"])]);
        assert_eq!(validate_plan(&plan, &problem), Ok(false));
    }

    #[test]
    fn test_inapplicable_step() {
        let problem = flights();
        let plan = Plan::sequential(vec![step(&problem, &["Sibiu", "Bucharest"])]);
        assert_eq!(
            validate_plan(&plan, &problem),
            Err(PlanningError::InapplicableAction {
                action: "Fly(Sibiu, Bucharest)".into()
            })
        );
    }

    #[test]
    fn test_unknown_action() {
        let problem = flights();
        let drive = ActionSchema::from_expr("Drive(from, to)", "At(from)", "~At(from) & At(to)")
            .unwrap();
        let args = [Symbol::new("Arad"), Symbol::new("Sibiu")];
        let step = drive.ground(&drive.binding_for(&args).unwrap()).unwrap();
        assert_eq!(
            validate_plan(&Plan::sequential(vec![step]), &problem),
            Err(PlanningError::UnknownAction {
                action: "Drive(Arad, Sibiu)".into()
            })
        );
    }
}
