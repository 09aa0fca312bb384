use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graphplan::{
    action::ActionSchema,
    expression::parse_ground_atoms,
    predicate::GroundAtom,
    problem::{Goal, Problem, ProblemBuilder},
    solver::{ForwardSearch, GraphPlan, Solver},
    state::State,
};

/// A chain of `length` airports, flying from the first to the last.
fn chain(length: usize) -> Problem {
    let fly = ActionSchema::from_expr(
        "Fly(from, to)",
        "At(from) & Route(from, to)",
        "~At(from) & At(to)",
    )
    .expect("valid schema");
    let routes = (1..length)
        .map(|i| format!("Route(N{}, N{})", i - 1, i))
        .collect::<Vec<_>>()
        .join(" & ");
    let last = format!("N{}", length - 1);

    ProblemBuilder::new("chain")
        .actions([fly])
        .init(State::from_iter(
            parse_ground_atoms(&format!("At(N0) & {routes}")).expect("valid facts"),
        ))
        .goal(Goal::atom(GroundAtom::new("At", [last.as_str()])))
        .build()
}

fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("graphplan/chain");

    for &n in &[4usize, 8, 16] {
        let problem = chain(n);
        group.bench_with_input(BenchmarkId::new("graphplan", n), &problem, |b, p| {
            b.iter(|| {
                let plan = GraphPlan::new().solve(p).expect("no error");
                black_box(plan.map(|p| p.len()));
            })
        });
        group.bench_with_input(BenchmarkId::new("forward", n), &problem, |b, p| {
            b.iter(|| {
                let plan = ForwardSearch::new().solve(p).expect("no error");
                black_box(plan.map(|p| p.len()));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solvers);
criterion_main!(benches);
