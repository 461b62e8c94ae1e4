use criterion::{criterion_group, criterion_main, Criterion};
use lineage::core::plan::{InputPattern, OutputPattern, Plan};
use lineage::graph::DependencyGraph;

/// `width` parallel chains of `depth` stages each: `src/i -> stage-0/i -> ...`.
fn make_plans(width: usize, depth: usize) -> Vec<Plan> {
    let mut plans = Vec::with_capacity(width * depth);
    for d in 0..depth {
        for w in 0..width {
            let input = if d == 0 {
                format!("src/{w}.csv")
            } else {
                format!("stage-{}/{w}.csv", d - 1)
            };
            plans.push(Plan::new(
                format!("step-{d}"),
                vec![],
                vec![InputPattern::new(&input)],
                vec![OutputPattern::new(&format!("stage-{d}/{w}.csv"))],
                vec![],
            ));
        }
    }
    plans
}

fn bench_plan_insertion(c: &mut Criterion) {
    let plans = make_plans(16, 16);
    c.bench_function("dependency_add_256", |b| {
        b.iter(|| {
            let mut graph = DependencyGraph::default();
            for plan in plans.iter().cloned() {
                graph.add(plan).unwrap();
            }
            graph
        })
    });
}

fn bench_downstream(c: &mut Criterion) {
    let mut graph = DependencyGraph::default();
    for plan in make_plans(16, 16) {
        graph.add(plan).unwrap();
    }
    c.bench_function("downstream_paths_depth_16", |b| {
        b.iter(|| graph.downstream_paths("src/3.csv").len())
    });
}

criterion_group!(graphs, bench_plan_insertion, bench_downstream);
criterion_main!(graphs);
