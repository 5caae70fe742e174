//! Benchmarks `DependencyResolver`'s cycle detection and topological sort
//! (§4.5.1) over chains of dependent tasks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use hivemind::domain::models::{SwarmId, Task, TaskId};
use hivemind::services::DependencyResolver;

/// Builds `n` tasks in a single dependency chain: task `i` depends on
/// task `i - 1`.
fn chain(n: usize) -> Vec<Task> {
    let swarm_id = SwarmId::new();
    let mut tasks = Vec::with_capacity(n);
    let mut previous: Option<TaskId> = None;
    for i in 0..n {
        let mut task = Task::new(swarm_id, format!("chain task {i}"));
        if let Some(dep) = previous {
            task = task.with_dependency(dep);
        }
        previous = Some(task.id);
        tasks.push(task);
    }
    tasks
}

fn bench_topological_sort(c: &mut Criterion) {
    let resolver = DependencyResolver::new();
    let mut group = c.benchmark_group("topological_sort");
    for &n in &[10usize, 100, 1_000] {
        let tasks = chain(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &tasks, |b, tasks| {
            b.iter(|| {
                let sorted = resolver.topological_sort(black_box(tasks)).unwrap();
                black_box(sorted);
            });
        });
    }
    group.finish();
}

fn bench_detect_cycle(c: &mut Criterion) {
    let resolver = DependencyResolver::new();
    let mut group = c.benchmark_group("detect_cycle");
    for &n in &[10usize, 100, 1_000] {
        let tasks = chain(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &tasks, |b, tasks| {
            b.iter(|| {
                black_box(resolver.detect_cycle(black_box(tasks)));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_topological_sort, bench_detect_cycle);
criterion_main!(benches);
