//! Task dependency graph validation: cycle detection and topological
//! ordering, used by the Scheduler before a task is admitted to a swarm
//! (§4.5) and by the Coordinator when a new task is submitted.

use std::collections::{HashMap, HashSet};

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{Task, TaskId};

#[derive(Debug, Clone, Default)]
pub struct DependencyResolver;

fn detect_cycle_util(
    node: TaskId,
    graph: &HashMap<TaskId, Vec<TaskId>>,
    visited: &mut HashSet<TaskId>,
    rec_stack: &mut HashSet<TaskId>,
) -> Option<TaskId> {
    visited.insert(node);
    rec_stack.insert(node);

    if let Some(neighbors) = graph.get(&node) {
        for &neighbor in neighbors {
            if !visited.contains(&neighbor) {
                if let Some(cycle_node) = detect_cycle_util(neighbor, graph, visited, rec_stack) {
                    return Some(cycle_node);
                }
            } else if rec_stack.contains(&neighbor) {
                return Some(neighbor);
            }
        }
    }

    rec_stack.remove(&node);
    None
}

impl DependencyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Checks that every dependency id refers to a task present in
    /// `available_tasks`, returning `UnknownDependency` for the first one
    /// that doesn't.
    pub fn validate_dependencies(
        &self,
        task: &Task,
        available_tasks: &[Task],
    ) -> CoordinatorResult<()> {
        let available_ids: HashSet<TaskId> = available_tasks.iter().map(|t| t.id).collect();

        for &dep_id in &task.dependencies {
            if dep_id != task.id && !available_ids.contains(&dep_id) {
                return Err(CoordinatorError::UnknownDependency(dep_id.0));
            }
        }
        Ok(())
    }

    /// Detects a cycle in the dependency graph formed by `tasks`, returning
    /// the id of a task that participates in it.
    #[must_use]
    pub fn detect_cycle(&self, tasks: &[Task]) -> Option<TaskId> {
        let mut graph: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for task in tasks {
            graph
                .entry(task.id)
                .or_default()
                .extend(task.dependencies.iter().copied());
        }

        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for &task_id in graph.keys() {
            if !visited.contains(&task_id) {
                if let Some(cycle_node) =
                    detect_cycle_util(task_id, &graph, &mut visited, &mut rec_stack)
                {
                    return Some(cycle_node);
                }
            }
        }

        None
    }

    /// Orders `tasks` so that every task's dependencies precede it
    /// (Kahn's algorithm). Fails with `CyclicDependency` if the graph has a
    /// cycle.
    pub fn topological_sort(&self, tasks: &[Task]) -> CoordinatorResult<Vec<Task>> {
        if let Some(cycle_node) = self.detect_cycle(tasks) {
            return Err(CoordinatorError::CyclicDependency(cycle_node.0));
        }

        let mut task_map: HashMap<TaskId, Task> =
            tasks.iter().map(|t| (t.id, t.clone())).collect();
        let mut in_degree: HashMap<TaskId, usize> = HashMap::new();
        let mut graph: HashMap<TaskId, Vec<TaskId>> = HashMap::new();

        for task in tasks {
            in_degree.entry(task.id).or_insert(0);
            for &dep_id in &task.dependencies {
                graph.entry(dep_id).or_default().push(task.id);
                *in_degree.entry(task.id).or_insert(0) += 1;
            }
        }

        let mut queue: Vec<TaskId> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut sorted = Vec::new();
        while let Some(node_id) = queue.pop() {
            if let Some(task) = task_map.remove(&node_id) {
                sorted.push(task);
            }
            if let Some(neighbors) = graph.get(&node_id) {
                for &neighbor in neighbors {
                    if let Some(degree) = in_degree.get_mut(&neighbor) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push(neighbor);
                        }
                    }
                }
            }
        }

        if sorted.len() != tasks.len() {
            return Err(CoordinatorError::InternalInvariant(
                "topological sort left tasks unresolved".into(),
            ));
        }

        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SwarmId;

    fn task_with_deps(deps: &[TaskId]) -> Task {
        let mut task = Task::new(SwarmId::new(), "t");
        for &d in deps {
            task = task.with_dependency(d);
        }
        task
    }

    #[test]
    fn validate_dependencies_accepts_present_ids() {
        let resolver = DependencyResolver::new();
        let t1 = task_with_deps(&[]);
        let t2 = task_with_deps(&[t1.id]);
        assert!(resolver.validate_dependencies(&t2, &[t1]).is_ok());
    }

    #[test]
    fn validate_dependencies_rejects_unknown_ids() {
        let resolver = DependencyResolver::new();
        let missing = TaskId::new();
        let t = task_with_deps(&[missing]);
        assert!(matches!(
            resolver.validate_dependencies(&t, &[]),
            Err(CoordinatorError::UnknownDependency(_))
        ));
    }

    #[test]
    fn detect_cycle_finds_a_two_node_cycle() {
        let resolver = DependencyResolver::new();
        let mut t1 = task_with_deps(&[]);
        let mut t2 = task_with_deps(&[]);
        t1.dependencies.insert(t2.id);
        t2.dependencies.insert(t1.id);
        assert!(resolver.detect_cycle(&[t1, t2]).is_some());
    }

    #[test]
    fn topological_sort_orders_dependencies_first() {
        let resolver = DependencyResolver::new();
        let t1 = task_with_deps(&[]);
        let t2 = task_with_deps(&[t1.id]);
        let t3 = task_with_deps(&[t2.id]);

        let sorted = resolver
            .topological_sort(&[t3.clone(), t1.clone(), t2.clone()])
            .unwrap();

        assert_eq!(sorted[0].id, t1.id);
        assert_eq!(sorted[1].id, t2.id);
        assert_eq!(sorted[2].id, t3.id);
    }

    #[test]
    fn topological_sort_rejects_a_cycle() {
        let resolver = DependencyResolver::new();
        let mut t1 = task_with_deps(&[]);
        let mut t2 = task_with_deps(&[]);
        t1.dependencies.insert(t2.id);
        t2.dependencies.insert(t1.id);
        assert!(matches!(
            resolver.topological_sort(&[t1, t2]),
            Err(CoordinatorError::CyclicDependency(_))
        ));
    }
}
