use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::config::TaskDefinition;
use crate::error::{PlanError, ResolveError};

/// Outcome of dependency resolution. A non-empty `errors` aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub ordered: Vec<String>,
    pub errors: Vec<ResolveError>,
}

impl ResolvedOrder {
    pub fn into_result(self) -> Result<Vec<String>, PlanError> {
        if self.errors.is_empty() {
            Ok(self.ordered)
        } else {
            Err(PlanError(self.errors))
        }
    }
}

/// Dependency graph over task indices in declaration order.
#[derive(Debug, Clone)]
struct TaskGraph<'a> {
    ids: Vec<&'a str>,
    /// deps[i]: indices task i waits for (deduplicated)
    deps: Vec<Vec<usize>>,
    /// dependents[i]: indices waiting for task i
    dependents: Vec<Vec<usize>>,
}

impl<'a> TaskGraph<'a> {
    fn from_tasks(tasks: &'a [TaskDefinition], errors: &mut Vec<ResolveError>) -> Self {
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut deps = vec![Vec::new(); tasks.len()];
        let mut dependents = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            let mut seen = HashSet::new();
            for dep in &task.depends_on {
                match index.get(dep.as_str()) {
                    Some(&d) => {
                        if seen.insert(d) {
                            deps[i].push(d);
                            dependents[d].push(i);
                        }
                    }
                    None => errors.push(ResolveError::UnknownDependency {
                        task_id: task.id.clone(),
                        missing_dep: dep.clone(),
                    }),
                }
            }
        }

        Self {
            ids,
            deps,
            dependents,
        }
    }

    /// Kahn's algorithm with a min-index ready set: among ready tasks the
    /// earliest declared one is emitted first. Returns the order and the
    /// indices left unresolved.
    fn stable_sort(&self) -> (Vec<usize>, Vec<usize>) {
        let mut in_degree: Vec<usize> = self.deps.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut ordered = Vec::with_capacity(self.ids.len());
        while let Some(Reverse(next)) = ready.pop() {
            ordered.push(next);
            for &dependent in &self.dependents[next] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        let residue = (0..self.ids.len())
            .filter(|i| in_degree[*i] > 0)
            .collect();
        (ordered, residue)
    }

    /// One concrete cycle among the unresolved tasks, as `a -> b -> a`.
    fn describe_cycle(&self, residue: &[usize]) -> String {
        let in_residue: HashSet<usize> = residue.iter().copied().collect();
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for &start in residue {
            if !visited.contains(&start)
                && self.dfs_cycle(start, &in_residue, &mut visited, &mut stack)
            {
                return stack
                    .iter()
                    .map(|&i| self.ids[i])
                    .collect::<Vec<_>>()
                    .join(" -> ");
            }
        }

        residue
            .iter()
            .map(|&i| self.ids[i])
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn dfs_cycle(
        &self,
        node: usize,
        in_residue: &HashSet<usize>,
        visited: &mut HashSet<usize>,
        stack: &mut Vec<usize>,
    ) -> bool {
        visited.insert(node);
        stack.push(node);

        for &dep in &self.deps[node] {
            if !in_residue.contains(&dep) {
                continue;
            }
            if let Some(pos) = stack.iter().position(|&x| x == dep) {
                stack.push(dep);
                *stack = stack[pos..].to_vec();
                return true;
            }
            if !visited.contains(&dep) && self.dfs_cycle(dep, in_residue, visited, stack) {
                return true;
            }
        }

        stack.pop();
        false
    }
}

/// Orders tasks so every task follows its dependencies, ties broken by
/// declaration order. Without any `dependsOn` the declaration order is returned as is.
pub fn order_tasks(tasks: &[TaskDefinition]) -> ResolvedOrder {
    if tasks.iter().all(|t| t.depends_on.is_empty()) {
        return ResolvedOrder {
            ordered: tasks.iter().map(|t| t.id.clone()).collect(),
            errors: Vec::new(),
        };
    }

    let mut errors = Vec::new();
    let graph = TaskGraph::from_tasks(tasks, &mut errors);
    let (ordered, residue) = graph.stable_sort();
    if !residue.is_empty() {
        errors.push(ResolveError::CircularDependency(
            graph.describe_cycle(&residue),
        ));
    }

    ResolvedOrder {
        ordered: ordered.into_iter().map(|i| tasks[i].id.clone()).collect(),
        errors,
    }
}
