//! Stage dependency graph.
//!
//! The runner walks stages in declaration order and only checks direct
//! dependencies. This graph is used to validate definitions up front: it finds
//! cycles and yields a topological order that callers can compare against the
//! declared one.

use super::PipelineConfig;
use crate::errors::CycleDetectedError;
use std::collections::{HashMap, HashSet, VecDeque};

/// A directed graph of stage dependencies.
#[derive(Debug, Clone)]
pub struct StageGraph {
    /// Stage names in declaration order.
    order: Vec<String>,
    /// Known dependencies of each stage (unknown names dropped).
    dependencies: HashMap<String, Vec<String>>,
}

impl StageGraph {
    /// Builds the graph for a pipeline. Dependencies naming stages that do not
    /// exist are left out of the graph.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let known: HashSet<&str> = config.stages.iter().map(|s| s.name.as_str()).collect();
        let order = config.stages.iter().map(|s| s.name.clone()).collect();
        let dependencies = config
            .stages
            .iter()
            .map(|stage| {
                let deps = stage
                    .dependencies
                    .iter()
                    .filter(|dep| known.contains(dep.as_str()))
                    .cloned()
                    .collect();
                (stage.name.clone(), deps)
            })
            .collect();

        Self { order, dependencies }
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the known dependencies of a stage.
    #[must_use]
    pub fn dependencies_of(&self, stage: &str) -> &[String] {
        self.dependencies.get(stage).map_or(&[], Vec::as_slice)
    }

    /// Finds a dependency cycle, if one exists.
    #[must_use]
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in &self.order {
            if !visited.contains(name) {
                if let Some(cycle) = self.dfs_cycle(name, &mut visited, &mut rec_stack, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        for dep in self.dependencies_of(node) {
            if !visited.contains(dep) {
                if let Some(cycle) = self.dfs_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(dep) {
                let start = path.iter().position(|n| n == dep).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }

    /// Returns a topological order (Kahn's algorithm), breaking ties by
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Returns the cycle if the graph is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<String>, CycleDetectedError> {
        if let Some(cycle) = self.detect_cycle() {
            return Err(CycleDetectedError::new(cycle));
        }

        let mut in_degree: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|name| (name.as_str(), self.dependencies_of(name).len()))
            .collect();

        let mut ready: VecDeque<&str> = self
            .order
            .iter()
            .filter(|name| in_degree.get(name.as_str()) == Some(&0))
            .map(String::as_str)
            .collect();

        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(current) = ready.pop_front() {
            sorted.push(current.to_string());
            for child in &self.order {
                if self.dependencies_of(child).iter().any(|d| d == current) {
                    if let Some(count) = in_degree.get_mut(child.as_str()) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            ready.push_back(child.as_str());
                        }
                    }
                }
            }
        }

        Ok(sorted)
    }

    /// Returns true if every stage is declared after all of its dependencies,
    /// which is what the declaration-order runner needs for dependents to run.
    #[must_use]
    pub fn is_declaration_order_valid(&self) -> bool {
        let mut seen = HashSet::new();
        for name in &self.order {
            if self.dependencies_of(name).iter().any(|dep| !seen.contains(dep.as_str())) {
                return false;
            }
            seen.insert(name.as_str());
        }
        true
    }
}
