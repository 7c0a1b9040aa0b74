//! Pipeline builder with validation.

use super::Pipeline;
use crate::config::ExecutionConfig;
use crate::definitions::{DefinitionRegistry, OpDefinition};
use crate::errors::{
    ContractErrorInfo, CycleDetectedError, OpflowError, PipelineValidationError, RegistryError,
};
use crate::invocation::{InvocationResolver, InvocationSpec, ResolvedInvocation};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::info;

/// Builder for creating validated pipelines.
///
/// Definitions and invocation specs are collected first; nothing is
/// resolved until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// Definitions available to the invocations.
    registry: DefinitionRegistry,
    /// Invocation specs in authoring order.
    invocations: Vec<InvocationSpec>,
    /// Executor settings.
    config: ExecutionConfig,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: DefinitionRegistry::new(),
            invocations: Vec::new(),
            config: ExecutionConfig::default(),
        }
    }

    /// Uses an existing registry of definitions.
    #[must_use]
    pub fn with_registry(mut self, registry: DefinitionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the executor settings.
    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already registered.
    pub fn definition(mut self, definition: OpDefinition) -> Result<Self, RegistryError> {
        self.add_definition(definition)?;
        Ok(self)
    }

    /// Registers a definition in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already registered.
    pub fn add_definition(&mut self, definition: OpDefinition) -> Result<(), RegistryError> {
        self.registry.register(definition)
    }

    /// Appends an invocation spec.
    #[must_use]
    pub fn invoke(mut self, spec: InvocationSpec) -> Self {
        self.add_invocation(spec);
        self
    }

    /// Appends an invocation spec in place.
    pub fn add_invocation(&mut self, spec: InvocationSpec) {
        self.invocations.push(spec);
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of invocation specs collected so far.
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.invocations.len()
    }

    /// Resolves every invocation and validates the dependency graph.
    ///
    /// # Errors
    ///
    /// - [`OpflowError::Validation`] for an empty name, no invocations, or an
    ///   upstream that names no invocation of this pipeline;
    /// - [`OpflowError::UnknownDefinition`], [`OpflowError::DuplicateIdentity`]
    ///   or [`OpflowError::InvalidName`] from resolution;
    /// - [`OpflowError::CycleDetected`] if invocations depend on each other
    ///   in a loop.
    pub fn build(self) -> Result<Pipeline, OpflowError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Pipeline name cannot be empty or whitespace-only",
            )
            .into());
        }

        if self.invocations.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{}' has no invocations",
                self.name
            ))
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-004-EMPTY", "Cannot build an empty pipeline")
                    .with_suggested_fix(),
            )
            .into());
        }

        let resolved = InvocationResolver::new(&self.registry).resolve(&self.invocations)?;

        validate_dependencies(&resolved)?;
        detect_cycles(&resolved)?;
        let execution_order = topological_order(&resolved);

        info!(
            pipeline = %self.name,
            invocations = resolved.len(),
            definitions = self.registry.len(),
            "Built pipeline"
        );

        Ok(Pipeline::new(
            self.name,
            resolved.into_iter().map(Arc::new).collect(),
            execution_order,
            self.config,
        ))
    }
}

/// Checks that every upstream names an invocation of the pipeline.
fn validate_dependencies(resolved: &[ResolvedInvocation]) -> Result<(), PipelineValidationError> {
    let identities: HashSet<&str> = resolved.iter().map(ResolvedInvocation::identity).collect();

    for invocation in resolved {
        for dep in invocation.depends_on() {
            if !identities.contains(dep.as_str()) {
                return Err(PipelineValidationError::new(format!(
                    "Invocation '{}' depends on unknown invocation '{}'",
                    invocation.identity(),
                    dep
                ))
                .with_invocations(vec![invocation.identity().to_string(), dep.clone()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-004-MISSING_DEP",
                        format!("Dependency '{dep}' not found"),
                    )
                    .with_suggested_fix(),
                ));
            }
        }
    }

    Ok(())
}

/// Detects cycles, including an invocation depending on itself.
fn detect_cycles(resolved: &[ResolvedInvocation]) -> Result<(), CycleDetectedError> {
    let edges: HashMap<&str, &[String]> = resolved
        .iter()
        .map(|r| (r.identity(), r.depends_on()))
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for invocation in resolved {
        let node = invocation.identity();
        if !visited.contains(node) {
            if let Some(cycle) = dfs_cycle(node, &edges, &mut visited, &mut rec_stack, &mut path) {
                return Err(CycleDetectedError::new(cycle));
            }
        }
    }

    Ok(())
}

fn dfs_cycle<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, &'a [String]>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(&deps) = edges.get(node) {
        for dep in deps.iter().map(String::as_str) {
            if rec_stack.contains(dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| (*s).to_string()).collect();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
            if !visited.contains(dep) {
                if let Some(cycle) = dfs_cycle(dep, edges, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}

/// Orders invocations so upstreams come first; ties keep authoring order.
fn topological_order(resolved: &[ResolvedInvocation]) -> Vec<String> {
    let position: HashMap<&str, usize> = resolved
        .iter()
        .enumerate()
        .map(|(i, r)| (r.identity(), i))
        .collect();

    let mut in_degree: Vec<usize> = resolved
        .iter()
        .map(|r| r.depends_on().iter().collect::<HashSet<_>>().len())
        .collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); resolved.len()];
    for (i, invocation) in resolved.iter().enumerate() {
        let unique: HashSet<&String> = invocation.depends_on().iter().collect();
        for dep in unique {
            if let Some(&j) = position.get(dep.as_str()) {
                dependents[j].push(i);
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..resolved.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(resolved.len());

    while let Some(i) = ready.pop_front() {
        order.push(resolved[i].identity().to_string());
        let mut released = Vec::new();
        for &child in &dependents[i] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                released.push(child);
            }
        }
        released.sort_unstable();
        ready.extend(released);
    }

    order
}
