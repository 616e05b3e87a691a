//! Occurrence tree operations

use std::collections::HashSet;

use glam::Mat4;

use super::{Design, DesignError, DesignResult};
use crate::component::ComponentId;
use crate::occurrence::{Occurrence, OccurrenceId, OccurrencePath};

/// What a valid occurrence path resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathInfo {
    /// Component the first occurrence is placed in
    pub context: ComponentId,
    /// Component instantiated by the last occurrence
    pub leaf: ComponentId,
    /// Composed transform from the leaf component into the context component
    pub transform: Mat4,
}

impl Design {
    /// Get an occurrence by ID
    pub fn occurrence(&self, id: OccurrenceId) -> Option<&Occurrence> {
        self.occurrences.get(&id)
    }

    /// Place an occurrence of `component` inside `parent`
    pub fn add_occurrence(
        &mut self,
        parent: ComponentId,
        component: ComponentId,
        name: impl Into<String>,
        transform: Mat4,
    ) -> DesignResult<OccurrenceId> {
        if !self.components.contains_key(&parent) {
            return Err(DesignError::ComponentNotFound(parent));
        }
        if !self.components.contains_key(&component) {
            return Err(DesignError::ComponentNotFound(component));
        }
        if component == self.root {
            return Err(DesignError::CannotInstantiateRoot);
        }
        if self.contains_component(component, parent) {
            return Err(DesignError::WouldCreateCycle);
        }

        let occurrence = Occurrence {
            id: OccurrenceId::new(),
            name: name.into(),
            parent,
            component,
            transform,
        };
        let id = occurrence.id;
        tracing::debug!("Added occurrence {} ({})", occurrence.name, id);

        if let Some(parent) = self.components.get_mut(&parent) {
            parent.occurrences.push(id);
        }
        self.occurrences.insert(id, occurrence);
        self.touch();
        Ok(id)
    }

    /// Remove an occurrence; paths through it stop resolving
    pub fn remove_occurrence(&mut self, id: OccurrenceId) -> DesignResult<Occurrence> {
        let occurrence = self
            .occurrences
            .remove(&id)
            .ok_or(DesignError::OccurrenceNotFound(id))?;
        if let Some(parent) = self.components.get_mut(&occurrence.parent) {
            parent.occurrences.retain(|o| *o != id);
        }
        tracing::debug!("Removed occurrence {} ({})", occurrence.name, id);
        self.touch();
        Ok(occurrence)
    }

    /// Move an occurrence within its parent
    pub fn set_occurrence_transform(
        &mut self,
        id: OccurrenceId,
        transform: Mat4,
    ) -> DesignResult<()> {
        let occurrence = self
            .occurrences
            .get_mut(&id)
            .ok_or(DesignError::OccurrenceNotFound(id))?;
        occurrence.transform = transform;
        self.touch();
        Ok(())
    }

    /// Whether `outer` is `target` or instantiates it at any depth
    pub(super) fn contains_component(&self, outer: ComponentId, target: ComponentId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![outer];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(component) = self.components.get(&current) {
                stack.extend(
                    component
                        .occurrences
                        .iter()
                        .filter_map(|o| self.occurrences.get(o))
                        .map(|o| o.component),
                );
            }
        }
        false
    }

    /// Resolve a non-empty path, or None if any link is missing or broken
    pub fn resolve_path(&self, path: &OccurrencePath) -> Option<PathInfo> {
        let mut ids = path.ids().iter();
        let first = self.occurrences.get(ids.next()?)?;

        let mut info = PathInfo {
            context: first.parent,
            leaf: first.component,
            transform: first.transform,
        };
        for id in ids {
            let occurrence = self.occurrences.get(id)?;
            if occurrence.parent != info.leaf {
                return None;
            }
            info.leaf = occurrence.component;
            info.transform *= occurrence.transform;
        }
        Some(info)
    }

    /// Transform of a path; identity for the native path
    pub fn path_transform(&self, path: &OccurrencePath) -> Option<Mat4> {
        if path.is_empty() {
            return Some(Mat4::IDENTITY);
        }
        self.resolve_path(path).map(|info| info.transform)
    }

    /// Every full path from the root at which `component` is instantiated
    pub fn instance_paths(&self, component: ComponentId) -> Vec<OccurrencePath> {
        let mut result = Vec::new();
        self.collect_instance_paths(self.root, &OccurrencePath::native(), component, &mut result);
        result
    }

    fn collect_instance_paths(
        &self,
        current: ComponentId,
        prefix: &OccurrencePath,
        target: ComponentId,
        result: &mut Vec<OccurrencePath>,
    ) {
        let Some(definition) = self.components.get(&current) else {
            return;
        };
        for id in &definition.occurrences {
            let Some(occurrence) = self.occurrences.get(id) else {
                continue;
            };
            let path = prefix.child(*id);
            if occurrence.component == target {
                result.push(path.clone());
            }
            self.collect_instance_paths(occurrence.component, &path, target, result);
        }
    }
}
