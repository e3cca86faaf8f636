//! Name to state dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::process::state::State;

/// The closed set of states a saga can be in.
///
/// Built once during wiring; a process looks states up by the name stored in
/// its context, which is what lets a saga resume after a restart.
pub struct StateRegistry {
    states: HashMap<&'static str, Arc<dyn State>>,
    start_state: &'static str,
    failed_state: &'static str,
}

impl StateRegistry {
    /// Starts building a registry.
    pub fn builder() -> StateRegistryBuilder {
        StateRegistryBuilder::default()
    }

    /// Looks up a state by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn State>> {
        self.states.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Name of the state new sagas start in.
    pub fn start_state(&self) -> &'static str {
        self.start_state
    }

    /// Name of the state failed sagas end in.
    pub fn failed_state(&self) -> &'static str {
        self.failed_state
    }

    /// Registered state names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.states.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRegistry")
            .field("states", &self.names())
            .field("start_state", &self.start_state)
            .field("failed_state", &self.failed_state)
            .finish()
    }
}

/// Builder for [`StateRegistry`].
#[derive(Default)]
pub struct StateRegistryBuilder {
    states: Vec<Arc<dyn State>>,
    start_state: Option<&'static str>,
    failed_state: Option<&'static str>,
}

impl StateRegistryBuilder {
    /// Registers a state.
    pub fn register(mut self, state: impl State + 'static) -> Self {
        self.states.push(Arc::new(state));
        self
    }

    /// Sets the state new sagas start in.
    pub fn start_state(mut self, name: &'static str) -> Self {
        self.start_state = Some(name);
        self
    }

    /// Sets the final state failed sagas end in.
    pub fn failed_state(mut self, name: &'static str) -> Self {
        self.failed_state = Some(name);
        self
    }

    /// Validates and builds the registry.
    pub fn build(self) -> Result<StateRegistry, RegistryError> {
        let mut states: HashMap<&'static str, Arc<dyn State>> = HashMap::new();
        for state in self.states {
            let name = state.name();
            if states.insert(name, state).is_some() {
                return Err(RegistryError::DuplicateState(name.to_string()));
            }
        }

        let start_state = self.start_state.ok_or(RegistryError::MissingStartState)?;
        if !states.contains_key(start_state) {
            return Err(RegistryError::UnknownState(start_state.to_string()));
        }

        let failed_state = self.failed_state.ok_or(RegistryError::MissingFailedState)?;
        match states.get(failed_state) {
            None => return Err(RegistryError::UnknownState(failed_state.to_string())),
            Some(state) if !state.is_final() => {
                return Err(RegistryError::FailedStateNotFinal(failed_state.to_string()));
            }
            Some(_) => {}
        }

        Ok(StateRegistry {
            states,
            start_state,
            failed_state,
        })
    }
}
