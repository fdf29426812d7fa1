//! Named operations attached to a repository at runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use folio_types::Value;

use crate::error::EntriesResult;
use crate::repository::Entries;

/// A callable registered under a name and invoked through [`Entries::call`].
pub type Operation = Arc<dyn Fn(&Entries, &[Value]) -> EntriesResult<Value> + Send + Sync>;

/// Wrap a closure as an [`Operation`].
pub fn operation<F>(f: F) -> Operation
where
    F: Fn(&Entries, &[Value]) -> EntriesResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A bundle of operations imported in one step.
pub trait CapabilityProvider {
    /// Name/operation pairs; later pairs win over earlier ones.
    fn operations(&self) -> Vec<(String, Operation)>;
}

/// Name to operation mapping. Registering an existing name replaces it.
#[derive(Clone, Default)]
pub struct OperationTable {
    ops: BTreeMap<String, Operation>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `op` under `name`, returning the operation it replaced.
    pub fn register(&mut self, name: impl Into<String>, op: Operation) -> Option<Operation> {
        self.ops.insert(name.into(), op)
    }

    /// Copy every operation from `provider`; returns how many were imported.
    pub fn import(&mut self, provider: &dyn CapabilityProvider) -> usize {
        let ops = provider.operations();
        let count = ops.len();
        for (name, op) in ops {
            self.ops.insert(name, op);
        }
        count
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ops.keys()).finish()
    }
}
