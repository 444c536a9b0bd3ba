use std::{collections::BTreeMap, collections::HashMap, fmt, sync::Arc};

use tera::{Function, Tera, Value};

/// Named template functions shared by every parse of the template set.
///
/// Cloning is cheap; the functions themselves are reference counted so a
/// reload registers the very same callables again.
#[derive(Clone, Default)]
pub struct FunctionMap {
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl FunctionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Function + 'static,
    {
        self.insert(name, function);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Function + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub(crate) fn register_into(&self, tera: &mut Tera) {
        for (name, function) in &self.functions {
            tera.register_function(name, SharedFunction(Arc::clone(function)));
        }
    }
}

impl fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

struct SharedFunction(Arc<dyn Function>);

impl Function for SharedFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}
