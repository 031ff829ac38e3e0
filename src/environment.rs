use std::rc::Rc;

use indexmap::IndexMap;

use crate::{diagnostics::SemanticError, function::FunctionDefinition, value::Value};

/// Position of a binding: the display level that owns it and its index
/// within that level. Slots are what dereference and assignment nodes cache,
/// so a slot taken inside a function body addresses whichever activation
/// currently occupies that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub level: usize,
    pub index: usize,
}

/// One level of the display: variable bindings plus the functions defined
/// at this level.
#[derive(Debug, Default)]
pub struct Level {
    bindings: IndexMap<String, Option<Value>>,
    functions: IndexMap<String, Rc<FunctionDefinition>>,
}

/// Levels hidden by an activation, handed back to [`Display::exit`].
#[must_use = "a level entered must be exited"]
#[derive(Debug)]
pub struct Activation {
    level: usize,
    hidden: Vec<Level>,
}

/// The scope stack. Level 0 is global; a call to a function defined at
/// level `n - 1` runs its body at level `n`, hiding anything above.
#[derive(Debug)]
pub struct Display {
    levels: Vec<Level>,
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    pub fn new() -> Self {
        Self {
            levels: vec![Level::default()],
        }
    }

    /// Index of the innermost visible level.
    pub fn level(&self) -> usize {
        self.levels.len() - 1
    }

    /// Installs a fresh level at `level`, hiding the levels at and above it.
    pub fn enter(&mut self, level: usize) -> Activation {
        let level = level.min(self.levels.len());
        let hidden = self.levels.split_off(level);
        self.levels.push(Level::default());
        Activation { level, hidden }
    }

    /// Drops the activation's level and restores what it hid.
    pub fn exit(&mut self, activation: Activation) {
        self.levels.truncate(activation.level);
        self.levels.extend(activation.hidden);
    }

    fn current(&mut self) -> &mut Level {
        let level = self.level();
        &mut self.levels[level]
    }

    /// Creates (or re-creates) a binding with no value at the current level.
    pub fn define_variable(&mut self, name: &str) -> Slot {
        let level = self.level();
        let (index, _) = self.current().bindings.insert_full(name.to_string(), None);
        Slot { level, index }
    }

    pub fn find_reference(&self, name: &str) -> Option<Slot> {
        self.levels
            .iter()
            .enumerate()
            .rev()
            .find_map(|(level, scope)| {
                scope
                    .bindings
                    .get_index_of(name)
                    .map(|index| Slot { level, index })
            })
    }

    fn entry(&self, slot: Slot, name: &str) -> Option<&Option<Value>> {
        let scope = self.levels.get(slot.level)?;
        match scope.bindings.get_index(slot.index) {
            Some((bound, value)) if bound == name => Some(value),
            _ => scope.bindings.get(name),
        }
    }

    /// Current value of the binding `name` at `slot`, or `None` if it has
    /// not been assigned yet.
    pub fn value(&self, slot: Slot, name: &str) -> Option<&Value> {
        self.entry(slot, name).and_then(Option::as_ref)
    }

    /// Reads a binding through a cached slot.
    pub fn load(&self, slot: Slot, name: &str) -> Result<Value, SemanticError> {
        self.value(slot, name)
            .cloned()
            .ok_or_else(|| SemanticError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Writes through a cached slot. If the activation occupying the slot's
    /// level has not created that binding yet, it is defined by name there.
    pub fn store(&mut self, slot: Slot, name: &str, value: Value) {
        let Some(scope) = self.levels.get_mut(slot.level) else {
            self.current().bindings.insert(name.to_string(), Some(value));
            return;
        };
        match scope.bindings.get_index_mut(slot.index) {
            Some((bound, entry)) if bound == name => *entry = Some(value),
            _ => {
                scope.bindings.insert(name.to_string(), Some(value));
            }
        }
    }

    pub fn find_function(&self, name: &str) -> Option<Rc<FunctionDefinition>> {
        self.levels
            .iter()
            .rev()
            .find_map(|scope| scope.functions.get(name).cloned())
    }

    pub fn find_function_in_current_level(&self, name: &str) -> Option<Rc<FunctionDefinition>> {
        self.levels
            .last()
            .and_then(|scope| scope.functions.get(name).cloned())
    }

    pub fn add_function(&mut self, definition: Rc<FunctionDefinition>) {
        self.current()
            .functions
            .insert(definition.name.clone(), definition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;

    #[test]
    fn resolution_walks_outward() {
        let mut display = Display::new();
        let outer = display.define_variable("x");
        display.store(outer, "x", Value::Integer(1));

        let activation = display.enter(1);
        assert_eq!(display.level(), 1);
        assert_eq!(display.find_reference("x"), Some(outer));

        let inner = display.define_variable("x");
        display.store(inner, "x", Value::Integer(2));
        assert_eq!(display.find_reference("x"), Some(inner));
        assert_eq!(display.load(inner, "x").unwrap(), Value::Integer(2));

        display.exit(activation);
        assert_eq!(display.level(), 0);
        assert_eq!(display.find_reference("x"), Some(outer));
        assert_eq!(display.load(outer, "x").unwrap(), Value::Integer(1));
    }

    #[test]
    fn entering_a_shallower_level_hides_deeper_ones() {
        let mut display = Display::new();
        let first = display.enter(1);
        let y = display.define_variable("y");
        display.store(y, "y", Value::Boolean(true));

        let second = display.enter(1);
        assert_eq!(display.find_reference("y"), None);
        display.exit(second);

        assert_eq!(display.load(y, "y").unwrap(), Value::Boolean(true));
        display.exit(first);
        assert_eq!(display.level(), 0);
    }

    #[test]
    fn unset_binding_is_undefined() {
        let mut display = Display::new();
        let slot = display.define_variable("z");
        assert!(display.value(slot, "z").is_none());
        assert!(display.load(slot, "z").is_err());
    }

    #[test]
    fn store_defines_missing_binding_in_fresh_activation() {
        let mut display = Display::new();
        let first = display.enter(1);
        let _a = display.define_variable("a");
        let b = display.define_variable("b");
        display.exit(first);

        let second = display.enter(1);
        display.store(b, "b", Value::Integer(5));
        let found = display.find_reference("b").unwrap();
        assert_eq!(display.load(found, "b").unwrap(), Value::Integer(5));
        display.exit(second);
    }

    #[test]
    fn functions_are_scoped_to_their_level() {
        let mut ast = Ast::new();
        let body = ast.block(Vec::new());
        let mut display = Display::new();
        display.add_function(Rc::new(FunctionDefinition::new("f", body, 1)));

        let activation = display.enter(1);
        assert!(display.find_function("f").is_some());
        assert!(display.find_function_in_current_level("f").is_none());
        display.exit(activation);

        assert!(display.find_function_in_current_level("f").is_some());
        assert!(display.find_function("g").is_none());
    }
}
