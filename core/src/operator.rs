mod navigation;

pub use navigation::NavigationOperator;

use crate::input::InputEvent;
use crate::scene::Scene;

/// Unique identifier for an operator.
pub type OperatorId = u32;

/// Operators encapsulate interaction logic and manage their own state.
///
/// The [`OperatorManager`] offers each input event to its operators in
/// priority order until one of them consumes it.
pub trait Operator {
    /// Get the unique ID for this operator.
    fn id(&self) -> OperatorId;

    /// Get a human-readable name for this operator.
    fn name(&self) -> &str;

    /// Reacts to an input event. Returns `true` if the event was consumed and
    /// should not reach lower-priority operators.
    fn handle_event(&mut self, event: &InputEvent, scene: &mut Scene) -> bool;
}

/// Manages a collection of operators and the order they see events in.
///
/// Operators at the front of the stack receive events first.
#[derive(Default)]
pub struct OperatorManager {
    operators: Vec<Box<dyn Operator>>,
}

impl OperatorManager {
    /// Creates a new empty operator manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operator to the front of the stack (highest priority).
    pub fn push_front(&mut self, operator: Box<dyn Operator>) {
        self.operators.insert(0, operator);
    }

    /// Adds an operator to the back of the stack (lowest priority).
    pub fn push_back(&mut self, operator: Box<dyn Operator>) {
        self.operators.push(operator);
    }

    /// Removes an operator by ID and hands it back.
    pub fn remove(&mut self, id: OperatorId) -> Option<Box<dyn Operator>> {
        let pos = self.position(id)?;
        Some(self.operators.remove(pos))
    }

    /// Moves an operator to the front of the stack (highest priority).
    ///
    /// Returns `true` if the operator was found and moved.
    pub fn move_to_front(&mut self, id: OperatorId) -> bool {
        match self.position(id) {
            Some(pos) => {
                let operator = self.operators.remove(pos);
                self.operators.insert(0, operator);
                true
            }
            None => false,
        }
    }

    /// Moves an operator to the back of the stack (lowest priority).
    ///
    /// Returns `true` if the operator was found and moved.
    pub fn move_to_back(&mut self, id: OperatorId) -> bool {
        match self.position(id) {
            Some(pos) => {
                let operator = self.operators.remove(pos);
                self.operators.push(operator);
                true
            }
            None => false,
        }
    }

    /// Offers `event` to each operator front to back, stopping at the first
    /// that consumes it. Returns whether any operator did.
    pub fn dispatch(&mut self, event: &InputEvent, scene: &mut Scene) -> bool {
        for operator in self.operators.iter_mut() {
            if operator.handle_event(event, scene) {
                log::trace!("{:?} consumed by operator {}", event, operator.name());
                return true;
            }
        }
        false
    }

    /// Returns the number of operators.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Returns `true` if the manager is empty
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Returns an iterator over the operators in priority order (front to back).
    pub fn iter(&self) -> impl Iterator<Item = &dyn Operator> {
        self.operators.iter().map(|op| op.as_ref())
    }

    /// Returns the position of an operator in the stack by ID.
    ///
    /// Position 0 is the front (highest priority).
    pub fn position(&self, id: OperatorId) -> Option<usize> {
        self.operators.iter().position(|op| op.id() == id)
    }
}
