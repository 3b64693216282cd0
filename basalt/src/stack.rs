use std::rc::Rc;

use crate::error::Fault;
use crate::{Object, Value};

/// The two fixed-capacity operand stacks, addressed by explicit cursors
/// rather than the host call stack. Cursors point at the first unused slot
/// and grow upward from 0. Object slots hold `None` when unused so popped
/// references are dropped promptly.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    values: Vec<Value>,
    objects: Vec<Option<Rc<Object>>>,
    value_cursor: usize,
    object_cursor: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutionStateInfo {
    pub value_stack_size: usize,
    pub object_stack_size: usize,
}

impl Default for ExecutionStateInfo {
    fn default() -> Self {
        Self {
            value_stack_size: 10_000,
            object_stack_size: 10_000,
        }
    }
}

impl ExecutionState {
    #[must_use]
    pub fn new(info: &ExecutionStateInfo) -> Self {
        Self {
            values: vec![Value::default(); info.value_stack_size],
            objects: vec![None; info.object_stack_size],
            value_cursor: 0,
            object_cursor: 0,
        }
    }

    pub fn value_cursor(&self) -> usize {
        self.value_cursor
    }

    pub fn object_cursor(&self) -> usize {
        self.object_cursor
    }

    pub fn push_value(&mut self, value: Value) -> Result<(), Fault> {
        let slot = self
            .values
            .get_mut(self.value_cursor)
            .ok_or(Fault::ValueStackOverflow)?;
        *slot = value;
        self.value_cursor += 1;
        Ok(())
    }

    pub fn pop_value(&mut self) -> Result<Value, Fault> {
        if self.value_cursor == 0 {
            return Err(Fault::ValueStackUnderflow);
        }
        self.value_cursor -= 1;
        Ok(self.values[self.value_cursor])
    }

    pub fn push_object(&mut self, object: Rc<Object>) -> Result<(), Fault> {
        let slot = self
            .objects
            .get_mut(self.object_cursor)
            .ok_or(Fault::ObjectStackOverflow)?;
        *slot = Some(object);
        self.object_cursor += 1;
        Ok(())
    }

    /// Advances the object cursor over an empty slot. Used where an
    /// instruction's stack effect requires a slot but no object exists, such
    /// as a failed map lookup.
    pub fn push_empty_object(&mut self) -> Result<(), Fault> {
        let slot = self
            .objects
            .get_mut(self.object_cursor)
            .ok_or(Fault::ObjectStackOverflow)?;
        *slot = None;
        self.object_cursor += 1;
        Ok(())
    }

    pub fn pop_object(&mut self) -> Result<Option<Rc<Object>>, Fault> {
        if self.object_cursor == 0 {
            return Err(Fault::ObjectStackUnderflow);
        }
        self.object_cursor -= 1;
        Ok(self.objects[self.object_cursor].take())
    }

    /// The nth value from the top of the stack, 0-indexed.
    pub fn value_nth(&self, n: usize) -> Result<Value, Fault> {
        if n >= self.value_cursor {
            return Err(Fault::ValueStackUnderflow);
        }
        Ok(self.values[self.value_cursor - 1 - n])
    }

    /// The nth object from the top of the stack, 0-indexed. An empty slot in
    /// the addressed position is a fault: every program-visible object
    /// operand must have been initialized.
    pub fn object_nth(&self, n: usize) -> Result<&Rc<Object>, Fault> {
        if n >= self.object_cursor {
            return Err(Fault::ObjectStackUnderflow);
        }
        let index = self.object_cursor - 1 - n;
        self.objects[index]
            .as_ref()
            .ok_or(Fault::EmptyObjectSlot(index))
    }

    pub fn swap_values(&mut self) -> Result<(), Fault> {
        if self.value_cursor < 2 {
            return Err(Fault::ValueStackUnderflow);
        }
        self.values.swap(self.value_cursor - 1, self.value_cursor - 2);
        Ok(())
    }

    pub fn swap_objects(&mut self) -> Result<(), Fault> {
        if self.object_cursor < 2 {
            return Err(Fault::ObjectStackUnderflow);
        }
        self.objects.swap(self.object_cursor - 1, self.object_cursor - 2);
        Ok(())
    }

    /// Frame-relative access, used for arguments and locals.
    pub fn value_at(&self, index: usize) -> Result<Value, Fault> {
        if index >= self.value_cursor {
            return Err(Fault::ValueStackUnderflow);
        }
        Ok(self.values[index])
    }

    pub fn set_value_at(&mut self, index: usize, value: Value) -> Result<(), Fault> {
        if index >= self.value_cursor {
            return Err(Fault::ValueStackUnderflow);
        }
        self.values[index] = value;
        Ok(())
    }

    pub fn object_at(&self, index: usize) -> Result<&Rc<Object>, Fault> {
        if index >= self.object_cursor {
            return Err(Fault::ObjectStackUnderflow);
        }
        self.objects[index]
            .as_ref()
            .ok_or(Fault::EmptyObjectSlot(index))
    }

    pub fn set_object_at(&mut self, index: usize, object: Option<Rc<Object>>) -> Result<(), Fault> {
        if index >= self.object_cursor {
            return Err(Fault::ObjectStackUnderflow);
        }
        self.objects[index] = object;
        Ok(())
    }

    /// Reserves `num_values`/`num_objects` local slots by advancing the
    /// cursors; values start at zero, object slots start empty.
    pub fn reserve_locals(&mut self, num_values: usize, num_objects: usize) -> Result<(), Fault> {
        if self.value_cursor + num_values > self.values.len() {
            return Err(Fault::ValueStackOverflow);
        }
        if self.object_cursor + num_objects > self.objects.len() {
            return Err(Fault::ObjectStackOverflow);
        }
        for slot in &mut self.values[self.value_cursor..self.value_cursor + num_values] {
            *slot = Value::default();
        }
        for slot in &mut self.objects[self.object_cursor..self.object_cursor + num_objects] {
            *slot = None;
        }
        self.value_cursor += num_values;
        self.object_cursor += num_objects;
        Ok(())
    }

    /// Discards value slots down to `cursor`, used when a frame unwinds.
    pub fn truncate_values(&mut self, cursor: usize) {
        debug_assert!(cursor <= self.value_cursor);
        self.value_cursor = cursor.min(self.value_cursor);
    }

    /// Discards object slots down to `cursor`, dropping their references.
    pub fn truncate_objects(&mut self, cursor: usize) {
        debug_assert!(cursor <= self.object_cursor);
        while self.object_cursor > cursor {
            self.object_cursor -= 1;
            self.objects[self.object_cursor] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_state() -> ExecutionState {
        ExecutionState::new(&ExecutionStateInfo {
            value_stack_size: 4,
            object_stack_size: 4,
        })
    }

    #[test]
    fn push_pop_round_trip() {
        let mut state = small_state();
        state.push_value(Value::from(1)).unwrap();
        state.push_value(Value::from(2)).unwrap();
        assert_eq!(state.value_nth(0).unwrap(), Value::from(2));
        assert_eq!(state.value_nth(1).unwrap(), Value::from(1));
        assert_eq!(state.pop_value().unwrap(), Value::from(2));
        assert_eq!(state.pop_value().unwrap(), Value::from(1));
        assert!(matches!(state.pop_value(), Err(Fault::ValueStackUnderflow)));
    }

    #[test]
    fn overflow_is_a_fault_not_a_panic() {
        let mut state = small_state();
        for i in 0..4 {
            state.push_value(Value::from(i)).unwrap();
        }
        assert!(matches!(
            state.push_value(Value::from(9)),
            Err(Fault::ValueStackOverflow)
        ));
    }

    #[test]
    fn popped_object_slot_is_cleared() {
        let mut state = small_state();
        let object = Rc::new(Object::string("x"));
        state.push_object(Rc::clone(&object)).unwrap();
        let popped = state.pop_object().unwrap().unwrap();
        assert!(Rc::ptr_eq(&popped, &object));
        drop(popped);
        // the stack no longer holds a reference
        assert_eq!(Rc::strong_count(&object), 1);
    }

    #[test]
    fn truncate_objects_drops_references() {
        let mut state = small_state();
        let object = Rc::new(Object::string("x"));
        state.push_object(Rc::clone(&object)).unwrap();
        state.push_object(Rc::clone(&object)).unwrap();
        state.truncate_objects(0);
        assert_eq!(state.object_cursor(), 0);
        assert_eq!(Rc::strong_count(&object), 1);
    }

    #[test]
    fn reserve_locals_zeroes_slots() {
        let mut state = small_state();
        state.push_value(Value::from(7)).unwrap();
        state.pop_value().unwrap();
        state.reserve_locals(1, 1).unwrap();
        assert_eq!(state.value_at(0).unwrap(), Value::default());
        assert!(matches!(state.object_nth(0), Err(Fault::EmptyObjectSlot(0))));
    }
}
