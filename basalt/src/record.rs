use std::rc::Rc;

use im_rc::Vector;

use crate::{Object, Value};

/// Staging buffer for record construction. Slot counts are fixed at
/// creation; `build` consumes the builder and fails if an object slot was
/// never assigned.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    values: Vec<Value>,
    objects: Vec<Option<Rc<Object>>>,
}

impl RecordBuilder {
    pub fn new(num_values: usize, num_objects: usize) -> Self {
        Self {
            values: vec![Value::default(); num_values],
            objects: vec![None; num_objects],
        }
    }

    pub fn set_value(&mut self, index: usize, value: Value) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn set_object(&mut self, index: usize, object: Rc<Object>) -> bool {
        match self.objects.get_mut(index) {
            Some(slot) => {
                *slot = Some(object);
                true
            }
            None => false,
        }
    }

    pub fn build(self) -> Option<Record> {
        let mut objects = Vector::new();
        for slot in self.objects {
            objects.push_back(slot?);
        }
        Some(Record {
            values: self.values.into_iter().collect(),
            objects,
        })
    }
}

/// Fixed-arity heterogeneous tuple: parallel persistent arrays of values and
/// objects, sized at construction and never resized. Field updates share
/// everything except the replaced slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub values: Vector<Value>,
    pub objects: Vector<Rc<Object>>,
}

impl Record {
    pub fn value(&self, index: usize) -> Option<Value> {
        self.values.get(index).copied()
    }

    pub fn object(&self, index: usize) -> Option<&Rc<Object>> {
        self.objects.get(index)
    }

    /// New record with one value slot replaced; `None` when the index is out
    /// of range (a compiler bug, not a program-visible error).
    pub fn with_value(&self, index: usize, new_value: Value) -> Option<Self> {
        if index >= self.values.len() {
            return None;
        }
        Some(Self {
            values: self.values.update(index, new_value),
            objects: self.objects.clone(),
        })
    }

    pub fn with_object(&self, index: usize, new_object: Rc<Object>) -> Option<Self> {
        if index >= self.objects.len() {
            return None;
        }
        Some(Self {
            values: self.values.clone(),
            objects: self.objects.update(index, new_object),
        })
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        let mut builder = RecordBuilder::new(2, 1);
        builder.set_value(0, Value::from(1));
        builder.set_value(1, Value::from(2));
        builder.set_object(0, Rc::new(Object::string("name")));
        builder.build().unwrap()
    }

    #[test]
    fn build_fails_on_unset_object_slot() {
        let builder = RecordBuilder::new(0, 1);
        assert!(builder.build().is_none());
    }

    #[test]
    fn with_value_shares_object_slots() {
        let record = sample();
        let updated = record.with_value(1, Value::from(9)).unwrap();
        assert_eq!(updated.value(0), Some(Value::from(1)));
        assert_eq!(updated.value(1), Some(Value::from(9)));
        assert_eq!(record.value(1), Some(Value::from(2)));
        // the object slot array is the same structure, untouched
        assert!(Rc::ptr_eq(updated.object(0).unwrap(), record.object(0).unwrap()));
    }

    #[test]
    fn with_value_out_of_range_is_rejected() {
        assert!(sample().with_value(2, Value::from(0)).is_none());
    }

    #[test]
    fn arity_is_preserved_across_updates() {
        let record = sample();
        let updated = record
            .with_object(0, Rc::new(Object::string("other")))
            .unwrap();
        assert_eq!(updated.num_values(), 2);
        assert_eq!(updated.num_objects(), 1);
    }

    #[test]
    fn equality_requires_equal_arity_and_fields() {
        assert_eq!(sample(), sample());
        let other = sample().with_value(0, Value::from(7)).unwrap();
        assert_ne!(sample(), other);
    }
}
