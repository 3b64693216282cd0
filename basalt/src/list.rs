use std::rc::Rc;

use im_rc::Vector;

use crate::{Object, Value};

/// Write-only staging buffer for list construction. `build` consumes the
/// builder, so a frozen builder cannot be touched again.
#[derive(Debug, Clone, Default)]
pub struct ListBuilder<T: Clone + PartialEq> {
    items: Vector<T>,
}

impl<T: Clone + PartialEq> ListBuilder<T> {
    pub fn new() -> Self {
        Self { items: Vector::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    pub fn build(self) -> List<T> {
        List { items: self.items }
    }
}

/// Persistent sequence backed by an RRB vector. Every update returns a new
/// list sharing all untouched structure with the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct List<T: Clone + PartialEq> {
    pub items: Vector<T>,
}

pub type ValueList = List<Value>;
pub type ObjectList = List<Rc<Object>>;
pub type ValueListBuilder = ListBuilder<Value>;
pub type ObjectListBuilder = ListBuilder<Rc<Object>>;

impl<T: Clone + PartialEq> List<T> {
    pub fn from_vector(items: Vector<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Replaces the element at `index`, or `None` when out of range.
    pub fn set(&self, index: usize, item: T) -> Option<Self> {
        if index >= self.items.len() {
            return None;
        }
        Some(Self { items: self.items.update(index, item) })
    }

    /// Inserts before `index`; `index == len` appends. `None` when out of
    /// range.
    pub fn insert(&self, index: usize, item: T) -> Option<Self> {
        if index > self.items.len() {
            return None;
        }
        let mut items = self.items.clone();
        items.insert(index, item);
        Some(Self { items })
    }

    /// Removes the element at `index`, or `None` when out of range.
    pub fn remove(&self, index: usize) -> Option<Self> {
        if index >= self.items.len() {
            return None;
        }
        let mut items = self.items.clone();
        items.remove(index);
        Some(Self { items })
    }

    /// Removes several indices at once. Indices are de-duplicated and
    /// removed in descending order so each removal's index is still valid
    /// against the partially reduced list. `None` when any index is out of
    /// range of the original list.
    pub fn remove_many(&self, indices: &[usize]) -> Option<Self> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        let mut items = self.items.clone();
        for &index in &sorted {
            if index >= items.len() {
                return None;
            }
            items.remove(index);
        }
        Some(Self { items })
    }

    pub fn iter(&self) -> im_rc::vector::Iter<'_, T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(nums: &[i64]) -> ValueList {
        let mut builder = ValueListBuilder::new();
        for &n in nums {
            builder.push(Value::from(n));
        }
        builder.build()
    }

    #[test]
    fn set_leaves_original_untouched() {
        let original = values(&[10, 20, 30]);
        let updated = original.set(1, Value::from(99)).unwrap();
        assert_eq!(original.get(1), Some(&Value::from(20)));
        assert_eq!(updated.get(1), Some(&Value::from(99)));
        assert_eq!(updated.get(0), original.get(0));
        assert_eq!(updated.get(2), original.get(2));
    }

    #[test]
    fn set_out_of_range_is_rejected() {
        let list = values(&[1, 2]);
        assert!(list.set(2, Value::from(3)).is_none());
    }

    #[test]
    fn insert_at_len_appends() {
        let list = values(&[1, 2]);
        let list = list.insert(2, Value::from(3)).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(2), Some(&Value::from(3)));
        assert!(list.insert(5, Value::from(9)).is_none());
    }

    #[test]
    fn remove_many_descends_and_dedups() {
        let list = values(&[0, 1, 2, 3, 4]);
        // {3, 1} must match removing 3 first, then 1.
        let a = list.remove_many(&[3, 1]).unwrap();
        let b = list.remove(3).unwrap().remove(1).unwrap();
        assert_eq!(a, b);
        // duplicates collapse to a single removal
        let c = list.remove_many(&[1, 3, 1]).unwrap();
        assert_eq!(a, c);
        assert_eq!(a, values(&[0, 2, 4]));
    }

    #[test]
    fn remove_many_rejects_out_of_range() {
        let list = values(&[1, 2, 3]);
        assert!(list.remove_many(&[0, 3]).is_none());
    }

    #[test]
    fn structural_equality_by_elements() {
        assert_eq!(values(&[1, 2, 3]), values(&[1, 2, 3]));
        assert_ne!(values(&[1, 2, 3]), values(&[1, 2]));
        assert_ne!(values(&[1, 2, 3]), values(&[1, 2, 4]));
    }
}
