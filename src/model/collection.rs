//! Insertion-ordered containers of measure entities.
//!
//! Items are held behind [`Rc`]: the same entity may be shared into several
//! collections (a filter reusing an input point in its output). Mutable access
//! goes through [`Rc::make_mut`], so writing to a shared entity detaches a
//! private deep copy and other owners keep seeing the original.

use crate::error::{MocapError, Result};
use std::rc::Rc;

/// Entities that can be looked up by label
pub trait Labelled {
    fn label(&self) -> &str;
}

/// Ordered collection of measure entities.
///
/// Duplicate labels are allowed; label lookups return the first match.
#[derive(Debug)]
pub struct Collection<T> {
    items: Vec<Rc<T>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: PartialEq> PartialEq for Collection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Clone + Labelled> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an item
    pub fn insert_item(&mut self, item: T) {
        self.items.push(Rc::new(item));
    }

    /// Append an entity already owned elsewhere
    pub fn insert_shared(&mut self, item: Rc<T>) {
        self.items.push(item);
    }

    /// Insert at `idx`, shifting the following items
    pub fn insert_item_at(&mut self, idx: usize, item: T) -> Result<()> {
        if idx > self.items.len() {
            return Err(MocapError::out_of_range(idx, self.items.len()));
        }
        self.items.insert(idx, Rc::new(item));
        Ok(())
    }

    /// Remove the item at `idx`, shifting the following items
    pub fn remove_item(&mut self, idx: usize) -> Result<Rc<T>> {
        if idx >= self.items.len() {
            return Err(MocapError::out_of_range(idx, self.items.len()));
        }
        Ok(self.items.remove(idx))
    }

    pub fn item(&self, idx: usize) -> Result<&T> {
        self.items
            .get(idx)
            .map(Rc::as_ref)
            .ok_or_else(|| MocapError::out_of_range(idx, self.items.len()))
    }

    /// Mutable access; a shared item is detached first
    pub fn item_mut(&mut self, idx: usize) -> Result<&mut T> {
        let len = self.items.len();
        self.items
            .get_mut(idx)
            .map(Rc::make_mut)
            .ok_or_else(|| MocapError::out_of_range(idx, len))
    }

    /// Shared handle to the item at `idx`
    pub fn shared(&self, idx: usize) -> Result<Rc<T>> {
        self.items
            .get(idx)
            .cloned()
            .ok_or_else(|| MocapError::out_of_range(idx, self.items.len()))
    }

    /// Replace the item at `idx`
    pub fn set_item(&mut self, idx: usize, item: T) -> Result<()> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(idx)
            .ok_or_else(|| MocapError::out_of_range(idx, len))?;
        *slot = Rc::new(item);
        Ok(())
    }

    /// First item labelled `label`
    pub fn find_item(&self, label: &str) -> Option<&T> {
        self.items
            .iter()
            .map(Rc::as_ref)
            .find(|item| item.label() == label)
    }

    pub fn find_item_mut(&mut self, label: &str) -> Option<&mut T> {
        let idx = self.find_index(label)?;
        self.items.get_mut(idx).map(Rc::make_mut)
    }

    pub fn find_index(&self, label: &str) -> Option<usize> {
        self.items.iter().position(|item| item.label() == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(Rc::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut().map(Rc::make_mut)
    }

    pub fn labels(&self) -> Vec<String> {
        self.iter().map(|item| item.label().to_string()).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Point, PointType};

    fn points(labels: &[&str]) -> Collection<Point> {
        let mut c = Collection::new();
        for l in labels {
            c.insert_item(Point::new(*l, 2, PointType::Marker));
        }
        c
    }

    #[test]
    fn test_insert_and_get() {
        let c = points(&["A", "B", "C"]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.item(1).unwrap().label(), "B");
        assert!(matches!(c.item(3), Err(MocapError::OutOfRange { index: 3, len: 3 })));
    }

    #[test]
    fn test_remove_shifts() {
        let mut c = points(&["A", "B", "C"]);
        let removed = c.remove_item(0).unwrap();
        assert_eq!(removed.label(), "A");
        assert_eq!(c.labels(), vec!["B", "C"]);
        assert!(c.remove_item(5).is_err());
    }

    #[test]
    fn test_find_returns_first_match() {
        let mut c = points(&["A", "B"]);
        let mut dup = Point::new("A", 2, PointType::Angle);
        dup.set_description("second");
        c.insert_item(dup);
        assert_eq!(c.find_item("A").unwrap().point_type(), PointType::Marker);
        assert_eq!(c.find_index("B"), Some(1));
        assert!(c.find_item("Z").is_none());
    }

    #[test]
    fn test_shared_item_detaches_on_write() {
        let first = points(&["A"]);
        let mut second: Collection<Point> = Collection::new();
        second.insert_shared(first.shared(0).unwrap());
        second.item_mut(0).unwrap().set_value(0, [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(first.item(0).unwrap().value(0).unwrap(), [0.0; 3]);
        assert_eq!(second.item(0).unwrap().value(0).unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_insert_at() {
        let mut c = points(&["A", "C"]);
        c.insert_item_at(1, Point::new("B", 2, PointType::Marker)).unwrap();
        assert_eq!(c.labels(), vec!["A", "B", "C"]);
        assert!(c.insert_item_at(7, Point::new("X", 2, PointType::Marker)).is_err());
    }
}
