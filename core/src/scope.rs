//! Request-scoped values keyed by their type.
//!
//! A host puts values here before notifying listeners (for example the
//! caller's identity), and listeners read them back by type.

use std::any::{Any, TypeId};
use std::collections::HashMap;

#[derive(Default)]
pub struct Scope {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning the value of the same type it replaced.
    pub fn put<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.entries
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(unbox)
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.entries.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.entries.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn take<T: 'static>(&mut self) -> Option<T> {
        self.entries.remove(&TypeId::of::<T>()).and_then(unbox)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unbox<T: 'static>(boxed: Box<dyn Any + Send + Sync>) -> Option<T> {
    boxed.downcast().ok().map(|value| *value)
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("len", &self.entries.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Locale(&'static str);

    #[test]
    fn test_put_replaces_by_type() {
        let mut scope = Scope::new();

        assert_eq!(scope.put(Locale("en")), None);
        assert_eq!(scope.put(Locale("de")), Some(Locale("en")));
        scope.put(3u8);

        assert_eq!(scope.get::<Locale>(), Some(&Locale("de")));
        assert_eq!(scope.get::<u8>(), Some(&3));
        assert_eq!(scope.len(), 2);
    }

    #[test]
    fn test_get_mut_then_take() {
        let mut scope = Scope::new();
        scope.put(vec![7u32]);

        if let Some(items) = scope.get_mut::<Vec<u32>>() {
            items.push(8);
        }

        assert_eq!(scope.take::<Vec<u32>>(), Some(vec![7, 8]));
        assert!(!scope.contains::<Vec<u32>>());
        assert!(scope.is_empty());
    }
}
