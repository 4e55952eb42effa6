//! Id-stable slot storage.
//!
//! A [`Pool`] hands out integer ids equal to slot indices. Removing an entry
//! vacates its slot and pushes the index onto a free list; the next insertion
//! reuses the most recently vacated slot. Iteration skips vacant slots.

/// Growable slot arena with free-list reuse.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn add(&mut self, value: T) -> usize {
        self.len += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(value);
                id
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        }
    }

    pub fn remove(&mut self, id: usize) -> Option<T> {
        let value = self.slots.get_mut(id)?.take()?;
        self.free.push(id);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: usize) -> Option<&T> {
        self.slots.get(id)?.as_ref()
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        self.slots.get_mut(id)?.as_mut()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }

    /// Snapshot of the live ids, safe to hold across mutation of the pool.
    pub fn ids(&self) -> Vec<usize> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|v| (id, v)))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_slot_indices() {
        let mut pool = Pool::new();
        assert_eq!(pool.add("a"), 0);
        assert_eq!(pool.add("b"), 1);
        assert_eq!(pool.add("c"), 2);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(1), Some(&"b"));
    }

    #[test]
    fn removed_slot_is_reused() {
        let mut pool = Pool::new();
        pool.add(10);
        pool.add(11);
        pool.add(12);
        assert_eq!(pool.remove(1), Some(11));
        assert_eq!(pool.remove(1), None);
        assert!(!pool.contains(1));
        assert_eq!(pool.ids(), vec![0, 2]);
        assert_eq!(pool.add(13), 1);
        assert_eq!(pool.get(1), Some(&13));
    }

    #[test]
    fn free_list_is_lifo() {
        let mut pool = Pool::new();
        for v in 0..4 {
            pool.add(v);
        }
        pool.remove(0);
        pool.remove(2);
        assert_eq!(pool.add(20), 2);
        assert_eq!(pool.add(21), 0);
        assert_eq!(pool.add(22), 4);
    }

    #[test]
    fn iteration_skips_vacant_slots() {
        let mut pool = Pool::new();
        pool.add('x');
        pool.add('y');
        pool.add('z');
        pool.remove(0);
        let seen: Vec<_> = pool.iter().collect();
        assert_eq!(seen, vec![(1, &'y'), (2, &'z')]);
        assert_eq!(pool.values().count(), 2);
    }

    #[test]
    fn clear_resets_ids() {
        let mut pool = Pool::new();
        pool.add(1);
        pool.add(2);
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.add(3), 0);
    }

    #[test]
    fn snapshot_allows_removal_while_walking() {
        let mut pool = Pool::new();
        for v in 0..5 {
            pool.add(v);
        }
        for id in pool.ids() {
            if id % 2 == 0 {
                pool.remove(id);
            }
        }
        assert_eq!(pool.ids(), vec![1, 3]);
    }
}
