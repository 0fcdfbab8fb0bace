/// Fixed-capacity table whose empty slots are handed out lowest index first.
/// Backs the inode table, the directory and the open-file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> SlotTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
        }
    }

    pub fn from_slots(slots: Vec<Option<T>>) -> Self {
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.first_free().is_none()
    }

    pub fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Stores `value` in the lowest free slot.
    pub fn insert(&mut self, value: T) -> Option<usize> {
        let index = self.first_free()?;
        self.slots[index] = Some(value);
        Some(index)
    }

    /// Stores `value` at `index`, returning what was there. Out-of-range
    /// indices are ignored and hand `value` back.
    pub fn put(&mut self, index: usize, value: T) -> Option<T> {
        match self.slots.get_mut(index) {
            Some(slot) => slot.replace(value),
            None => Some(value),
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn take(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Index of the first occupied slot matching `pred`.
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(&mut pred))
    }

    /// Occupied slots in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }

    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_free_slot_first() {
        let mut table = SlotTable::with_capacity(3);
        assert_eq!(table.insert('a'), Some(0));
        assert_eq!(table.insert('b'), Some(1));
        assert_eq!(table.insert('c'), Some(2));
        assert!(table.is_full());
        assert_eq!(table.insert('d'), None);

        assert_eq!(table.take(1), Some('b'));
        assert_eq!(table.first_free(), Some(1));
        assert_eq!(table.insert('e'), Some(1));
        assert_eq!(table.get(1), Some(&'e'));
    }

    #[test]
    fn iteration_follows_storage_order() {
        let mut table = SlotTable::with_capacity(4);
        table.put(3, "z");
        table.put(1, "y");
        let items: Vec<_> = table.iter().collect();
        assert_eq!(items, vec![(1, &"y"), (3, &"z")]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.position(|v| *v == "z"), Some(3));
        assert_eq!(table.position(|v| *v == "q"), None);
    }

    #[test]
    fn out_of_range_access() {
        let mut table: SlotTable<u8> = SlotTable::with_capacity(2);
        assert_eq!(table.get(5), None);
        assert_eq!(table.take(5), None);
        assert_eq!(table.put(5, 9), Some(9));
        assert!(table.is_empty());
    }
}
