pub trait RecordStore<T: PartialEq> {
    fn list(&self) -> &[T];

    fn insert(&mut self, item: T);

    fn purge_where(&mut self, predicate: &mut dyn FnMut(&T) -> bool) -> usize;

    fn purge(&mut self, to_remove: &[T]) -> usize {
        if to_remove.is_empty() {
            return 0;
        }
        self.purge_where(&mut |item| to_remove.contains(item))
    }

    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.list().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore<T> {
    items: Vec<T>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for MemoryStore<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: PartialEq> RecordStore<T> for MemoryStore<T> {
    fn list(&self) -> &[T] {
        &self.items
    }

    fn insert(&mut self, item: T) {
        self.items.push(item);
    }

    fn purge_where(&mut self, predicate: &mut dyn FnMut(&T) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !predicate(item));
        before - self.items.len()
    }
}
