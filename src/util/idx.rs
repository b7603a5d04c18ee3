use std::{fmt, hash::Hash, marker::PhantomData, num::NonZeroU32};

/// A typed handle into an [`Arena<T>`].
pub struct Idx<T> {
    // Here we use a NonZeroU32 to leverage niche layout optimization, so that
    // `Option<Idx<T>>` is as large as `Idx<T>`.
    handle: NonZeroU32,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .expect("arena out of capacity");
        Idx {
            // This will never be zero due to the +1.
            handle: NonZeroU32::new(raw).expect("non-zero"),
            _ty: PhantomData,
        }
    }

    /// The zero-based position of the element in its arena.
    pub fn index(self) -> usize {
        (self.handle.get() - 1) as usize
    }
}

impl<T> Copy for Idx<T> {}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Hash for Idx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for Idx<T> {}

impl<T> PartialOrd for Idx<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Idx<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.handle.cmp(&other.handle)
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({})", self.index())
    }
}

impl<T> fmt::Display for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.index(), f)
    }
}

/// An append-only store whose elements are addressed by stable [`Idx`]
/// handles. Elements are never removed, so handles never dangle.
pub struct Arena<T> {
    vec: Vec<T>,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            vec: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn push(&mut self, value: T) -> Idx<T> {
        let idx = Idx::from_index(self.vec.len());
        self.vec.push(value);
        idx
    }

    /// Returns the element for the provided handle. Panics if the handle
    /// belongs to another arena which is larger than this one.
    pub fn get(&self, idx: Idx<T>) -> &T {
        &self.vec[idx.index()]
    }

    pub fn get_mut(&mut self, idx: Idx<T>) -> &mut T {
        &mut self.vec[idx.index()]
    }

    /// Returns the handle of the first element, if any.
    pub fn first(&self) -> Option<Idx<T>> {
        (!self.is_empty()).then(|| Idx::from_index(0))
    }

    /// Returns the handle that follows `idx` in insertion order, if any.
    pub fn next(&self, idx: Idx<T>) -> Option<Idx<T>> {
        let next = idx.index() + 1;
        (next < self.len()).then(|| Idx::from_index(next))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &T)> {
        self.vec
            .iter()
            .enumerate()
            .map(|(i, value)| (Idx::from_index(i), value))
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (i, value) in self.vec.iter().enumerate() {
            map.entry(&i, value);
        }
        map.finish()
    }
}
