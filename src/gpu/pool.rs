//! Generational slot pool for GPU resource records
//!
//! Every backend keeps its resources (buffers, vertex arrays, shader stages,
//! programs) in a `Pool`. Slots are recycled through a free list, and each
//! slot carries a generation counter so an index from a released resource
//! can never reach whatever later takes its place.
//!
//! # Example
//!
//! ```ignore
//! let mut pool: Pool<wgpu::Buffer> = Pool::new();
//! let index = pool.insert(buffer);
//! assert!(pool.is_live(index));
//! pool.remove(index);
//! assert!(pool.get(index).is_none());
//! ```

// ============================================================================
// Pool Index
// ============================================================================

/// Index into a pool, identifying one occupant of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolIndex {
    slot: u32,
    generation: u32,
}

impl PoolIndex {
    /// Slot number inside the pool.
    #[must_use]
    #[inline]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    /// Generation the slot had when this index was issued.
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

// ============================================================================
// Pool Slot
// ============================================================================

#[derive(Debug)]
enum Slot<T> {
    Occupied { generation: u32, value: T },
    /// Empty slot; `next_free` links the free list (`u32::MAX` terminates it).
    Vacant { generation: u32, next_free: u32 },
}

// ============================================================================
// Pool
// ============================================================================

/// Free-list pool with generation-checked indices.
///
/// | Operation | Time Complexity |
/// |-----------|-----------------|
/// | `insert`  | O(1) amortized  |
/// | `remove`  | O(1)            |
/// | `get`     | O(1)            |
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free_head: u32,
    live_count: usize,
}

impl<T> Pool<T> {
    const NONE: u32 = u32::MAX;

    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: Self::NONE,
            live_count: 0,
        }
    }

    /// Store a value, reusing the most recently freed slot if there is one.
    pub fn insert(&mut self, value: T) -> PoolIndex {
        self.live_count += 1;

        if self.free_head != Self::NONE {
            let slot = self.free_head;
            let (generation, next_free) = match self.slots[slot as usize] {
                Slot::Vacant {
                    generation,
                    next_free,
                } => (generation, next_free),
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };

            self.free_head = next_free;
            self.slots[slot as usize] = Slot::Occupied { generation, value };

            PoolIndex { slot, generation }
        } else {
            let slot = u32::try_from(self.slots.len()).expect("pool exceeded u32::MAX slots");
            self.slots.push(Slot::Occupied {
                generation: 0,
                value,
            });
            PoolIndex {
                slot,
                generation: 0,
            }
        }
    }

    /// Remove and return the value behind `index`.
    ///
    /// Returns `None` for stale indices, so a double release is harmless.
    pub fn remove(&mut self, index: PoolIndex) -> Option<T> {
        let slot = self.slots.get_mut(index.slot as usize)?;
        if !matches!(slot, Slot::Occupied { generation, .. } if *generation == index.generation) {
            return None;
        }

        let vacant = Slot::Vacant {
            generation: index.generation.wrapping_add(1),
            next_free: self.free_head,
        };
        let previous = std::mem::replace(slot, vacant);
        self.free_head = index.slot;
        self.live_count -= 1;

        match previous {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Borrow the value behind `index` if it is still live.
    #[must_use]
    #[inline]
    pub fn get(&self, index: PoolIndex) -> Option<&T> {
        match self.slots.get(index.slot as usize)? {
            Slot::Occupied { generation, value } if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Mutably borrow the value behind `index` if it is still live.
    #[inline]
    pub fn get_mut(&mut self, index: PoolIndex) -> Option<&mut T> {
        match self.slots.get_mut(index.slot as usize)? {
            Slot::Occupied { generation, value } if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Check whether `index` still refers to a stored value.
    #[must_use]
    #[inline]
    pub fn is_live(&self, index: PoolIndex) -> bool {
        self.get(index).is_some()
    }

    /// Number of live values.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.live_count
    }

    /// True when nothing is stored.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
