//! Bounded per-processor memory for windowed computations.
//!
//! Memory is append/evict only: a processor adds one value per firing and
//! reads back the retained window, e.g. to compute a moving average.

use cep_types::Value;
use tracing::debug;

use crate::error::MemoryError;

pub trait Memory<T>: Send {
    /// Stores `value`, evicting the oldest element when full. Never fails.
    fn add(&mut self, value: T);

    fn remove(&mut self, value: &T) -> Result<bool, MemoryError>;

    /// Snapshot of the retained values, oldest first.
    fn values(&self) -> Vec<T>;

    fn capacity(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memory handed to a processor context.
pub type ProcessorMemory = Box<dyn Memory<Value>>;

/// Fixed-capacity ring of slots.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    slots: Vec<Option<T>>,
    next: usize,
}

impl<T: Clone> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, MemoryError> {
        if capacity == 0 {
            return Err(MemoryError::InvalidSize(0));
        }
        Ok(Self {
            slots: vec![None; capacity],
            next: 0,
        })
    }
}

impl<T: Clone + Send> Memory<T> for CircularBuffer<T> {
    fn add(&mut self, value: T) {
        self.slots[self.next] = Some(value);
        self.next = (self.next + 1) % self.slots.len();
    }

    fn remove(&mut self, _value: &T) -> Result<bool, MemoryError> {
        Err(MemoryError::UnsupportedOperation("remove"))
    }

    fn values(&self) -> Vec<T> {
        // `next` is the oldest slot once the buffer has wrapped.
        let (newer, older) = self.slots.split_at(self.next);
        older.iter().chain(newer).flatten().cloned().collect()
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Allocates processor memories.
pub trait MemoryProvider: Send + Sync {
    fn create_circular_buffer(&self, size: usize) -> Result<ProcessorMemory, MemoryError>;
}

/// Provider backed by plain heap allocations.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapMemoryProvider;

impl MemoryProvider for HeapMemoryProvider {
    fn create_circular_buffer(&self, size: usize) -> Result<ProcessorMemory, MemoryError> {
        debug!(size, "allocating circular buffer");
        Ok(Box::new(CircularBuffer::<Value>::new(size)?))
    }
}
