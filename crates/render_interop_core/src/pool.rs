//! # Recycle Pool
//!
//! Fixed-capacity pool of retired objects waiting to be reused.

/// A fixed-capacity pool of reusable objects.
///
/// All slots are allocated up front. Objects are returned in LIFO order so
/// the most recently retired one (the warmest) is reused first.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Wrap it in a mutex to share it.
///
/// # Example
///
/// ```rust
/// use render_interop_core::RecyclePool;
///
/// let mut pool: RecyclePool<Vec<u8>> = RecyclePool::new(4);
/// assert!(pool.insert(Vec::with_capacity(1024)).is_ok());
/// let reused = pool.pop().unwrap();
/// assert_eq!(reused.capacity(), 1024);
/// ```
pub struct RecyclePool<T> {
    /// The storage array.
    storage: Box<[Option<T>]>,
    /// Free list - indices of available slots.
    free_list: Vec<usize>,
    /// Occupied slots, most recently inserted last.
    occupied: Vec<usize>,
}

impl<T> RecyclePool<T> {
    /// Creates a new pool with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let storage: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        let free_list: Vec<usize> = (0..capacity).rev().collect();

        Self {
            storage: storage.into_boxed_slice(),
            free_list,
            occupied: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of pooled objects.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    /// Returns true if nothing is pooled.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Stores an object for later reuse.
    ///
    /// # Errors
    ///
    /// Hands the object back when the pool is full.
    pub fn insert(&mut self, value: T) -> Result<(), T> {
        let Some(index) = self.free_list.pop() else {
            return Err(value);
        };
        self.storage[index] = Some(value);
        self.occupied.push(index);
        Ok(())
    }

    /// Takes the most recently inserted object.
    pub fn pop(&mut self) -> Option<T> {
        let index = self.occupied.pop()?;
        let value = self.storage[index].take();
        self.free_list.push(index);
        value
    }
}
