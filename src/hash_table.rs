//! The open-addressing table.
//!
//! Storage is a single allocation holding `capacity` slots. Each slot carries
//! its own state tag, the cached hash of its key, and (when occupied) the key
//! and value. Collisions are resolved by linear probing from
//! `hash & (capacity - 1)`; deletions leave tombstones that later inserts
//! recycle.

use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use log::debug;
use log::trace;
use log::warn;

use crate::allocator::Global;
use crate::allocator::TableAllocator;
use crate::behavior::KeyBehavior;
use crate::behavior::ValueBehavior;
use crate::error::AllocationError;

/// Number of slots in a freshly created table.
pub const INITIAL_CAPACITY: usize = 16;

/// Largest number of live entries a table of `capacity` slots may hold (3/4 of
/// the slots).
#[inline(always)]
fn max_load(capacity: usize) -> usize {
    capacity - capacity / 4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum SlotState {
    Empty,
    Occupied,
    Deleted,
}

/// One entry of the slot array. `key` and `value` are initialized iff `state`
/// is `Occupied`; `hash` is meaningful only in that case.
struct Slot<K, V> {
    state: SlotState,
    hash: u64,
    key: MaybeUninit<K>,
    value: MaybeUninit<V>,
}

impl<K, V> Slot<K, V> {
    const fn empty() -> Self {
        Slot {
            state: SlotState::Empty,
            hash: 0,
            key: MaybeUninit::uninit(),
            value: MaybeUninit::uninit(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeMode {
    Lookup,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// An occupied slot holding the key.
    Found(usize),
    /// The key is absent. In insert mode this is the slot to fill (the first
    /// tombstone on the probe path, else the terminating empty slot). `None`
    /// only if every slot was visited without reaching an empty one.
    Vacant(Option<usize>),
}

fn slot_layout<K, V>(capacity: usize) -> Result<Layout, AllocationError> {
    Layout::array::<Slot<K, V>>(capacity)
        .map_err(|_| AllocationError::CapacityOverflow { slots: capacity })
}

/// Obtains storage for `capacity` slots from `allocator` and marks every slot
/// empty.
fn allocate_slots<K, V, A>(
    allocator: &A,
    capacity: usize,
) -> Result<(NonNull<Slot<K, V>>, Layout), AllocationError>
where
    A: TableAllocator,
{
    debug_assert!(capacity.is_power_of_two() && capacity >= INITIAL_CAPACITY);

    let layout = slot_layout::<K, V>(capacity)?;
    let raw = allocator.allocate(layout).inspect_err(|err| {
        warn!("slot array allocation for {capacity} slots failed: {err}");
    })?;
    let slots = raw.cast::<Slot<K, V>>();

    // SAFETY: The allocator contract guarantees `raw` is valid and aligned for
    // `layout`, which is exactly `capacity` slots.
    unsafe {
        for index in 0..capacity {
            slots.add(index).write(Slot::empty());
        }
    }

    Ok((slots, layout))
}

/// Debug statistics for analyzing slot usage.
///
/// Available with the `stats` feature, and always in this crate's tests.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq)]
pub struct DebugStats {
    /// Number of live entries
    pub populated: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Live entries allowed before the next insert grows the table
    pub max_load: usize,
    /// Slots holding a live entry
    pub occupied_slots: usize,
    /// Slots holding a tombstone
    pub deleted_slots: usize,
    /// Slots that were never filled since the last resize
    pub empty_slots: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Longest distance of a live entry from its home slot
    pub max_probe_distance: usize,
    /// Total memory in bytes used by the slot array
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor, grows past {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_load
        );
        println!(
            "Slots: {} occupied, {} deleted, {} empty",
            self.occupied_slots, self.deleted_slots, self.empty_slots
        );
        println!("Longest probe: {} slots", self.max_probe_distance);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// A generic open-addressing hash table driven by caller-supplied behaviors.
///
/// `HashTable<K, V, KB, VB, A>` stores keys of type `K` and values of type
/// `V`. It never takes ownership of the caller's arguments: inserts copy the
/// borrowed key and value through the [`KeyBehavior`] `KB` and
/// [`ValueBehavior`] `VB`, and every stored key and value is handed back to
/// the matching `destroy` exactly once. Slot storage comes from the
/// [`TableAllocator`] `A`.
///
/// The table starts with [`INITIAL_CAPACITY`] slots and doubles whenever an
/// insert would push the live count past three quarters of the slots.
/// Deleting leaves a tombstone that a later insert along the same probe path
/// reclaims.
///
/// The table is not synchronized. It is `Send` when its contents, behaviors
/// and allocator are, so it can be moved behind a lock for shared use.
///
/// ## Example
///
/// ```rust
/// use probe_hash::Cloned;
/// use probe_hash::HashTable;
/// use probe_hash::Hashed;
///
/// let mut table = HashTable::new(Hashed::new(), Cloned).unwrap();
///
/// table.insert(&"alpha".to_string(), &3.25).unwrap();
/// table.insert(&"beta".to_string(), &2.75).unwrap();
/// assert_eq!(table.count(), 2);
/// assert_eq!(table.lookup(&"beta".to_string()), Some(&2.75));
///
/// assert!(table.delete(&"alpha".to_string()));
/// assert_eq!(table.lookup(&"alpha".to_string()), None);
/// ```
pub struct HashTable<K, V, KB, VB, A = Global>
where
    KB: KeyBehavior<K>,
    VB: ValueBehavior<V>,
    A: TableAllocator,
{
    slots: NonNull<Slot<K, V>>,
    layout: Layout,

    capacity: usize,
    count: usize,
    tombstones: usize,

    key_behavior: KB,
    value_behavior: VB,
    allocator: A,

    _phantom: PhantomData<(K, V)>,
}

// SAFETY: The table exclusively owns its slot array; sending it sends the
// stored keys and values along with the behaviors and allocator.
unsafe impl<K, V, KB, VB, A> Send for HashTable<K, V, KB, VB, A>
where
    K: Send,
    V: Send,
    KB: KeyBehavior<K> + Send,
    VB: ValueBehavior<V> + Send,
    A: TableAllocator + Send,
{
}

impl<K, V, KB, VB, A> Debug for HashTable<K, V, KB, VB, A>
where
    KB: KeyBehavior<K>,
    VB: ValueBehavior<V>,
    A: TableAllocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;
        use alloc::vec::Vec;

        f.debug_struct("HashTable")
            .field(
                "slots",
                &self
                    .slots()
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|slot| match slot.state {
                                SlotState::Empty => '.',
                                SlotState::Occupied => '#',
                                SlotState::Deleted => 'x',
                            })
                            .collect::<String>()
                    })
                    .collect::<Vec<_>>(),
            )
            .field("count", &self.count)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<K, V, KB, VB, A> Drop for HashTable<K, V, KB, VB, A>
where
    KB: KeyBehavior<K>,
    VB: ValueBehavior<V>,
    A: TableAllocator,
{
    fn drop(&mut self) {
        if self.count > 0 {
            let key_behavior = &self.key_behavior;
            let value_behavior = &self.value_behavior;
            // SAFETY: `slots` points to `capacity` initialized slots owned by
            // this table, and nothing else borrows them during drop.
            let slots = unsafe {
                core::slice::from_raw_parts_mut(self.slots.as_ptr(), self.capacity)
            };
            for slot in slots.iter_mut() {
                if slot.state == SlotState::Occupied {
                    slot.state = SlotState::Deleted;
                    // SAFETY: Occupied slots hold an initialized key and value.
                    // The state was flipped first so neither is read again.
                    let (key, value) =
                        unsafe { (slot.key.assume_init_read(), slot.value.assume_init_read()) };
                    key_behavior.destroy(key);
                    value_behavior.destroy(value);
                }
            }
        }

        // SAFETY: `slots` was obtained from `allocator` with `layout` and is
        // released exactly once, here.
        unsafe {
            self.allocator.release(self.slots.cast(), self.layout);
        }
    }
}

impl<K, V, KB, VB> HashTable<K, V, KB, VB, Global>
where
    KB: KeyBehavior<K>,
    VB: ValueBehavior<V>,
{
    /// Creates an empty table with [`INITIAL_CAPACITY`] slots on the global
    /// heap.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the slot array cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::Cloned;
    /// use probe_hash::HashTable;
    /// use probe_hash::Hashed;
    ///
    /// let table: HashTable<u64, String, _, _> = HashTable::new(Hashed::new(), Cloned).unwrap();
    /// assert_eq!(table.count(), 0);
    /// assert_eq!(table.capacity(), 16);
    /// ```
    pub fn new(key_behavior: KB, value_behavior: VB) -> Result<Self, AllocationError> {
        Self::new_in(key_behavior, value_behavior, Global)
    }
}

impl<K, V, KB, VB, A> HashTable<K, V, KB, VB, A>
where
    KB: KeyBehavior<K>,
    VB: ValueBehavior<V>,
    A: TableAllocator,
{
    /// Creates an empty table with [`INITIAL_CAPACITY`] slots, drawing storage
    /// from `allocator`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if `allocator` cannot provide the slot
    /// array. Nothing is left allocated in that case.
    pub fn new_in(key_behavior: KB, value_behavior: VB, allocator: A) -> Result<Self, AllocationError> {
        let (slots, layout) = allocate_slots::<K, V, A>(&allocator, INITIAL_CAPACITY)?;
        trace!(
            "created table with {INITIAL_CAPACITY} slots ({} bytes)",
            layout.size()
        );

        Ok(Self {
            slots,
            layout,
            capacity: INITIAL_CAPACITY,
            count: 0,
            tombstones: 0,
            key_behavior,
            value_behavior,
            allocator,
            _phantom: PhantomData,
        })
    }

    fn slots(&self) -> &[Slot<K, V>] {
        // SAFETY: `slots` points to `capacity` initialized slots owned by this
        // table.
        unsafe { core::slice::from_raw_parts(self.slots.as_ptr(), self.capacity) }
    }

    fn slots_mut(&mut self) -> &mut [Slot<K, V>] {
        // SAFETY: `slots` points to `capacity` initialized slots owned by this
        // table, and `&mut self` guarantees exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.slots.as_ptr(), self.capacity) }
    }

    #[inline(always)]
    fn home_index(&self, hash: u64) -> usize {
        (hash as usize) & (self.capacity - 1)
    }

    /// Walks the probe sequence for `key` starting at its home slot.
    ///
    /// Stops at the first occupied slot whose key matches, or at the first
    /// empty slot. Tombstones never stop the walk; in insert mode the first one
    /// seen is remembered and preferred over the terminating empty slot. At
    /// most `capacity` slots are visited.
    fn find_slot(&self, hash: u64, key: &K, mode: ProbeMode) -> Probe {
        let slots = self.slots();
        let mask = self.capacity - 1;
        let mut index = self.home_index(hash);
        let mut tombstone = None;

        for _ in 0..self.capacity {
            let slot = &slots[index];
            match slot.state {
                SlotState::Empty => {
                    return Probe::Vacant(match mode {
                        ProbeMode::Insert => Some(tombstone.unwrap_or(index)),
                        ProbeMode::Lookup => Some(index),
                    });
                }
                SlotState::Deleted => {
                    if mode == ProbeMode::Insert && tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                SlotState::Occupied => {
                    // SAFETY: Occupied slots hold an initialized key.
                    if slot.hash == hash
                        && self
                            .key_behavior
                            .eq_key(unsafe { slot.key.assume_init_ref() }, key)
                    {
                        return Probe::Found(index);
                    }
                }
            }
            index = (index + 1) & mask;
        }

        Probe::Vacant(tombstone)
    }

    /// Inserts a copy of `key` and `value`, or replaces the value stored for
    /// an equal key.
    ///
    /// The caller keeps ownership of both arguments. For a new key, both are
    /// copied through the behaviors; for an existing key only the value is
    /// copied in and the previous value is destroyed, while the stored key is
    /// left untouched.
    ///
    /// Returns `true` if the key was not present before.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the insert needed to grow the table and
    /// the larger slot array could not be allocated. The table is unchanged in
    /// that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::Cloned;
    /// use probe_hash::HashTable;
    /// use probe_hash::Hashed;
    ///
    /// let mut table = HashTable::new(Hashed::new(), Cloned).unwrap();
    /// assert!(table.insert(&101u32, &"alpha").unwrap());
    /// assert!(!table.insert(&101u32, &"ALPHA").unwrap());
    /// assert_eq!(table.count(), 1);
    /// assert_eq!(table.lookup(&101), Some(&"ALPHA"));
    /// ```
    pub fn insert(&mut self, key: &K, value: &V) -> Result<bool, AllocationError> {
        if self.count + 1 > max_load(self.capacity) {
            let new_capacity = self
                .capacity
                .checked_mul(2)
                .ok_or(AllocationError::CapacityOverflow {
                    slots: usize::MAX,
                })?;
            self.grow(new_capacity)?;
        }

        let hash = self.key_behavior.hash_key(key);
        match self.find_slot(hash, key, ProbeMode::Insert) {
            Probe::Found(index) => {
                let value = self.value_behavior.copy(value);
                let slot = &mut self.slots_mut()[index];
                // SAFETY: `Found` only reports occupied slots, whose value is
                // initialized.
                let previous = core::mem::replace(unsafe { slot.value.assume_init_mut() }, value);
                self.value_behavior.destroy(previous);
                Ok(false)
            }
            Probe::Vacant(index) => {
                // The load check above leaves at least one non-occupied slot,
                // so a full walk still remembers a tombstone.
                let Some(index) = index else {
                    unreachable!("load factor leaves a free slot on every probe path");
                };
                let key = self.key_behavior.copy(key);
                let value = self.value_behavior.copy(value);

                let slot = &mut self.slots_mut()[index];
                let reused = slot.state == SlotState::Deleted;
                debug_assert!(slot.state != SlotState::Occupied);
                slot.key.write(key);
                slot.value.write(value);
                slot.hash = hash;
                slot.state = SlotState::Occupied;

                if reused {
                    self.tombstones -= 1;
                }
                self.count += 1;
                debug_assert!(self.count <= max_load(self.capacity));
                Ok(true)
            }
        }
    }

    /// Returns a reference to the value stored for `key`, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::Cloned;
    /// use probe_hash::HashTable;
    /// use probe_hash::Hashed;
    ///
    /// let mut table = HashTable::new(Hashed::new(), Cloned).unwrap();
    /// table.insert(&202u32, &2.75).unwrap();
    ///
    /// assert_eq!(table.lookup(&202), Some(&2.75));
    /// assert_eq!(table.lookup(&999), None);
    /// ```
    pub fn lookup(&self, key: &K) -> Option<&V> {
        if self.count == 0 {
            return None;
        }

        let hash = self.key_behavior.hash_key(key);
        match self.find_slot(hash, key, ProbeMode::Lookup) {
            // SAFETY: `Found` only reports occupied slots, whose value is
            // initialized.
            Probe::Found(index) => Some(unsafe { self.slots()[index].value.assume_init_ref() }),
            Probe::Vacant(_) => None,
        }
    }

    /// Removes `key`, destroying the stored key and value.
    ///
    /// Returns `true` if the key was present. The slot becomes a tombstone
    /// that later inserts may reuse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_hash::Cloned;
    /// use probe_hash::HashTable;
    /// use probe_hash::Hashed;
    ///
    /// let mut table = HashTable::new(Hashed::new(), Cloned).unwrap();
    /// table.insert(&303u32, &1.61).unwrap();
    ///
    /// assert!(table.delete(&303));
    /// assert!(!table.delete(&303));
    /// assert_eq!(table.count(), 0);
    /// ```
    pub fn delete(&mut self, key: &K) -> bool {
        if self.count == 0 {
            return false;
        }

        let hash = self.key_behavior.hash_key(key);
        let Probe::Found(index) = self.find_slot(hash, key, ProbeMode::Lookup) else {
            return false;
        };

        let slot = &mut self.slots_mut()[index];
        slot.state = SlotState::Deleted;
        // SAFETY: The slot was occupied, so key and value are initialized. The
        // state is already `Deleted`, so neither is read again.
        let (key, value) = unsafe { (slot.key.assume_init_read(), slot.value.assume_init_read()) };

        self.count -= 1;
        self.tombstones += 1;

        self.key_behavior.destroy(key);
        self.value_behavior.destroy(value);
        true
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if the table holds no live entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of slots. Always a power of two, at least
    /// [`INITIAL_CAPACITY`].
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the key behavior the table was created with.
    pub fn key_behavior(&self) -> &KB {
        &self.key_behavior
    }

    /// Returns the value behavior the table was created with.
    pub fn value_behavior(&self) -> &VB {
        &self.value_behavior
    }

    /// Returns the allocator the table draws storage from.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Destroys every stored key and value, then releases the slot array.
    ///
    /// Equivalent to dropping the table. Destroying an absent table
    /// (`Option::None`) is simply a no-op drop of the option.
    pub fn destroy(self) {
        drop(self);
    }

    /// Moves every live entry into a fresh array of `new_capacity` slots.
    ///
    /// The new array is allocated before anything is touched, so a failed
    /// allocation leaves the table as it was. Entries are relocated by their
    /// cached hash; no behavior is invoked and all tombstones are dropped.
    #[cold]
    fn grow(&mut self, new_capacity: usize) -> Result<(), AllocationError> {
        debug_assert!(new_capacity > self.capacity);

        let (new_slots, new_layout) = allocate_slots::<K, V, A>(&self.allocator, new_capacity)?;
        debug!(
            "growing table from {} to {new_capacity} slots ({} live, {} tombstones)",
            self.capacity, self.count, self.tombstones
        );

        let old_slots = core::mem::replace(&mut self.slots, new_slots);
        let old_layout = core::mem::replace(&mut self.layout, new_layout);
        let old_capacity = core::mem::replace(&mut self.capacity, new_capacity);
        self.tombstones = 0;

        let mask = new_capacity - 1;
        // SAFETY: `old_slots` still points to `old_capacity` initialized slots;
        // the table no longer references them.
        let old = unsafe { core::slice::from_raw_parts(old_slots.as_ptr(), old_capacity) };
        let new = self.slots_mut();

        // Ownership note: keys and values are moved bitwise into the new array.
        // The old array is released without running any destructors.
        for slot in old.iter().filter(|slot| slot.state == SlotState::Occupied) {
            let mut index = (slot.hash as usize) & mask;
            while new[index].state != SlotState::Empty {
                index = (index + 1) & mask;
            }

            // SAFETY: `slot` and `new[index]` live in distinct allocations, and
            // the source is never read again.
            unsafe {
                core::ptr::copy_nonoverlapping(slot as *const Slot<K, V>, &mut new[index], 1);
            }
        }

        // SAFETY: `old_slots` came from `allocator` with `old_layout` and its
        // contents have all been moved out.
        unsafe {
            self.allocator.release(old_slots.cast(), old_layout);
        }

        Ok(())
    }

    /// Collects slot-level statistics.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let mut stats = DebugStats {
            populated: self.count,
            capacity: self.capacity,
            max_load: max_load(self.capacity),
            occupied_slots: 0,
            deleted_slots: 0,
            empty_slots: 0,
            load_factor: self.count as f64 / self.capacity as f64,
            max_probe_distance: 0,
            total_bytes: self.layout.size(),
        };

        for (index, slot) in self.slots().iter().enumerate() {
            match slot.state {
                SlotState::Empty => stats.empty_slots += 1,
                SlotState::Deleted => stats.deleted_slots += 1,
                SlotState::Occupied => {
                    stats.occupied_slots += 1;
                    let distance = index.wrapping_sub(self.home_index(slot.hash)) & (self.capacity - 1);
                    stats.max_probe_distance = stats.max_probe_distance.max(distance);
                }
            }
        }

        stats
    }
}
