//! Types for implementing a set-associative table of predictor entries.

/// Interface to an entry that can live in a [SetAssocTable].
pub trait TableEntry {
    /// The full tag identifying this entry.
    fn tag(&self) -> u64;

    /// Returns false for entries that must never match a lookup.
    fn is_valid(&self) -> bool;

    /// Returns true when the entry must not be evicted right now.
    fn is_pinned(&self) -> bool { false }
}

/// Identifies a slot in a [SetAssocTable].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub set: usize,
    pub way: usize,
}

/// A `num_sets` by `num_ways` table of optional entries.
///
/// The set is selected by the low bits of the tag, but the tag is always
/// compared in full. Each set keeps a round-robin cursor used to pick a
/// victim when a new entry needs room.
#[derive(Clone, Debug)]
pub struct SetAssocTable<E> {
    num_sets: usize,
    num_ways: usize,
    data: Vec<Vec<Option<E>>>,
    rr_ptr: Vec<usize>,
}
impl<E: TableEntry> SetAssocTable<E> {
    pub fn new(num_sets: usize, num_ways: usize) -> Self {
        assert!(num_sets.is_power_of_two());
        assert!(num_ways > 0);
        let data = (0..num_sets)
            .map(|_| (0..num_ways).map(|_| None).collect())
            .collect();
        Self {
            num_sets,
            num_ways,
            data,
            rr_ptr: vec![0; num_sets],
        }
    }

    pub fn num_sets(&self) -> usize { self.num_sets }
    pub fn num_ways(&self) -> usize { self.num_ways }

    /// Returns the number of slots in the table.
    pub fn size(&self) -> usize { self.num_sets * self.num_ways }

    /// Returns a bitmask corresponding to the number of sets.
    pub fn index_mask(&self) -> u64 { (self.num_sets - 1) as u64 }

    /// Select a set for some tag.
    pub fn get_index(&self, tag: u64) -> usize {
        (tag & self.index_mask()) as usize
    }

    /// Position of the round-robin cursor for a set.
    pub fn rr_ptr(&self, set: usize) -> usize { self.rr_ptr[set] }

    /// Find the slot holding a valid entry with this tag.
    pub fn find(&self, tag: u64) -> Option<Slot> {
        let set = self.get_index(tag);
        self.data[set].iter()
            .position(|e| matches!(e, Some(e) if e.is_valid() && e.tag() == tag))
            .map(|way| Slot { set, way })
    }

    pub fn get(&self, slot: Slot) -> Option<&E> {
        self.data[slot.set][slot.way].as_ref()
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut E> {
        self.data[slot.set][slot.way].as_mut()
    }

    /// Returns a reference to the valid entry with this tag.
    pub fn find_entry(&self, tag: u64) -> Option<&E> {
        self.find(tag).and_then(|slot| self.get(slot))
    }

    /// Returns a mutable reference to the valid entry with this tag.
    pub fn find_entry_mut(&mut self, tag: u64) -> Option<&mut E> {
        let slot = self.find(tag)?;
        self.get_mut(slot)
    }

    /// Choose a way in `set` for a new entry.
    ///
    /// Empty or invalid ways are used first. Otherwise the round-robin cursor
    /// walks the set, skipping pinned entries, and stops one way past the
    /// victim. Returns [None] when every way is pinned.
    pub fn select_victim(&mut self, set: usize) -> Option<usize> {
        let free = self.data[set].iter()
            .position(|e| e.as_ref().map_or(true, |e| !e.is_valid()));
        if free.is_some() {
            return free;
        }
        for step in 0..self.num_ways {
            let way = (self.rr_ptr[set] + step) % self.num_ways;
            let pinned = self.data[set][way].as_ref()
                .map_or(false, |e| e.is_pinned());
            if !pinned {
                self.rr_ptr[set] = (way + 1) % self.num_ways;
                return Some(way);
            }
        }
        None
    }

    /// Place an entry in the set selected by its tag.
    ///
    /// Returns the slot that was filled and any valid entry that was evicted,
    /// or [None] if no way could be freed.
    pub fn insert(&mut self, entry: E) -> Option<(Slot, Option<E>)> {
        let set = self.get_index(entry.tag());
        let way = self.select_victim(set)?;
        let old = self.data[set][way].replace(entry)
            .filter(|e| e.is_valid());
        Some((Slot { set, way }, old))
    }

    /// Iterate over all resident entries.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &E)> {
        self.data.iter().enumerate().flat_map(|(set, ways)| {
            ways.iter().enumerate().filter_map(move |(way, e)| {
                e.as_ref().map(|e| (Slot { set, way }, e))
            })
        })
    }

    /// Number of valid entries.
    pub fn occupancy(&self) -> usize {
        self.iter().filter(|(_, e)| e.is_valid()).count()
    }

    /// Calculate what percentage of slots hold a valid entry.
    pub fn utilization(&self) -> f64 {
        self.occupancy() as f64 / self.size() as f64 * 100.0
    }
}
