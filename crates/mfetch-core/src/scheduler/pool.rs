//! Transfer slot pool: fixed capacity, each occupied slot owns one
//! in-flight transfer's handle and remembers which URL it serves.

use crate::error::FetchError;

/// Stable identity of a slot while it is occupied.
pub type SlotId = usize;

/// An occupied slot. The handle is attached after the transfer starts.
#[derive(Debug)]
pub struct Slot<H> {
    url_index: usize,
    handle: Option<H>,
}

impl<H> Slot<H> {
    /// Index of the URL (in request order) this slot is serving.
    pub fn url_index(&self) -> usize {
        self.url_index
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn into_handle(self) -> Option<H> {
        self.handle
    }
}

/// Up to `capacity` slots. Both tables are allocated once, up front.
#[derive(Debug)]
pub struct SlotPool<H> {
    slots: Vec<Option<Slot<H>>>,
    free: Vec<SlotId>,
}

impl<H> SlotPool<H> {
    pub fn with_capacity(capacity: usize) -> Result<Self, FetchError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| FetchError::Allocation { what: "slot table" })?;
        slots.resize_with(capacity, || None);
        let mut free = Vec::new();
        free.try_reserve_exact(capacity)
            .map_err(|_| FetchError::Allocation { what: "slot free list" })?;
        // Reversed so slot 0 is handed out first.
        free.extend((0..capacity).rev());
        Ok(Self { slots, free })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn has_free(&self) -> bool {
        !self.free.is_empty()
    }

    /// Occupy a free slot for `url_index`. Callers check `has_free` first;
    /// an exhausted pool is reported as an error, never overcommitted.
    pub fn acquire(&mut self, url_index: usize) -> Result<SlotId, FetchError> {
        let id = self.free.pop().ok_or(FetchError::PoolExhausted {
            capacity: self.capacity(),
        })?;
        self.slots[id] = Some(Slot {
            url_index,
            handle: None,
        });
        Ok(id)
    }

    /// Attach the transfer handle to an occupied slot. Returns the handle
    /// back if the slot is not occupied.
    pub fn attach(&mut self, id: SlotId, handle: H) -> Result<(), H> {
        match self.slots.get_mut(id) {
            Some(Some(slot)) => {
                slot.handle = Some(handle);
                Ok(())
            }
            _ => Err(handle),
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot<H>> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Free a slot and hand back what it owned. `None` if it was already
    /// free, so a handle can never be released twice.
    pub fn release(&mut self, id: SlotId) -> Option<Slot<H>> {
        let slot = self.slots.get_mut(id)?.take()?;
        self.free.push(id);
        Some(slot)
    }

    pub fn occupied_slots(&self) -> impl Iterator<Item = (SlotId, &Slot<H>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, s)| s.as_ref().map(|slot| (id, slot)))
    }

    /// Release every occupied slot (abort path).
    pub fn drain(&mut self) -> Vec<Slot<H>> {
        let ids: Vec<SlotId> = self.occupied_slots().map(|(id, _)| id).collect();
        ids.into_iter().filter_map(|id| self.release(id)).collect()
    }
}
