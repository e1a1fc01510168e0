//! Circular membership list of resident coroutines
//!
//! The ring is an arena of slots linked into a circle by index. A slot
//! carries a generation that is bumped every time it is vacated, so a
//! [`TaskId`] that outlived its coroutine is recognized as stale instead of
//! aliasing whatever reuses the slot. Every ring also carries a process
//! wide tag, so an id handed out by one scheduler never resolves in another.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_RING: AtomicU32 = AtomicU32::new(0);

/// Stable handle of a coroutine slot: owning ring, arena index and generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    ring: u32,
    index: u32,
    generation: u32,
}

impl TaskId {
    /// slot index inside the scheduler arena
    pub fn index(&self) -> u32 {
        self.index
    }

    /// how many times the slot was reused before this coroutine took it
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied {
        generation: u32,
        prev: u32,
        next: u32,
        value: T,
    },
    Vacant {
        generation: u32,
        next_free: Option<u32>,
    },
}

pub(crate) struct Ring<T> {
    tag: u32,
    slots: Vec<Slot<T>>,
    free: Option<u32>,
    cursor: Option<u32>,
    len: usize,
}

impl<T> Default for Ring<T> {
    fn default() -> Self {
        Ring::new()
    }
}

impl<T> Ring<T> {
    pub fn new() -> Self {
        Ring {
            tag: NEXT_RING.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: None,
            cursor: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn id_of(&self, index: u32) -> TaskId {
        match self.slots[index as usize] {
            Slot::Occupied { generation, .. } => TaskId {
                ring: self.tag,
                index,
                generation,
            },
            Slot::Vacant { .. } => unreachable!("ring link to vacant slot {}", index),
        }
    }

    fn links(&self, index: u32) -> (u32, u32) {
        match self.slots[index as usize] {
            Slot::Occupied { prev, next, .. } => (prev, next),
            Slot::Vacant { .. } => unreachable!("ring link to vacant slot {}", index),
        }
    }

    fn set_prev(&mut self, index: u32, to: u32) {
        if let Slot::Occupied { prev, .. } = &mut self.slots[index as usize] {
            *prev = to;
        }
    }

    fn set_next(&mut self, index: u32, to: u32) {
        if let Slot::Occupied { next, .. } = &mut self.slots[index as usize] {
            *next = to;
        }
    }

    /// add a value right before the cursor, so traversal meets it after
    /// every value inserted earlier
    pub fn insert(&mut self, value: T) -> TaskId {
        let index = match self.free {
            Some(index) => index,
            None => {
                self.slots.push(Slot::Vacant {
                    generation: 0,
                    next_free: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let (generation, next_free) = match self.slots[index as usize] {
            Slot::Vacant {
                generation,
                next_free,
            } => (generation, next_free),
            Slot::Occupied { .. } => unreachable!("free list points to occupied slot {}", index),
        };
        self.free = next_free;

        let (prev, next) = match self.cursor {
            None => {
                self.cursor = Some(index);
                (index, index)
            }
            Some(cursor) => {
                let (prev, _) = self.links(cursor);
                self.set_next(prev, index);
                self.set_prev(cursor, index);
                (prev, cursor)
            }
        };

        self.slots[index as usize] = Slot::Occupied {
            generation,
            prev,
            next,
            value,
        };
        self.len += 1;
        TaskId {
            ring: self.tag,
            index,
            generation,
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&T> {
        if id.ring != self.tag {
            return None;
        }
        match self.slots.get(id.index as usize) {
            Some(Slot::Occupied {
                generation, value, ..
            }) if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut T> {
        if id.ring != self.tag {
            return None;
        }
        match self.slots.get_mut(id.index as usize) {
            Some(Slot::Occupied {
                generation, value, ..
            }) if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// the slot the traversal currently points at
    pub fn cursor(&self) -> Option<TaskId> {
        self.cursor.map(|index| self.id_of(index))
    }

    /// move the cursor one step forward and return the new position
    pub fn advance(&mut self) -> Option<TaskId> {
        let cursor = self.cursor?;
        let (_, next) = self.links(cursor);
        self.cursor = Some(next);
        Some(self.id_of(next))
    }

    /// put the cursor on `id`, returns false for a stale id
    pub fn seek(&mut self, id: TaskId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.cursor = Some(id.index);
        true
    }

    /// unlink `id` and release its slot
    ///
    /// when `id` is the cursor, the cursor moves on to its successor
    pub fn remove(&mut self, id: TaskId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }

        let index = id.index;
        let (prev, next) = self.links(index);
        if next == index {
            self.cursor = None;
        } else {
            self.set_next(prev, next);
            self.set_prev(next, prev);
            if self.cursor == Some(index) {
                self.cursor = Some(next);
            }
        }

        let vacant = Slot::Vacant {
            generation: id.generation.wrapping_add(1),
            next_free: self.free,
        };
        self.free = Some(index);
        self.len -= 1;
        match std::mem::replace(&mut self.slots[index as usize], vacant) {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => unreachable!("removed slot {} was vacant", index),
        }
    }

    /// unlink the node under the cursor
    pub fn remove_current(&mut self) -> Option<(TaskId, T)> {
        let id = self.cursor()?;
        self.remove(id).map(|value| (id, value))
    }

    /// walk the ring once, starting at the cursor
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            at: self.cursor,
            left: self.len,
        }
    }
}

impl<T> Index<TaskId> for Ring<T> {
    type Output = T;

    fn index(&self, id: TaskId) -> &T {
        match self.get(id) {
            Some(value) => value,
            None => panic!("coroutine {} is not resident", id),
        }
    }
}

impl<T> IndexMut<TaskId> for Ring<T> {
    fn index_mut(&mut self, id: TaskId) -> &mut T {
        match self.get_mut(id) {
            Some(value) => value,
            None => panic!("coroutine {} is not resident", id),
        }
    }
}

pub(crate) struct Iter<'a, T> {
    ring: &'a Ring<T>,
    at: Option<u32>,
    left: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (TaskId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.left == 0 {
            return None;
        }
        let index = self.at?;
        self.left -= 1;
        match &self.ring.slots[index as usize] {
            Slot::Occupied {
                generation,
                next,
                value,
                ..
            } => {
                self.at = Some(*next);
                let id = TaskId {
                    ring: self.ring.tag,
                    index,
                    generation: *generation,
                };
                Some((id, value))
            }
            Slot::Vacant { .. } => None,
        }
    }
}
