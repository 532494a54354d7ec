use x11rb::protocol::xproto::Window;

use crate::window::client::Client;

#[derive(Debug, Clone)]
struct Slot {
    client: Client,
    prev: usize,
    next: usize,
}

/// Circular, insertion-ordered set of clients with a focus cursor.
///
/// Clients live in an arena of slots linked by index. Freed slots are
/// recycled, but every public lookup goes through the window id so a
/// recycled index never stands in for a removed client.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    focus: Option<usize>,
    len: usize,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, idx: usize) -> Option<&Slot> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, idx: usize) -> Option<&mut Slot> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn position(&self, window: Window) -> Option<usize> {
        self.iter_indices().find(|&idx| self.slot(idx).is_some_and(|s| s.client.window == window))
    }

    fn iter_indices(&self) -> impl Iterator<Item = usize> + '_ {
        let mut cursor = self.head;
        (0..self.len).filter_map(move |_| {
            let idx = cursor?;
            cursor = self.slot(idx).map(|s| s.next);
            Some(idx)
        })
    }

    /// Appends at the tail. The first client of an empty registry takes focus.
    pub fn insert(&mut self, client: Client) {
        let idx = self.free.pop().unwrap_or(self.slots.len());
        let (prev, next) = match self.head {
            None => (idx, idx),
            Some(head) => {
                let tail = self.slot(head).map_or(head, |s| s.prev);
                (tail, head)
            }
        };

        let slot = Some(Slot { client, prev, next });
        if idx == self.slots.len() {
            self.slots.push(slot);
        } else {
            self.slots[idx] = slot;
        }

        if let Some(head) = self.head {
            if let Some(tail) = self.slot_mut(prev) {
                tail.next = idx;
            }
            if let Some(head) = self.slot_mut(head) {
                head.prev = idx;
            }
        } else {
            self.head = Some(idx);
            self.focus = Some(idx);
        }
        self.len += 1;
    }

    /// Unlinks a client. Focus on the removed client moves to its
    /// predecessor, or clears when the registry empties. Absent windows are
    /// ignored.
    pub fn remove(&mut self, window: Window) -> Option<Client> {
        let idx = self.position(window)?;
        let slot = self.slots[idx].take()?;
        self.free.push(idx);
        self.len -= 1;

        if self.len == 0 {
            self.head = None;
            self.focus = None;
            return Some(slot.client);
        }

        if let Some(prev) = self.slot_mut(slot.prev) {
            prev.next = slot.next;
        }
        if let Some(next) = self.slot_mut(slot.next) {
            next.prev = slot.prev;
        }
        if self.head == Some(idx) {
            self.head = Some(slot.next);
        }
        if self.focus == Some(idx) {
            self.focus = Some(slot.prev);
        }
        Some(slot.client)
    }

    pub fn find(&self, window: Window) -> Option<&Client> {
        self.position(window).and_then(|idx| self.slot(idx)).map(|s| &s.client)
    }

    pub fn find_mut(&mut self, window: Window) -> Option<&mut Client> {
        let idx = self.position(window)?;
        self.slot_mut(idx).map(|s| &mut s.client)
    }

    pub fn contains(&self, window: Window) -> bool {
        self.position(window).is_some()
    }

    pub fn focused(&self) -> Option<&Client> {
        self.focus.and_then(|idx| self.slot(idx)).map(|s| &s.client)
    }

    pub fn focused_window(&self) -> Option<Window> {
        self.focused().map(|c| c.window)
    }

    /// Returns false when the window is not a member.
    pub fn set_focus(&mut self, window: Window) -> bool {
        match self.position(window) {
            Some(idx) => {
                self.focus = Some(idx);
                true
            }
            None => false,
        }
    }

    pub fn focus_next(&mut self) {
        if let Some(next) = self.focus.and_then(|idx| self.slot(idx)).map(|s| s.next) {
            self.focus = Some(next);
        }
    }

    pub fn focus_previous(&mut self) {
        if let Some(prev) = self.focus.and_then(|idx| self.slot(idx)).map(|s| s.prev) {
            self.focus = Some(prev);
        }
    }

    pub fn next_of(&self, window: Window) -> Option<Window> {
        let idx = self.position(window)?;
        let next = self.slot(idx)?.next;
        self.slot(next).map(|s| s.client.window)
    }

    pub fn previous_of(&self, window: Window) -> Option<Window> {
        let idx = self.position(window)?;
        let prev = self.slot(idx)?.prev;
        self.slot(prev).map(|s| s.client.window)
    }

    /// Clients in circular order starting from the oldest member.
    pub fn iter(&self) -> impl Iterator<Item = &Client> + '_ {
        self.iter_indices().filter_map(|idx| self.slot(idx)).map(|s| &s.client)
    }

    pub fn windows(&self) -> Vec<Window> {
        self.iter().map(|c| c.window).collect()
    }
}
