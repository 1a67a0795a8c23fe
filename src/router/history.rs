//! Browser location and session history

use std::cell::RefCell;
use std::rc::Rc;

/// The platform's location and history, as the router sees it
pub trait History {
    /// Whether path-based navigation is available
    fn supports_push_state(&self) -> bool;
    fn pathname(&self) -> String;
    /// Fragment without the leading `#`
    fn hash(&self) -> String;
    fn push_state(&self, path: &str);
    fn set_hash(&self, fragment: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub hash: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            pathname: "/".to_string(),
            hash: String::new(),
        }
    }
}

#[derive(Debug)]
struct Entries {
    stack: Vec<Location>,
    index: usize,
}

impl Entries {
    fn current(&self) -> Location {
        self.stack.get(self.index).cloned().unwrap_or_default()
    }

    fn push(&mut self, location: Location) {
        self.stack.truncate(self.index + 1);
        self.stack.push(location);
        self.index = self.stack.len() - 1;
    }
}

/// In-memory history with back/forward traversal
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Rc<RefCell<Entries>>,
    push_state: bool,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::starting_at(Location::default())
    }

    pub fn starting_at(location: Location) -> Self {
        Self {
            entries: Rc::new(RefCell::new(Entries {
                stack: vec![location],
                index: 0,
            })),
            push_state: true,
        }
    }

    /// A platform without path-based navigation
    pub fn without_push_state(mut self) -> Self {
        self.push_state = false;
        self
    }

    pub fn location(&self) -> Location {
        self.entries.borrow().current()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Step back one entry; returns false at the start of history
    pub fn back(&self) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.index == 0 {
            return false;
        }
        entries.index -= 1;
        true
    }

    /// Step forward one entry; returns false at the end of history
    pub fn forward(&self) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.index + 1 >= entries.stack.len() {
            return false;
        }
        entries.index += 1;
        true
    }
}

impl History for MemoryHistory {
    fn supports_push_state(&self) -> bool {
        self.push_state
    }

    fn pathname(&self) -> String {
        self.location().pathname
    }

    fn hash(&self) -> String {
        self.location().hash
    }

    fn push_state(&self, path: &str) {
        self.entries.borrow_mut().push(Location {
            pathname: path.to_string(),
            hash: String::new(),
        });
    }

    fn set_hash(&self, fragment: &str) {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut entries = self.entries.borrow_mut();
        let current = entries.current();
        // Assigning the current hash again adds no entry
        if current.hash == fragment {
            return;
        }
        entries.push(Location {
            pathname: current.pathname,
            hash: fragment.to_string(),
        });
    }
}
