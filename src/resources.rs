//! Resource Manager contract.
//!
//! Backends hand their raster and GPU objects to a registry so an abnormal
//! teardown can still release them. Releasing is idempotent on both sides:
//! an effect's own cleanup and a later `release_all` may hit the same object.

use std::cell::RefCell;

use tracing::debug;

pub trait Releasable {
    fn release(&mut self);
    fn is_released(&self) -> bool;
}

pub trait ResourceRegistry {
    fn register(&self, resource: Box<dyn Releasable>, description: &str);
}

struct Entry {
    description: String,
    resource: Box<dyn Releasable>,
}

#[derive(Default)]
pub struct ResourceTracker {
    entries: RefCell<Vec<Entry>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked resources not yet released.
    pub fn live(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| !e.resource.is_released())
            .count()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| !e.resource.is_released())
            .map(|e| e.description.clone())
            .collect()
    }

    /// Releases every tracked resource and forgets them. Returns how many were
    /// still live.
    pub fn release_all(&self) -> usize {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        let mut released = 0;
        for mut entry in entries {
            if !entry.resource.is_released() {
                debug!(resource = %entry.description, "resource_release");
                entry.resource.release();
                released += 1;
            }
        }
        released
    }
}

impl ResourceRegistry for ResourceTracker {
    fn register(&self, resource: Box<dyn Releasable>, description: &str) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| !e.resource.is_released());
        debug!(resource = description, live = entries.len() + 1, "resource_register");
        entries.push(Entry {
            description: description.to_string(),
            resource,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        hits: Rc<Cell<u32>>,
        released: bool,
    }

    impl Releasable for Counter {
        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.hits.set(self.hits.get() + 1);
            }
        }

        fn is_released(&self) -> bool {
            self.released
        }
    }

    #[test]
    fn release_all_hits_each_resource_once() {
        let hits = Rc::new(Cell::new(0));
        let tracker = ResourceTracker::new();
        for i in 0..3 {
            tracker.register(
                Box::new(Counter {
                    hits: hits.clone(),
                    released: false,
                }),
                &format!("layer {i}"),
            );
        }
        assert_eq!(tracker.live(), 3);
        assert_eq!(tracker.release_all(), 3);
        assert_eq!(tracker.release_all(), 0);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn released_entries_are_pruned_on_register() {
        let hits = Rc::new(Cell::new(0));
        let tracker = ResourceTracker::new();
        tracker.register(
            Box::new(Counter {
                hits: hits.clone(),
                released: true,
            }),
            "stale",
        );
        tracker.register(
            Box::new(Counter {
                hits,
                released: false,
            }),
            "fresh",
        );
        assert_eq!(tracker.descriptions(), vec!["fresh".to_string()]);
    }
}
