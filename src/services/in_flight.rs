use std::collections::HashSet;
use std::sync::Mutex;

/// Actions currently awaiting a network result. A key can be held once; the
/// second identical submission is turned away until the first finishes.
#[derive(Default)]
pub struct InFlight {
    keys: Mutex<HashSet<String>>,
}

pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
}

impl InFlight {
    pub fn try_acquire(&self, key: String) -> Option<InFlightGuard<'_>> {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { owner: self, key })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.owner.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.remove(&self.key);
    }
}
