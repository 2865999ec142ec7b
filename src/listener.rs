use crate::telegrams::SpaState;
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Receives the decoded state once per poll tick.
///
/// No deduplication happens upstream: implementations decide whether the
/// snapshot differs enough from what they last published.
pub trait SpaListener {
    fn on_state(&mut self, state: &SpaState);
}

impl<F> SpaListener for F
where
    F: FnMut(&SpaState),
{
    fn on_state(&mut self, state: &SpaState) {
        self(state);
    }
}

/// Listeners in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<Box<dyn SpaListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn register<L>(&mut self, listener: L)
    where
        L: SpaListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn notify(&mut self, state: &SpaState) {
        for listener in &mut self.listeners {
            listener.on_state(state);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl core::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerRegistry").field("listeners", &self.listeners.len()).finish()
    }
}
