//! Run-completion notification.

/// Synchronous listener list, raised once per completed run.
///
/// Listeners fire on the raising thread, in registration order, strictly
/// after the queue drain. A panicking listener propagates to the caller.
#[derive(Default)]
pub struct CompletionSignal {
    listeners: Vec<Box<dyn Fn() + Send>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn connect<F: Fn() + Send + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    /// Invoke every listener.
    pub fn raise(&self) {
        for listener in &self.listeners {
            listener();
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn raises_each_listener_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut signal = CompletionSignal::new();

        for _ in 0..3 {
            let count = Arc::clone(&count);
            signal.connect(move || { count.fetch_add(1, Ordering::SeqCst); });
        }

        signal.raise();
        assert_eq!(count.load(Ordering::SeqCst), 3);

        signal.raise();
        assert_eq!(count.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn registration_order_preserved() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut signal = CompletionSignal::new();

        for i in 0..4 {
            let order = Arc::clone(&order);
            signal.connect(move || order.lock().unwrap().push(i));
        }

        signal.raise();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
