//! Blocking subscriber callbacks.
//!
//! The dispatcher offers two independent notification paths: the blocking
//! handler trait here, invoked inline after recognition, and a broadcast
//! channel for callers that want to consume results asynchronously.

/// A blocking observer of recognized text.
///
/// Handlers run on the recognition task, one after another; keep them
/// cheap or hand the text off to a channel.
pub trait RecognitionHandler: Send + Sync {
    /// Called with cleaned, non-empty recognized text.
    fn on_text(&self, text: &str);
}

impl<F> RecognitionHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_text(&self, text: &str) {
        self(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_closure_is_a_handler() {
        let count = AtomicU32::new(0);
        let handler = |_: &str| {
            count.fetch_add(1, Ordering::Relaxed);
        };
        handler.on_text("abc");
        handler.on_text("def");
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
