//! Readiness queue: holds work issued before an engine instance exists
//!
//! The remote context keeps its own queue (see [`guarded`]), since it knows
//! best when its instance exists. [`ReadinessQueue`] is the same discipline
//! for code that can observe readiness directly.

use std::collections::VecDeque;

/// FIFO buffer that releases items once readiness is signaled
#[derive(Debug)]
pub struct ReadinessQueue<T> {
    pending: VecDeque<T>,
    ready: bool,
}

impl<T> Default for ReadinessQueue<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            ready: false,
        }
    }
}

impl<T> ReadinessQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand back `item` to run now when ready, otherwise keep it
    pub fn submit(&mut self, item: T) -> Option<T> {
        if self.ready {
            Some(item)
        } else {
            self.pending.push_back(item);
            None
        }
    }

    /// Signal readiness and take everything queued, oldest first.
    ///
    /// The queue is drained, so a second call yields nothing.
    pub fn mark_ready(&mut self) -> Vec<T> {
        self.ready = true;
        self.pending.drain(..).collect()
    }

    /// Back to not-ready, dropping anything queued
    pub fn reset(&mut self) {
        self.ready = false;
        self.pending.clear();
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Wrap a script body so it runs now if the remote instance exists and is
/// queued for the next create otherwise.
pub fn guarded(body: &str) -> String {
    format!(
        "(function() {{\n\
         var cb = window.__cb = window.__cb || {{ queue: [] }};\n\
         var run = function() {{\n{}\n}};\n\
         if (cb.chart) {{ run(); }}\n\
         else {{ cb.queue = cb.queue || []; cb.queue.push(run); console.debug('Chart not initialized; command queued'); }}\n\
         }})();\ntrue;",
        body
    )
}
