//! Per-worker caching of idle index row buffers.
//!
//! Scans materialize and discard index rows at high rate; constructing a
//! buffer per row would churn the allocator. Each worker thread owns one
//! [`IndexRowPool`], a bounded LRU of storage-context entries, each holding
//! a LIFO stack of idle buffers per index shape. Losing an entry to eviction
//! never loses data, only a future allocation.

use std::collections::HashMap;
use std::sync::Arc;

use hkv_schema::IndexDef;
use hkv_types::{ContextId, IndexId};
use tracing::debug;

use crate::row::IndexRowBuffer;

/// Bounded cache of idle [`IndexRowBuffer`]s, keyed by storage context and
/// index shape. Single-threaded by construction; one instance per worker.
#[derive(Debug)]
pub struct IndexRowPool {
    capacity: usize,
    tick: u64,
    contexts: HashMap<ContextId, ContextCache>,
}

#[derive(Debug, Default)]
struct ContextCache {
    last_used: u64,
    shapes: HashMap<IndexId, Vec<IndexRowBuffer>>,
}

impl IndexRowPool {
    /// A pool retaining buffers for up to `capacity` distinct storage
    /// contexts. Zero is rounded up to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            contexts: HashMap::new(),
        }
    }

    /// Pop the most recently returned idle buffer for this shape, or
    /// construct a new one bound to `index`. The returned buffer is always
    /// in its pristine state. Idle buffers bound to a superseded definition
    /// carrying the same id are discarded rather than handed back.
    pub fn take(&mut self, context: ContextId, index: &Arc<IndexDef>) -> IndexRowBuffer {
        let cache = self.touch(context);
        if let Some(stack) = cache.shapes.get_mut(&index.id()) {
            while let Some(mut buffer) = stack.pop() {
                if Arc::ptr_eq(buffer.index(), index) {
                    buffer.reset();
                    return buffer;
                }
                debug!(shape = %index.id(), "dropping idle buffer bound to a superseded shape");
            }
        }
        IndexRowBuffer::new(Arc::clone(index))
    }

    /// Discard every idle buffer held for one shape in one context, for use
    /// when the shape's definition goes stale.
    pub fn drop_shape(&mut self, context: ContextId, shape: IndexId) {
        if let Some(cache) = self.contexts.get_mut(&context) {
            if let Some(stack) = cache.shapes.remove(&shape) {
                debug!(
                    context = %context,
                    shape = %shape,
                    buffers = stack.len(),
                    "dropping idle buffers for stale shape"
                );
            }
        }
    }

    /// Push an idle buffer back for reuse under its own shape.
    pub fn return_buffer(&mut self, context: ContextId, buffer: IndexRowBuffer) {
        let shape = buffer.index().id();
        let cache = self.touch(context);
        let stack = cache.shapes.entry(shape).or_default();
        debug_assert!(
            !stack.iter().any(|idle| idle.serial() == buffer.serial()),
            "buffer {} returned twice to context {context}",
            buffer.serial()
        );
        stack.push(buffer);
    }

    /// Number of storage contexts currently cached.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Number of idle buffers held for one (context, shape) pair.
    pub fn idle_count(&self, context: ContextId, shape: IndexId) -> usize {
        self.contexts
            .get(&context)
            .and_then(|cache| cache.shapes.get(&shape))
            .map_or(0, Vec::len)
    }

    /// Mark `context` as most recently used, admitting it if absent and
    /// evicting the least recently used entry when over capacity.
    fn touch(&mut self, context: ContextId) -> &mut ContextCache {
        self.tick += 1;
        if !self.contexts.contains_key(&context) && self.contexts.len() == self.capacity {
            if let Some((&coldest, _)) = self
                .contexts
                .iter()
                .min_by_key(|(_, cache)| cache.last_used)
            {
                let dropped = self.contexts.remove(&coldest);
                let buffers: usize = dropped
                    .iter()
                    .flat_map(|cache| cache.shapes.values())
                    .map(Vec::len)
                    .sum();
                debug!(context = %coldest, buffers, "evicting idle index row buffers");
            }
        }
        let cache = self.contexts.entry(context).or_default();
        cache.last_used = self.tick;
        cache
    }
}
