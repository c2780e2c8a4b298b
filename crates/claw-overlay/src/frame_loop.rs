//! Per-frame hook registry driven by the host.
//!
//! The host calls [`FrameLoop::run_frame`] once per tick. Components attach a
//! hook under a [`HookId`]; attaching again under the same id replaces the
//! previous hook, so a component can never end up running twice per frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

/// Identity of an attached hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub u64);

impl HookId {
    /// Allocates a process-unique hook id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type Hook = Arc<dyn Fn() + Send + Sync>;

/// Registry of hooks run once per frame.
pub struct FrameLoop {
    id: u64,
    hooks: RwLock<Vec<(HookId, Hook)>>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT.fetch_add(1, Ordering::Relaxed),
            hooks: RwLock::new(Vec::new()),
        }
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("id", &self.id)
            .field("hooks", &self.hook_count())
            .finish()
    }
}

impl FrameLoop {
    /// Creates an empty frame loop.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-unique identity of this loop. Never zero.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Attaches `hook` under `id`, replacing any hook already attached with that id.
    pub fn attach(&self, id: HookId, hook: impl Fn() + Send + Sync + 'static) {
        let mut hooks = self.hooks.write();
        hooks.retain(|(existing, _)| *existing != id);
        hooks.push((id, Arc::new(hook)));
        trace!(hook = id.0, total = hooks.len(), "attached frame hook");
    }

    /// Detaches the hook with `id`. Returns false if none was attached.
    pub fn detach(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|(existing, _)| *existing != id);
        before != hooks.len()
    }

    /// Returns true if a hook with `id` is attached.
    #[must_use]
    pub fn is_attached(&self, id: HookId) -> bool {
        self.hooks.read().iter().any(|(existing, _)| *existing == id)
    }

    /// Number of attached hooks.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }

    /// Runs every attached hook once, in attach order.
    ///
    /// Hooks run outside the registry lock, so they may attach or detach.
    pub fn run_frame(&self) {
        let hooks: Vec<Hook> = self.hooks.read().iter().map(|(_, h)| Arc::clone(h)).collect();
        for hook in hooks {
            hook();
        }
    }
}
