//! Per-scope cache of evaluation contexts.
//!
//! Each debug scope owns at most one slot: the snapshot the cached contexts were built from and
//! the contexts themselves, keyed by [`MetadataContextId`]. Slots are immutable once published.
//!
//! # Thread Safety
//!
//! The slot map is a [`DashMap`] of `Arc`-shared slots. Readers clone the `Arc` out under the
//! shard lock and work on the clone. Writers build a complete replacement slot and swap it in
//! under the entry lock, so a reader never sees a half-written slot. Two concurrent writers for
//! the same scope race benignly: the last one wins and the loser's context is rebuilt on a
//! later request.
//!
//! Every scope also carries an epoch that [`ContextCache::invalidate`] advances. A writer
//! passes the epoch it read before building its snapshot, and [`ContextCache::put`] discards
//! the write if the scope was invalidated in between.

use std::{collections::HashMap, sync::Arc};

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

use crate::{
    evaluation::{MethodLocation, ModuleEvent, ModuleEventListener, ReuseConstraints, ScopeId},
    metadata::{references::MetadataContextId, snapshot::MetadataSnapshot},
};

/// A context together with the locations it may serve
pub struct CachedContext<C> {
    /// Where the context is valid
    pub constraints: ReuseConstraints,
    /// The compiler's context
    pub context: Arc<C>,
}

impl<C> Clone for CachedContext<C> {
    fn clone(&self) -> Self {
        CachedContext {
            constraints: self.constraints,
            context: Arc::clone(&self.context),
        }
    }
}

/// The cache slot of one scope.
pub struct MetadataContext<'a, C> {
    snapshot: MetadataSnapshot<'a>,
    contexts: HashMap<MetadataContextId, CachedContext<C>>,
}

impl<'a, C> MetadataContext<'a, C> {
    /// The snapshot the contexts were built from
    #[must_use]
    pub fn snapshot(&self) -> &MetadataSnapshot<'a> {
        &self.snapshot
    }

    /// True if the slot was built from exactly `snapshot`
    #[must_use]
    pub fn matches(&self, snapshot: &MetadataSnapshot<'a>) -> bool {
        self.snapshot.matches(snapshot)
    }

    /// The cached context for `id`
    #[must_use]
    pub fn get(&self, id: MetadataContextId) -> Option<&CachedContext<C>> {
        self.contexts.get(&id)
    }

    /// Number of cached contexts
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// True if no context is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Cache of evaluation contexts, one slot per debug scope.
pub struct ContextCache<'a, C> {
    slots: DashMap<ScopeId, Arc<MetadataContext<'a, C>>>,
    epochs: DashMap<ScopeId, u64>,
}

impl<C> Default for ContextCache<'_, C> {
    fn default() -> Self {
        ContextCache {
            slots: DashMap::new(),
            epochs: DashMap::new(),
        }
    }
}

impl<'a, C> ContextCache<'a, C> {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `scope` was invalidated
    #[must_use]
    pub fn epoch(&self, scope: ScopeId) -> u64 {
        self.epochs.get(&scope).map_or(0, |epoch| *epoch.value())
    }

    /// The current slot of `scope`
    #[must_use]
    pub fn get(&self, scope: ScopeId) -> Option<Arc<MetadataContext<'a, C>>> {
        self.slots.get(&scope).map(|slot| Arc::clone(slot.value()))
    }

    /// A context usable at `method`, if the slot of `scope` was built from `snapshot` and
    /// holds a context for `id` whose constraints are satisfied
    #[must_use]
    pub fn lookup(
        &self,
        scope: ScopeId,
        snapshot: &MetadataSnapshot<'a>,
        id: MetadataContextId,
        method: &MethodLocation,
    ) -> Option<Arc<C>> {
        let slot = self.get(scope)?;
        if !slot.matches(snapshot) {
            return None;
        }

        let cached = slot.get(id)?;
        cached
            .constraints
            .are_satisfied(
                method.module_version_id,
                method.method_token,
                method.method_version,
                method.il_offset,
            )
            .then(|| Arc::clone(&cached.context))
    }

    /// Publish `cached` for `id` in the slot of `scope`.
    ///
    /// `epoch` is the value of [`ContextCache::epoch`] read before `snapshot` was built. If the
    /// scope was invalidated since, nothing is stored and `false` is returned. If the current
    /// slot was built from the same snapshot its other contexts are carried over; otherwise the
    /// new slot holds only `cached`.
    pub fn put(
        &self,
        scope: ScopeId,
        epoch: u64,
        snapshot: MetadataSnapshot<'a>,
        id: MetadataContextId,
        cached: CachedContext<C>,
    ) -> bool {
        // Checked under the entry lock. `invalidate` advances the epoch before removing the slot.
        let entry = self.slots.entry(scope);
        if self.epoch(scope) != epoch {
            debug!(%scope, epoch, "scope invalidated during compile, not caching");
            return false;
        }

        match entry {
            Entry::Occupied(mut entry) => {
                let mut contexts = if entry.get().matches(&snapshot) {
                    entry.get().contexts.clone()
                } else {
                    debug!(%scope, "replacing cache slot for changed metadata");
                    HashMap::new()
                };
                contexts.insert(id, cached);
                entry.insert(Arc::new(MetadataContext { snapshot, contexts }));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(MetadataContext {
                    snapshot,
                    contexts: HashMap::from([(id, cached)]),
                }));
            }
        }
        true
    }

    /// Drop the slot of `scope` and advance its epoch, returning whether a slot existed
    pub fn invalidate(&self, scope: ScopeId) -> bool {
        *self.epochs.entry(scope).or_insert(0) += 1;
        let removed = self.slots.remove(&scope).is_some();
        if removed {
            debug!(%scope, "dropped cache slot");
        }
        removed
    }

    /// True if `scope` has a slot
    #[must_use]
    pub fn contains(&self, scope: ScopeId) -> bool {
        self.slots.contains_key(&scope)
    }

    /// Number of scopes with a slot
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no scope has a slot
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<C> ModuleEventListener for ContextCache<'_, C> {
    fn on_module_event(&self, event: ModuleEvent) {
        debug!(%event, scope = %event.scope(), "module event");
        self.invalidate(event.scope());
    }
}
