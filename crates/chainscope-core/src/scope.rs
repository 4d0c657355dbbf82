use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::task::{LocalSpawn, LocalSpawnExt};

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

/// Lifetime of one UI subtree.
///
/// Data states created while a scope is current are torn down with it, and
/// the scope's spawner drives their fetches. Keyed slots belong to the scope
/// that created them, so equal keys in different scopes never share a slot.
/// Dropping the last handle disposes the scope as well.
pub struct Scope {
    inner: Rc<ScopeInner>,
}

/// Non-owning handle; does not keep the subtree alive.
#[derive(Clone, Default)]
pub struct WeakScope(Weak<ScopeInner>);

/// Handle to a registered disposer; see [`Scope::remove_disposer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DisposerId(u64);

struct ScopeInner {
    disposers: RefCell<Vec<(DisposerId, Box<dyn FnOnce()>)>>,
    next_disposer: Cell<u64>,
    children: RefCell<Vec<Scope>>,
    memo_cache: RefCell<HashMap<String, Box<dyn Any>>>,
    spawner: Option<Rc<dyn LocalSpawn>>,
    disposed: Cell<bool>,
}

impl ScopeInner {
    fn new(spawner: Option<Rc<dyn LocalSpawn>>) -> Self {
        Self {
            disposers: RefCell::new(Vec::new()),
            next_disposer: Cell::new(0),
            children: RefCell::new(Vec::new()),
            memo_cache: RefCell::new(HashMap::new()),
            spawner,
            disposed: Cell::new(false),
        }
    }

    fn teardown(&self) {
        self.disposed.set(true);

        // Dispose children first
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.inner.teardown();
        }

        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for (_, disposer) in disposers {
            disposer();
        }

        // Slots may hold data states whose drop reaches back into this scope.
        let slots = std::mem::take(&mut *self.memo_cache.borrow_mut());
        drop(slots);
    }
}

impl Scope {
    /// A scope without a spawner: data states still work, but `init` and
    /// retry callbacks cannot launch fetches.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner::new(None)),
        }
    }

    pub fn with_spawner(spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            inner: Rc::new(ScopeInner::new(Some(Rc::new(spawner)))),
        }
    }

    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT_SCOPE.with(|current| {
            let prev = current.borrow().clone();
            *current.borrow_mut() = Some(Rc::downgrade(&self.inner));
            let result = f();
            *current.borrow_mut() = prev;
            result
        })
    }

    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        self.add_removable_disposer(disposer);
    }

    /// Like [`Scope::add_disposer`], returning an id for early removal.
    pub fn add_removable_disposer(&self, disposer: impl FnOnce() + 'static) -> DisposerId {
        let id = DisposerId(self.inner.next_disposer.get());
        self.inner.next_disposer.set(id.0 + 1);
        if self.inner.disposed.get() {
            // Already torn down: clean up right away.
            disposer();
            return id;
        }
        self.inner
            .disposers
            .borrow_mut()
            .push((id, Box::new(disposer)));
        id
    }

    /// Drops a pending disposer without running it.
    pub fn remove_disposer(&self, id: DisposerId) -> bool {
        let removed = {
            let mut disposers = self.inner.disposers.borrow_mut();
            disposers
                .iter()
                .position(|(pending, _)| *pending == id)
                .map(|at| disposers.remove(at))
        };
        removed.is_some()
    }

    pub fn disposer_count(&self) -> usize {
        self.inner.disposers.borrow().len()
    }

    /// Key-based remember in this scope: `init` runs only the first time
    /// `key` is seen, so the first value wins for identity.
    pub fn remember<T: 'static>(&self, key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
        let key = key.into();
        let existing = {
            let cache = self.inner.memo_cache.borrow();
            match cache.get(&key) {
                Some(slot) => match slot.downcast_ref::<Rc<T>>() {
                    Some(rc) => Some(rc.clone()),
                    None => {
                        log::warn!("remember: key '{key}' reused with a different type; replacing.");
                        None
                    }
                },
                None => None,
            }
        };
        if let Some(rc) = existing {
            return rc;
        }

        // `init` may itself remember other keys, so the cache is not borrowed here.
        let rc: Rc<T> = Rc::new(init());
        let replaced = self
            .inner
            .memo_cache
            .borrow_mut()
            .insert(key, Box::new(rc.clone()));
        drop(replaced);
        rc
    }

    /// Drops the slot stored under `key`; the next `remember` starts fresh.
    pub fn forget(&self, key: &str) -> bool {
        let slot = self.inner.memo_cache.borrow_mut().remove(key);
        slot.is_some()
    }

    /// Child scope sharing this scope's spawner.
    pub fn child(&self) -> Scope {
        let child = Scope {
            inner: Rc::new(ScopeInner::new(self.inner.spawner.clone())),
        };
        self.inner.children.borrow_mut().push(child.clone());
        child
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Rc::downgrade(&self.inner))
    }

    /// Spawns `fut` on this scope's executor. Returns false if the scope is
    /// disposed, has no spawner, or the executor refused the task.
    pub fn spawn(&self, fut: impl Future<Output = ()> + 'static) -> bool {
        if self.inner.disposed.get() {
            log::debug!("scope: not spawning task on a disposed scope");
            return false;
        }
        let Some(spawner) = self.inner.spawner.as_ref() else {
            log::warn!("scope: no spawner installed; task dropped");
            return false;
        };
        match spawner.spawn_local(fut) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("scope: spawn failed: {e}");
                false
            }
        }
    }

    pub fn dispose(self) {
        self.inner.teardown();
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(|inner| Scope { inner })
    }
}

pub fn current_scope() -> Option<Scope> {
    CURRENT_SCOPE.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade().map(|inner| Scope { inner }))
    })
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !self.disposed.get() {
            self.teardown();
        }
    }
}
