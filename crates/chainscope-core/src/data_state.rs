use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};

use crate::effects::{Callback, Dispose};
use crate::error::DataError;
use crate::fetch::{ArgList, FetchConfig, FetchDriver};
use crate::root::Root;
use crate::scope::{DisposerId, Scope, WeakScope, current_scope};
use crate::signal::{Signal, signal};

/// Where a state's roots come from: a fetcher, or one or more upstream states.
pub(crate) trait Driver<T: Clone + 'static> {
    /// Produces a root, installs it on `state`, and returns it.
    fn fetch(&self, state: DataState<T>) -> LocalBoxFuture<'static, Root<T>>;

    /// Argument revision that `init` has not launched yet, if any.
    fn pending_launch(&self) -> Option<u64> {
        None
    }

    fn mark_launched(&self, _revision: u64) {}
}

struct Shared<T: Clone + 'static> {
    root: Signal<Root<T>>,
    driver: Rc<dyn Driver<T>>,
    scope: WeakScope,
    alive: Cell<bool>,
    /// Upstream subscriptions, released on teardown.
    follows: RefCell<Vec<Dispose>>,
    /// This state's teardown hook in its scope, removed again on drop.
    unmount: Cell<Option<DisposerId>>,
}

impl<T: Clone + 'static> Shared<T> {
    fn teardown(&self) {
        self.alive.set(false);
        let follows = std::mem::take(&mut *self.follows.borrow_mut());
        for d in follows {
            d.run();
        }
    }
}

impl<T: Clone + 'static> Drop for Shared<T> {
    fn drop(&mut self) {
        self.teardown();
        if let (Some(id), Some(scope)) = (self.unmount.take(), self.scope.upgrade()) {
            scope.remove_disposer(id);
        }
    }
}

/// A [`Root`] over time, plus the behavior to refresh it.
///
/// Handles are cheap to clone and share one root. Derived states (see
/// [`DataState::transform`] and [`DataState::compose`]) hold their upstream
/// handles for reading only.
pub struct DataState<T: Clone + 'static> {
    shared: Rc<Shared<T>>,
}

/// Non-owning [`DataState`] handle.
pub struct WeakDataState<T: Clone + 'static> {
    shared: Weak<Shared<T>>,
}

impl<T: Clone + 'static> Clone for DataState<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + 'static> Clone for WeakDataState<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + 'static> WeakDataState<T> {
    pub fn upgrade(&self) -> Option<DataState<T>> {
        self.shared.upgrade().map(|shared| DataState { shared })
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for DataState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_root(|root| {
            f.debug_struct("DataState")
                .field("root", root)
                .field("alive", &self.shared.alive.get())
                .finish()
        })
    }
}

impl<T: Clone + 'static> DataState<T> {
    /// Fetched state, starting in Loading. Call [`DataState::init`] (or use
    /// [`remember_data_state`](crate::remember_data_state)) to run the fetch.
    pub fn new<A: ArgList>(config: FetchConfig<T, A>) -> Self {
        Self::from_driver(Rc::new(FetchDriver::new(config)), Root::loading())
    }

    /// Binds the new state to the current scope: when that scope is disposed
    /// the state stops accepting roots and drops its upstream subscriptions.
    pub(crate) fn from_driver(driver: Rc<dyn Driver<T>>, initial: Root<T>) -> Self {
        let scope = current_scope();
        let shared = Rc::new(Shared {
            root: signal(initial),
            driver,
            scope: scope.as_ref().map(Scope::downgrade).unwrap_or_default(),
            alive: Cell::new(true),
            follows: RefCell::new(Vec::new()),
            unmount: Cell::new(None),
        });
        if let Some(scope) = scope {
            let weak = Rc::downgrade(&shared);
            let id = scope.add_removable_disposer(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.teardown();
                }
            });
            shared.unmount.set(Some(id));
        }
        Self { shared }
    }

    pub fn downgrade(&self) -> WeakDataState<T> {
        WeakDataState {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn root(&self) -> Root<T> {
        self.shared.root.get()
    }

    pub fn with_root<R>(&self, f: impl FnOnce(&Root<T>) -> R) -> R {
        self.shared.root.with(f)
    }

    pub fn is_loading(&self) -> bool {
        self.with_root(Root::is_loading)
    }

    /// False once the owning scope has been disposed.
    pub fn is_alive(&self) -> bool {
        self.shared.alive.get()
    }

    /// Number of live subscriptions, derived states included.
    pub fn subscriber_count(&self) -> usize {
        self.shared.root.subscriber_count()
    }

    /// Calls `f` with every root installed from now on.
    pub fn subscribe(&self, f: impl Fn(&Root<T>) + 'static) -> Dispose {
        let signal = self.shared.root.clone();
        let id = signal.subscribe(f);
        Dispose::new(move || {
            signal.unsubscribe(id);
        })
    }

    pub fn set_loading(&self) {
        self.install(Root::loading());
    }

    pub fn set_value(&self, v: T) {
        self.install(Root::value(v));
    }

    pub fn set_error(&self, raw: impl Into<DataError>, prefix: Option<&str>) {
        self.install(Root::error(raw, prefix));
    }

    /// Replaces the current root, unless the state has been torn down.
    pub(crate) fn install(&self, root: Root<T>) -> Root<T> {
        if !self.shared.alive.get() {
            log::debug!("data state torn down; dropping late {:?} root", root.tag());
            return root;
        }
        self.shared.root.set(root.clone());
        root
    }

    /// Runs the fetch and installs its outcome. Gated fetches resolve to the
    /// current root unchanged. Concurrent calls are independent: whichever
    /// resolves last determines the visible root.
    pub fn fetch(&self) -> LocalBoxFuture<'static, Root<T>> {
        self.shared.driver.fetch(self.clone())
    }

    /// Launches the first fetch on `scope`, and again only after the
    /// stabilized arguments changed value. Returns whether a fetch was
    /// launched.
    /// A revision counts as launched only once the scope accepted the task.
    pub fn init(&self, scope: &Scope) -> bool {
        let Some(revision) = self.shared.driver.pending_launch() else {
            return false;
        };
        let fetch = self.fetch();
        let launched = scope.spawn(async move {
            fetch.await;
        });
        if launched {
            self.shared.driver.mark_launched(revision);
        }
        launched
    }

    /// Spawns `fetch()` on the scope this state was created in.
    pub fn refetch(&self) -> bool {
        match self.shared.scope.upgrade() {
            Some(scope) => {
                let fetch = self.fetch();
                scope.spawn(async move {
                    fetch.await;
                })
            }
            None => {
                log::warn!("refetch requested on a data state without a live scope");
                false
            }
        }
    }

    /// Retry affordance for error fragments. Holds the state weakly.
    pub fn retry_callback(&self) -> Callback {
        let weak = self.downgrade();
        Rc::new(move || {
            if let Some(state) = weak.upgrade() {
                state.refetch();
            }
        })
    }

    /// Resolves with the first root that is not Loading (immediately if the
    /// current one already is).
    pub fn settled(&self) -> LocalBoxFuture<'static, Root<T>> {
        let current = self.root();
        if !current.is_loading() {
            return future::ready(current).boxed_local();
        }
        let (tx, rx) = oneshot::channel();
        let tx = RefCell::new(Some(tx));
        let guard = self.subscribe(move |root| {
            if root.is_loading() {
                return;
            }
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(root.clone());
            }
        });
        let state = self.clone();
        async move {
            let root = rx.await.unwrap_or_else(|_| state.root());
            guard.run();
            root
        }
        .boxed_local()
    }

    /// Recomputes this state from `upstream` on every upstream install.
    pub(crate) fn follow<S: Clone + 'static>(
        &self,
        upstream: &DataState<S>,
        recompute: impl Fn(&Root<S>) -> Root<T> + 'static,
    ) {
        let weak = self.downgrade();
        let guard = upstream.subscribe(move |root| {
            if let Some(state) = weak.upgrade() {
                state.install(recompute(root));
            }
        });
        self.shared.follows.borrow_mut().push(guard);
    }
}
