//! Fetch configuration and the executor that turns a fetch into a [`Root`].
//!
//! Arguments are typed tuples. Each element reports whether it is ready
//! (`Option::None` and JSON `null` are not), and the executor skips the
//! fetcher entirely until every element is. That is how a fetch waits on a
//! prerequisite: pass the upstream value as `Option` and it fires once it
//! becomes `Some`.

use std::fmt::Debug;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;

use crate::data_state::{DataState, Driver};
use crate::http::{self, HttpClient};
use crate::root::Root;
use crate::state::{LaunchGate, Stabilized};

pub type FetchFuture<T> = LocalBoxFuture<'static, anyhow::Result<T>>;

pub type Fetcher<T, A> = Rc<dyn Fn(<A as ArgList>::Ready) -> FetchFuture<T>>;

/// One positional fetch argument.
pub trait Arg: Clone + PartialEq + Debug + 'static {
    type Ready: 'static;

    /// `None` while the argument is still undefined.
    fn ready(&self) -> Option<Self::Ready>;
}

/// The whole argument list, compared by value to detect changes.
pub trait ArgList: Clone + PartialEq + Debug + 'static {
    type Ready: 'static;

    fn ready(&self) -> Option<Self::Ready>;
}

impl<T: Clone + PartialEq + Debug + 'static> Arg for Option<T> {
    type Ready = T;

    fn ready(&self) -> Option<T> {
        self.clone()
    }
}

impl Arg for serde_json::Value {
    type Ready = serde_json::Value;

    fn ready(&self) -> Option<serde_json::Value> {
        (!self.is_null()).then(|| self.clone())
    }
}

impl<T: Arg> Arg for Vec<T> {
    type Ready = Vec<T::Ready>;

    fn ready(&self) -> Option<Vec<T::Ready>> {
        self.iter().map(Arg::ready).collect()
    }
}

macro_rules! always_ready {
    ($($t:ty),* $(,)?) => {
        $(
            impl Arg for $t {
                type Ready = $t;

                fn ready(&self) -> Option<$t> {
                    Some(self.clone())
                }
            }
        )*
    };
}

always_ready!(
    String,
    &'static str,
    bool,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i32,
    i64,
    f64,
);

impl ArgList for () {
    type Ready = ();

    fn ready(&self) -> Option<()> {
        Some(())
    }
}

macro_rules! tuple_args {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Arg),+> ArgList for ($($name,)+) {
            type Ready = ($($name::Ready,)+);

            fn ready(&self) -> Option<Self::Ready> {
                Some(($(self.$idx.ready()?,)+))
            }
        }
    };
}

tuple_args!(A.0);
tuple_args!(A.0, B.1);
tuple_args!(A.0, B.1, C.2);
tuple_args!(A.0, B.1, C.2, D.3);

/// Per-fetch extras applied by the executor.
pub struct FetchOptions<T> {
    pub error_prefix: Option<String>,
    pub post: Option<Rc<dyn Fn(T) -> T>>,
}

impl<T> Default for FetchOptions<T> {
    fn default() -> Self {
        Self {
            error_prefix: None,
            post: None,
        }
    }
}

impl<T> Clone for FetchOptions<T> {
    fn clone(&self) -> Self {
        Self {
            error_prefix: self.error_prefix.clone(),
            post: self.post.clone(),
        }
    }
}

/// How to obtain a `T`: a fetcher plus its argument list.
pub struct FetchConfig<T, A: ArgList> {
    fetcher: Fetcher<T, A>,
    args: A,
    options: FetchOptions<T>,
}

impl<T: 'static, A: ArgList> FetchConfig<T, A> {
    pub fn new<F, Fut>(args: A, fetcher: F) -> Self
    where
        F: Fn(A::Ready) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
    {
        Self {
            fetcher: Rc::new(move |ready| fetcher(ready).boxed_local()),
            args,
            options: FetchOptions::default(),
        }
    }

    /// Prefix applied to the message of every fetch error.
    pub fn error_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.error_prefix = Some(prefix.into());
        self
    }

    /// Post-processes each successful result before it is installed.
    pub fn post_process(mut self, f: impl Fn(T) -> T + 'static) -> Self {
        self.options.post = Some(Rc::new(f));
        self
    }

    pub fn args(&self) -> &A {
        &self.args
    }
}

impl<T, U> FetchConfig<T, (U,)>
where
    T: DeserializeOwned + 'static,
    U: Arg,
    U::Ready: AsRef<str>,
{
    /// Default fetcher: GET the single argument as a URL and decode the JSON
    /// `result` (or the whole body) into `T`.
    pub fn json(client: Rc<dyn HttpClient>, url: U) -> Self {
        Self::new((url,), move |(url,)| {
            let client = client.clone();
            async move {
                http::get_json::<T>(client.as_ref(), url.as_ref())
                    .await
                    .map_err(anyhow::Error::from)
            }
        })
    }
}

/// Runs one fetch. Returns `None` without calling the fetcher when any
/// argument is not ready.
pub async fn execute<T, A>(
    fetcher: &Fetcher<T, A>,
    args: &A,
    options: &FetchOptions<T>,
) -> Option<Root<T>>
where
    T: 'static,
    A: ArgList,
{
    let Some(ready) = args.ready() else {
        log::debug!("fetch skipped, arguments not ready: {args:?}");
        return None;
    };
    let root = match fetcher(ready).await {
        Ok(value) => match &options.post {
            Some(post) => Root::value(post(value)),
            None => Root::value(value),
        },
        Err(err) => Root::error(err, options.error_prefix.as_deref()),
    };
    Some(root)
}

/// Driver of a directly fetched state. The fetcher is fixed at construction;
/// only the arguments can change.
pub(crate) struct FetchDriver<T, A: ArgList> {
    fetcher: Fetcher<T, A>,
    args: Stabilized<A>,
    gate: LaunchGate,
    options: FetchOptions<T>,
}

impl<T: 'static, A: ArgList> FetchDriver<T, A> {
    pub(crate) fn new(config: FetchConfig<T, A>) -> Self {
        Self {
            fetcher: config.fetcher,
            args: Stabilized::new(config.args),
            gate: LaunchGate::new(),
            options: config.options,
        }
    }

    pub(crate) fn offer_args(&self, args: A) -> bool {
        self.args.offer(args)
    }
}

impl<T: Clone + 'static, A: ArgList> Driver<T> for FetchDriver<T, A> {
    fn fetch(&self, state: DataState<T>) -> LocalBoxFuture<'static, Root<T>> {
        let fetcher = self.fetcher.clone();
        let args = self.args.get();
        let options = self.options.clone();
        async move {
            match execute(&fetcher, &args, &options).await {
                Some(root) => state.install(root),
                None => state.root(),
            }
        }
        .boxed_local()
    }

    fn pending_launch(&self) -> Option<u64> {
        let revision = self.args.revision();
        self.gate.is_pending(revision).then_some(revision)
    }

    fn mark_launched(&self, revision: u64) {
        self.gate.mark(revision);
    }
}
