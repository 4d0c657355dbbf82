//! # Data states, roots, and scopes
//!
//! Chainscope models every piece of remotely fetched data as a small reactive
//! object instead of ad-hoc loading flags. There are three main pieces:
//!
//! - `Root<T>`: a snapshot that is exactly one of Loading, Value or Error.
//! - `DataState<T>`: a root over time plus the behavior to refresh it.
//! - `Scope`: the lifetime of the UI subtree that owns the states.
//!
//! ## Fetching
//!
//! A `DataState` is built from a `FetchConfig`: an async fetcher plus a typed
//! argument tuple. `fetch()` runs it and installs the outcome:
//!
//! ```rust
//! use chainscope_core::*;
//!
//! let state = DataState::new(FetchConfig::new((Some(21u64),), |(n,): (u64,)| async move {
//!     Ok::<_, anyhow::Error>(n * 2)
//! }));
//! assert!(state.is_loading());
//! assert_eq!(pollster::block_on(state.fetch()), Root::Value(42));
//! ```
//!
//! Arguments that are not ready yet (`None`, JSON `null`) gate the fetch: the
//! fetcher is not called and the root stays as it was.
//!
//! ## Remembered states
//!
//! Render code does not build states directly. `remember_data_state` keys the
//! state to a slot of the current scope, keeps the first fetcher it was given,
//! and refetches only when the argument tuple changes by value:
//!
//! ```rust
//! use chainscope_core::*;
//! use futures::executor::LocalPool;
//!
//! let mut pool = LocalPool::new();
//! let scope = Scope::with_spawner(pool.spawner());
//!
//! let render = |height: u64| {
//!     scope.run(|| {
//!         remember_data_state(
//!             "block",
//!             FetchConfig::new((height,), |(h,): (u64,)| async move {
//!                 Ok::<_, anyhow::Error>(format!("block #{h}"))
//!             }),
//!         )
//!     })
//! };
//!
//! let block = render(100);
//! pool.run_until_stalled();
//! assert_eq!(block.root(), Root::Value("block #100".to_string()));
//!
//! render(101);
//! pool.run_until_stalled();
//! assert_eq!(block.root(), Root::Value("block #101".to_string()));
//! ```
//!
//! ## Derived states
//!
//! `transform` and `compose` build read-only states that follow their
//! upstreams. They never fetch on their own.
//!
//! ## Teardown
//!
//! Disposing the owning `Scope` stops a state from accepting further roots,
//! so a fetch that resolves after unmount is dropped.

pub mod data_state;
pub mod derived;
pub mod effects;
pub mod error;
pub mod fetch;
pub mod http;
pub mod prelude;
pub mod root;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod state;

pub use data_state::*;
pub use derived::*;
pub use effects::*;
pub use error::*;
pub use fetch::*;
pub use http::*;
pub use root::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
pub use state::*;
