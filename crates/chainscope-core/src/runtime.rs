use std::rc::Rc;

use crate::data_state::DataState;
use crate::fetch::{ArgList, FetchConfig, FetchDriver};
use crate::scope::current_scope;

/// Key-based remember in the current scope. Outside any scope nothing is
/// retained and `init` runs on every call.
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key: String = key.into();
    match current_scope() {
        Some(scope) => scope.remember(key, init),
        None => {
            log::warn!("remember_with_key: no current scope; slot '{key}' not kept");
            Rc::new(init())
        }
    }
}

/// Drops the current scope's slot under `key`.
pub fn forget_key(key: &str) -> bool {
    current_scope().is_some_and(|scope| scope.forget(key))
}

struct FetchSlot<T: Clone + 'static, A: ArgList> {
    driver: Rc<FetchDriver<T, A>>,
    state: DataState<T>,
}

/// Component-level entrypoint for fetched data.
///
/// The first call under `key` in the current scope creates the state (in
/// Loading) and captures the fetcher; later calls in that scope drop their
/// fetcher and only offer their arguments, which replace the stored ones if
/// they differ by value. Every call then runs [`DataState::init`] against the
/// scope, so the fetch happens once on mount and once per argument change.
/// The slot lives until the scope is disposed.
pub fn remember_data_state<T, A>(key: impl Into<String>, config: FetchConfig<T, A>) -> DataState<T>
where
    T: Clone + 'static,
    A: ArgList,
{
    let key = key.into();
    let Some(scope) = current_scope() else {
        log::warn!("data state '{key}': no current scope; fetch not launched");
        return DataState::new(config);
    };
    let args = config.args().clone();

    let slot = scope.remember(format!("data_state:{key}"), || {
        let driver = Rc::new(FetchDriver::new(config));
        let state = DataState::from_driver(driver.clone(), crate::Root::loading());
        FetchSlot { driver, state }
    });

    if slot.driver.offer_args(args) {
        log::debug!("data state '{key}': arguments changed");
    }
    slot.state.init(&scope);

    slot.state.clone()
}
