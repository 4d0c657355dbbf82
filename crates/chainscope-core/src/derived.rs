//! Derived data states.
//!
//! A derived state never fetches on its own. It mirrors its upstream root(s)
//! through a pure mapping, recomputed on every upstream install, and its
//! `fetch()` awaits the upstream fetch(es) and resolves to the mirrored root.

use std::rc::Rc;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use smallvec::SmallVec;

use crate::data_state::{DataState, Driver};
use crate::error::DataError;
use crate::root::Root;

const IMPOSSIBLE_STATE: &str =
    "impossible state: composed data is neither loading nor has a value or an error";

/// Applies `f` to a value root; Loading and Error pass through untouched.
/// A failing `f` yields a new error root.
pub fn map_root<T, U>(root: &Root<T>, f: impl FnOnce(&T) -> anyhow::Result<U>) -> Root<U> {
    match root {
        Root::Loading => Root::Loading,
        Root::Error(err) => Root::Error(err.clone()),
        Root::Value(value) => match f(value) {
            Ok(mapped) => Root::value(mapped),
            Err(err) => Root::error(err, None),
        },
    }
}

/// Loading wins, then a pair of values, then the error(s).
pub fn compose_roots<T: Clone, O: Clone>(left: &Root<T>, right: &Root<O>) -> Root<(T, O)> {
    match (left, right) {
        (Root::Loading, _) | (_, Root::Loading) => Root::Loading,
        (Root::Value(l), Root::Value(r)) => Root::value((l.clone(), r.clone())),
        _ => {
            let errors: SmallVec<[&DataError; 2]> =
                left.as_error().into_iter().chain(right.as_error()).collect();
            match errors.as_slice() {
                [] => Root::error(IMPOSSIBLE_STATE, None),
                [only] => Root::error(
                    DataError::new(only.message()).caused_by([(*only).clone()]),
                    None,
                ),
                [first, second, ..] => Root::error(
                    DataError::new(format!("{first}; {second}"))
                        .caused_by([(*first).clone(), (*second).clone()]),
                    None,
                ),
            }
        }
    }
}

type MapFn<S, T> = Rc<dyn Fn(&Root<S>) -> Root<T>>;

struct TransformDriver<S: Clone + 'static> {
    upstream: DataState<S>,
}

// The upstream install already reached the derived state through `follow`,
// so a derived fetch only waits for it and reports the mirrored root.
impl<S: Clone + 'static, T: Clone + 'static> Driver<T> for TransformDriver<S> {
    fn fetch(&self, state: DataState<T>) -> LocalBoxFuture<'static, Root<T>> {
        let upstream = self.upstream.fetch();
        async move {
            upstream.await;
            state.root()
        }
        .boxed_local()
    }
}

struct ComposeDriver<T: Clone + 'static, O: Clone + 'static> {
    left: DataState<T>,
    right: DataState<O>,
}

impl<T: Clone + 'static, O: Clone + 'static> Driver<(T, O)> for ComposeDriver<T, O> {
    fn fetch(&self, state: DataState<(T, O)>) -> LocalBoxFuture<'static, Root<(T, O)>> {
        let both = future::join(self.left.fetch(), self.right.fetch());
        async move {
            both.await;
            state.root()
        }
        .boxed_local()
    }
}

impl<T: Clone + 'static> DataState<T> {
    /// Derived state holding `f(value)` while this state holds a value.
    pub fn transform<U, F>(&self, f: F) -> DataState<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> anyhow::Result<U> + 'static,
    {
        self.transform_with((), move |value, _| f(value))
    }

    /// Like [`DataState::transform`], with extra arguments passed to `f`.
    pub fn transform_with<U, A, F>(&self, args: A, f: F) -> DataState<U>
    where
        U: Clone + 'static,
        A: 'static,
        F: Fn(&T, &A) -> anyhow::Result<U> + 'static,
    {
        let map: MapFn<T, U> =
            Rc::new(move |root: &Root<T>| map_root(root, |value| f(value, &args)));
        let initial = self.with_root(|root| map(root));
        let driver = Rc::new(TransformDriver {
            upstream: self.clone(),
        });
        let derived = DataState::from_driver(driver, initial);
        derived.follow(self, move |root| map(root));
        derived
    }

    /// Derived state pairing this state's value with `other`'s.
    pub fn compose<O: Clone + 'static>(&self, other: &DataState<O>) -> DataState<(T, O)> {
        let initial = self.with_root(|l| other.with_root(|r| compose_roots(l, r)));
        let driver = Rc::new(ComposeDriver {
            left: self.clone(),
            right: other.clone(),
        });
        let derived = DataState::from_driver(driver, initial);

        let right = other.downgrade();
        derived.follow(self, move |l| match right.upgrade() {
            Some(right) => right.with_root(|r| compose_roots(l, r)),
            None => Root::error("composed data source was dropped", None),
        });
        let left = self.downgrade();
        derived.follow(other, move |r| match left.upgrade() {
            Some(left) => left.with_root(|l| compose_roots(l, r)),
            None => Root::error("composed data source was dropped", None),
        });
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchConfig;
    use crate::RootTag;
    use crate::scope::Scope;
    use crate::tests::support::capture_logs;
    use std::cell::{Cell, RefCell};

    fn manual<T: Clone + 'static>() -> DataState<T> {
        DataState::new(FetchConfig::new((), |(): ()| async {
            Err::<T, _>(anyhow::anyhow!("manual state has no source"))
        }))
    }

    fn record<T: Clone + 'static>(
        state: &DataState<T>,
    ) -> (Rc<RefCell<Vec<Root<T>>>>, crate::Dispose) {
        let seen: Rc<RefCell<Vec<Root<T>>>> = Rc::default();
        let sink = seen.clone();
        let guard = state.subscribe(move |root| sink.borrow_mut().push(root.clone()));
        (seen, guard)
    }

    #[test]
    fn transform_follows_upstream_sequence() {
        let upstream = manual::<i64>();
        let doubled = upstream.transform(|x| Ok(x * 2));
        assert!(doubled.is_loading());
        let (seen, _guard) = record(&doubled);

        upstream.set_value(5);
        let (_, logs) = capture_logs(|| upstream.set_error("E", None));

        let expected_error = Root::Error(DataError::new("E"));
        assert_eq!(*seen.borrow(), vec![Root::Value(10), expected_error]);
        // The propagated error is not logged a second time.
        assert_eq!(logs.errors(), 1);
    }

    #[test]
    fn transform_failure_stays_on_the_derived_state() {
        let upstream = manual::<String>();
        let parsed = upstream.transform(|raw| Ok(raw.parse::<u64>()?));

        let (_, logs) = capture_logs(|| upstream.set_value("12 gwei".to_string()));
        assert_eq!(upstream.root(), Root::Value("12 gwei".to_string()));
        assert!(parsed.root().as_error().is_some());
        assert_eq!(logs.errors(), 1);

        upstream.set_value("12".to_string());
        assert_eq!(parsed.root(), Root::Value(12));
    }

    #[test]
    fn transform_with_passes_arguments() {
        let upstream = manual::<u64>();
        let scaled = upstream.transform_with(1_000u64, |wei, unit| Ok(wei / unit));
        upstream.set_value(42_000);
        assert_eq!(scaled.root(), Root::Value(42));
    }

    #[test]
    fn transform_starts_from_current_upstream_root() {
        let upstream = manual::<u8>();
        upstream.set_value(3);
        let label = upstream.transform(|n| Ok(format!("#{n}")));
        assert_eq!(label.root(), Root::Value("#3".to_string()));
    }

    #[test]
    fn transform_fetch_awaits_upstream() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let upstream = DataState::new(FetchConfig::new((), move |(): ()| {
            counter.set(counter.get() + 1);
            async { Ok::<_, anyhow::Error>(21u32) }
        }));
        let doubled = upstream.transform(|n| Ok(n * 2));

        let root = pollster::block_on(doubled.fetch());
        assert_eq!(root, Root::Value(42));
        assert_eq!(upstream.root(), Root::Value(21));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn transform_fetch_logs_a_failed_mapping_once() {
        let upstream = DataState::new(FetchConfig::new((), |(): ()| async {
            Ok::<_, anyhow::Error>("x".to_string())
        }));
        let parsed = upstream.transform(|raw| Ok(raw.parse::<u64>()?));
        let (seen, _guard) = record(&parsed);

        let (root, logs) = capture_logs(|| pollster::block_on(parsed.fetch()));
        assert!(root.as_error().is_some());
        assert_eq!(logs.errors(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(*seen.borrow(), vec![root]);
    }

    #[test]
    fn compose_fetch_logs_the_composed_error_once() {
        let left = DataState::new(FetchConfig::new((), |(): ()| async {
            Err::<u32, _>(anyhow::anyhow!("E1"))
        }));
        let right = DataState::new(FetchConfig::new((), |(): ()| async {
            Ok::<_, anyhow::Error>(1u32)
        }));
        let pair = left.compose(&right);
        let (seen, _guard) = record(&pair);

        let (root, logs) = capture_logs(|| pollster::block_on(pair.fetch()));
        assert_eq!(root.as_error().map(DataError::message), Some("E1"));
        // One for the upstream failure, one for the composed error.
        assert_eq!(logs.errors(), 2);
        let errors = seen.borrow().iter().filter(|r| r.as_error().is_some()).count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn compose_aggregation_rules() {
        let (number, text) = (manual::<u32>(), manual::<&'static str>());
        let pair = number.compose(&text);
        assert!(pair.is_loading());

        text.set_value("a");
        assert!(pair.is_loading(), "one side still loading");

        number.set_value(1);
        assert_eq!(pair.root(), Root::Value((1, "a")));

        let (_, _) = capture_logs(|| number.set_error("E1", None));
        let only = pair.root();
        let only = only.as_error().expect("error root");
        assert_eq!(only.message(), "E1");
        assert_eq!(only.causes().count(), 1);

        let (_, _) = capture_logs(|| text.set_error("E2", None));
        let both = pair.root();
        let both = both.as_error().expect("error root");
        assert!(both.message().contains("E1") && both.message().contains("E2"));
        let causes: Vec<&str> = both.causes().map(DataError::message).collect();
        assert_eq!(causes, ["E1", "E2"]);
    }

    #[test]
    fn compose_loading_beats_error() {
        let (left, right) = (manual::<u8>(), manual::<u8>());
        let pair = left.compose(&right);
        let _ = capture_logs(|| right.set_error("down", None));
        assert!(pair.is_loading());
    }

    #[test]
    fn compose_roots_covers_every_tag_pair() {
        let err = || Root::<u8>::Error(DataError::new("x"));
        let cases = [
            (Root::Loading, Root::Value(1), RootTag::Loading),
            (Root::Value(1), Root::Loading, RootTag::Loading),
            (Root::Loading, err(), RootTag::Loading),
            (Root::Value(1), Root::Value(2), RootTag::Value),
            (err(), Root::Value(2), RootTag::Error),
            (Root::Value(1), err(), RootTag::Error),
            (err(), err(), RootTag::Error),
        ];
        let (results, _) = capture_logs(|| {
            cases
                .iter()
                .map(|(l, r, expected)| (compose_roots(l, r).tag(), *expected))
                .collect::<Vec<_>>()
        });
        for (got, expected) in results {
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn compose_fetch_joins_both_upstreams() {
        let left = DataState::new(FetchConfig::new((), |(): ()| async {
            Ok::<_, anyhow::Error>("eth")
        }));
        let right = DataState::new(FetchConfig::new((), |(): ()| async {
            Ok::<_, anyhow::Error>(3_100u32)
        }));
        let pair = left.compose(&right);
        assert_eq!(pollster::block_on(pair.fetch()), Root::Value(("eth", 3_100)));
    }

    #[test]
    fn dropping_a_derived_state_unsubscribes() {
        let upstream = manual::<u8>();
        let derived = upstream.transform(|n| Ok(*n));
        let pair = upstream.compose(&derived);
        assert_eq!(upstream.subscriber_count(), 2);
        drop(pair);
        assert_eq!(upstream.subscriber_count(), 1);
        drop(derived);
        assert_eq!(upstream.subscriber_count(), 0);
    }

    #[test]
    fn rebuilt_derived_states_do_not_accumulate_disposers() {
        let scope = Scope::new();
        let upstream = scope.run(manual::<u8>);
        assert_eq!(scope.disposer_count(), 1);
        for _ in 0..5 {
            let label = scope.run(|| upstream.transform(|n| Ok(n.to_string())));
            let _pair = scope.run(|| upstream.compose(&label));
        }
        assert_eq!(scope.disposer_count(), 1);
        assert_eq!(upstream.subscriber_count(), 0);
    }

    #[test]
    fn scope_disposal_tears_down_derived_states() {
        let scope = Scope::new();
        let upstream = manual::<u8>();
        let derived = scope.run(|| upstream.transform(|n| Ok(n + 1)));
        scope.dispose();

        upstream.set_value(1);
        assert!(!derived.is_alive());
        assert!(derived.is_loading());
        assert_eq!(upstream.subscriber_count(), 0);
    }
}
