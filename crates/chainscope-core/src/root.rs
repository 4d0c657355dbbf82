use crate::error::DataError;

/// Snapshot of one async value: exactly one of loading, a value, or an error.
#[derive(Clone, Debug, PartialEq)]
pub enum Root<T> {
    Loading,
    Value(T),
    Error(DataError),
}

/// Payload-free view of a [`Root`], handy for logging and assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootTag {
    Loading,
    Value,
    Error,
}

impl<T> Root<T> {
    pub fn loading() -> Self {
        Root::Loading
    }

    pub fn value(v: T) -> Self {
        Root::Value(v)
    }

    /// Normalizes `raw` into a [`DataError`], applies `prefix`, and logs the
    /// result. This is the only place error roots are created, so each
    /// surfaced error is reported exactly once.
    pub fn error(raw: impl Into<DataError>, prefix: Option<&str>) -> Self {
        let mut err = raw.into();
        if let Some(prefix) = prefix {
            err.prefix(prefix);
        }
        log::error!("data error: {err}");
        Root::Error(err)
    }

    pub fn tag(&self) -> RootTag {
        match self {
            Root::Loading => RootTag::Loading,
            Root::Value(_) => RootTag::Value,
            Root::Error(_) => RootTag::Error,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Root::Loading)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Root::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&DataError> {
        match self {
            Root::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Root::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::capture_logs;

    fn exactly_one_state<T>(root: &Root<T>) -> bool {
        let flags = [
            root.is_loading(),
            root.as_value().is_some(),
            root.as_error().is_some(),
        ];
        flags.iter().filter(|f| **f).count() == 1
    }

    #[test]
    fn constructors_are_structurally_equal() {
        assert_eq!(Root::<u8>::loading(), Root::<u8>::loading());
        assert_eq!(Root::value("0xabc"), Root::value("0xabc"));
    }

    #[test]
    fn every_root_is_in_exactly_one_state() {
        let (roots, _) = capture_logs(|| {
            vec![
                Root::loading(),
                Root::value(7u32),
                Root::error("rpc unavailable", None),
            ]
        });
        for root in &roots {
            assert!(exactly_one_state(root), "{root:?}");
        }
        let tags: Vec<RootTag> = roots.iter().map(Root::tag).collect();
        assert_eq!(tags, [RootTag::Loading, RootTag::Value, RootTag::Error]);
    }

    #[test]
    fn error_object_gets_prefixed_and_logged_once() {
        let (root, logs) =
            capture_logs(|| Root::<()>::error(anyhow::anyhow!("x"), Some("prefix:")));
        let err = root.as_error().expect("error root");
        assert!(err.message().starts_with("prefix: x"));
        assert_eq!(logs.errors(), 1);
    }

    #[test]
    fn raw_string_becomes_message() {
        let (root, logs) = capture_logs(|| Root::<()>::error("raw string", None));
        assert_eq!(root.as_error().map(DataError::message), Some("raw string"));
        assert_eq!(logs.errors(), 1);
    }

    #[test]
    fn loading_and_value_do_not_log() {
        let (_, logs) = capture_logs(|| (Root::<u8>::loading(), Root::value(1u8)));
        assert!(logs.is_empty());
    }
}
