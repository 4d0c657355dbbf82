//! Projection of a [`Root`] onto a [`Fragment`].
//!
//! Loading and error placeholders are chosen by precedence (explicit callback,
//! then message or substitute, then the default indicator). A value is shown
//! through `children`, then `field`/`display`, then `static_content`. A value
//! projection that fails is replaced locally by the error substitute; the
//! data state keeps its value.

use std::fmt::Display;
use std::rc::Rc;

use chainscope_core::{Callback, DataError, DataState, Root};
use serde::Serialize;
use serde_json::Value;

use crate::boundary::guard;
use crate::fragment::*;

pub type ChildrenFn<T> = Rc<dyn Fn(&T, Option<&str>) -> anyhow::Result<Fragment>>;
pub type ValueTextFn<T> = Rc<dyn Fn(&T) -> anyhow::Result<String>>;
pub type LoadingFn = Rc<dyn Fn() -> Fragment>;
pub type ErrorFn = Rc<dyn Fn(&DataError) -> Fragment>;

/// Render options. Everything is optional; the default shows the standard
/// placeholders and nothing for a value.
pub struct RenderConfig<T> {
    children: Option<ChildrenFn<T>>,
    value_text: Option<ValueTextFn<T>>,
    static_content: Option<String>,
    show_fallback: bool,
    loading_message: Option<String>,
    loading_callback: Option<LoadingFn>,
    show_loading_callback: bool,
    error: Option<String>,
    error_callback: Option<ErrorFn>,
    show_error_callback: bool,
    error_substitute: Option<String>,
    show_error_substitute: bool,
    class_name: Option<String>,
}

impl<T> Default for RenderConfig<T> {
    fn default() -> Self {
        Self {
            children: None,
            value_text: None,
            static_content: None,
            show_fallback: true,
            loading_message: None,
            loading_callback: None,
            show_loading_callback: true,
            error: None,
            error_callback: None,
            show_error_callback: true,
            error_substitute: None,
            show_error_substitute: false,
            class_name: None,
        }
    }
}

impl<T> Clone for RenderConfig<T> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            value_text: self.value_text.clone(),
            static_content: self.static_content.clone(),
            show_fallback: self.show_fallback,
            loading_message: self.loading_message.clone(),
            loading_callback: self.loading_callback.clone(),
            show_loading_callback: self.show_loading_callback,
            error: self.error.clone(),
            error_callback: self.error_callback.clone(),
            show_error_callback: self.show_error_callback,
            error_substitute: self.error_substitute.clone(),
            show_error_substitute: self.show_error_substitute,
            class_name: self.class_name.clone(),
        }
    }
}

impl<T: 'static> RenderConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value render callback, called with the value and the class name.
    pub fn children(
        mut self,
        f: impl Fn(&T, Option<&str>) -> anyhow::Result<Fragment> + 'static,
    ) -> Self {
        self.children = Some(Rc::new(f));
        self
    }

    /// Text of one serialized field of the value. Strings render unquoted and
    /// a missing field renders as empty text.
    pub fn field(mut self, name: impl Into<String>) -> Self
    where
        T: Serialize,
    {
        let name = name.into();
        self.value_text = Some(Rc::new(move |value: &T| -> anyhow::Result<String> {
            let json = serde_json::to_value(value)?;
            Ok(match json.get(name.as_str()) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
        }));
        self
    }

    /// The value's `Display` output.
    pub fn display(mut self) -> Self
    where
        T: Display,
    {
        self.value_text = Some(Rc::new(|value: &T| -> anyhow::Result<String> {
            Ok(value.to_string())
        }));
        self
    }

    pub fn static_content(mut self, content: impl Into<String>) -> Self {
        self.static_content = Some(content.into());
        self
    }

    pub fn show_fallback(mut self, show: bool) -> Self {
        self.show_fallback = show;
        self
    }

    pub fn loading_message(mut self, message: impl Into<String>) -> Self {
        self.loading_message = Some(message.into());
        self
    }

    pub fn loading_callback(mut self, f: impl Fn() -> Fragment + 'static) -> Self {
        self.loading_callback = Some(Rc::new(f));
        self
    }

    pub fn show_loading_callback(mut self, show: bool) -> Self {
        self.show_loading_callback = show;
        self
    }

    /// Overrides the message of the default error indicator.
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn error_callback(mut self, f: impl Fn(&DataError) -> Fragment + 'static) -> Self {
        self.error_callback = Some(Rc::new(f));
        self
    }

    pub fn show_error_callback(mut self, show: bool) -> Self {
        self.show_error_callback = show;
        self
    }

    /// Label of the neutral substitute. Setting it also enables it.
    pub fn error_substitute(mut self, label: impl Into<String>) -> Self {
        self.error_substitute = Some(label.into());
        self.show_error_substitute = true;
        self
    }

    pub fn show_error_substitute(mut self, show: bool) -> Self {
        self.show_error_substitute = show;
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    fn projects_value(&self) -> bool {
        self.children.is_some() || self.value_text.is_some()
    }

    fn substitute(&self, retry: Option<Callback>) -> Fragment {
        let label = self.error_substitute.as_deref().unwrap_or(DEFAULT_SUBSTITUTE);
        ErrorSubstitute(label, retry)
    }
}

/// Pure projection of `root` under `config`. `retry` is attached to every
/// error fragment.
pub fn project<T: 'static>(
    root: &Root<T>,
    config: &RenderConfig<T>,
    retry: Option<Callback>,
) -> Fragment {
    let fragment = match root {
        Root::Loading => project_loading(config),
        Root::Value(value) => project_value(value, config, retry),
        Root::Error(err) => project_error(err, config, retry),
    };
    match &config.class_name {
        Some(class_name) => fragment.class_name(class_name.clone()),
        None => fragment,
    }
}

fn project_loading<T: 'static>(config: &RenderConfig<T>) -> Fragment {
    if !config.show_fallback {
        return Empty();
    }
    if let (true, Some(callback)) = (config.show_loading_callback, &config.loading_callback) {
        return callback();
    }
    match &config.loading_message {
        Some(message) => LoadingMessage(message.clone()),
        None => LoadingPulse(config.static_content.as_deref()),
    }
}

fn project_value<T: 'static>(
    value: &T,
    config: &RenderConfig<T>,
    retry: Option<Callback>,
) -> Fragment {
    let class_name = config.class_name.as_deref();
    let projected = if let Some(children) = &config.children {
        guard("render callback", || children(value, class_name))
    } else if let Some(text) = &config.value_text {
        guard("value text", || text(value)).map(Text)
    } else {
        return match &config.static_content {
            Some(content) => Text(content.clone()),
            None => Empty(),
        };
    };
    projected.unwrap_or_else(|_| config.substitute(retry))
}

fn project_error<T: 'static>(
    err: &DataError,
    config: &RenderConfig<T>,
    retry: Option<Callback>,
) -> Fragment {
    if let (false, Some(content)) = (config.projects_value(), &config.static_content) {
        return Text(content.clone());
    }
    if !config.show_fallback {
        return Empty();
    }
    if let (true, Some(callback)) = (config.show_error_callback, &config.error_callback) {
        return callback(err);
    }
    if config.show_error_substitute {
        return config.substitute(retry);
    }
    let message = config.error.as_deref().unwrap_or(err.message());
    ErrorIndicator(message, retry)
}

/// `render` for anything holding a root, with retry wired to its refetch.
pub trait RenderDataState<T> {
    fn render(&self, config: &RenderConfig<T>) -> Fragment;
}

impl<T: Clone + 'static> RenderDataState<T> for DataState<T> {
    fn render(&self, config: &RenderConfig<T>) -> Fragment {
        let retry = self.retry_callback();
        self.with_root(|root| project(root, config, Some(retry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainscope_core::{FetchConfig, Scope};
    use futures::executor::LocalPool;
    use std::cell::Cell;

    #[derive(Clone, Serialize)]
    struct Gas {
        #[serde(rename = "SafeGasPrice")]
        safe: String,
        #[serde(rename = "LastBlock")]
        last_block: u64,
    }

    fn gas() -> Gas {
        Gas {
            safe: "12".into(),
            last_block: 19_000_000,
        }
    }

    fn error_root<T>(message: &str) -> Root<T> {
        Root::Error(DataError::new(message))
    }

    fn manual<T: Clone + 'static>() -> DataState<T> {
        DataState::new(FetchConfig::new((), |(): ()| async {
            Err::<T, _>(anyhow::anyhow!("manual state has no source"))
        }))
    }

    #[test]
    fn every_tag_has_a_projection() {
        let config = RenderConfig::<u64>::new().display();
        assert!(project(&Root::Loading, &config, None).is_loading());
        assert_eq!(
            project(&Root::Value(7), &config, None).to_plain_text(),
            "7"
        );
        assert!(project(&error_root::<u64>("down"), &config, None).is_error());
    }

    #[test]
    fn loading_precedence() {
        let root = Root::<u64>::Loading;
        let base = RenderConfig::<u64>::new().static_content("0x1234abcd");

        let pulse = project(&root, &base, None);
        assert!(matches!(pulse.kind, FragmentKind::LoadingPulse { width: 10 }));

        let message = base.clone().loading_message("fetching");
        assert_eq!(project(&root, &message, None).to_plain_text(), "fetching...");

        let callback = message.clone().loading_callback(|| Text("custom"));
        assert_eq!(project(&root, &callback, None).to_plain_text(), "custom");

        let disabled = callback.clone().show_loading_callback(false);
        assert_eq!(project(&root, &disabled, None).to_plain_text(), "fetching...");

        let hidden = callback.show_fallback(false);
        assert!(project(&root, &hidden, None).is_empty());
    }

    #[test]
    fn error_precedence() {
        let root = error_root::<u64>("HTTP 503");
        let retry: Callback = Rc::new(|| {});

        let default = RenderConfig::<u64>::new().display();
        let fragment = project(&root, &default, Some(retry.clone()));
        assert_eq!(fragment.to_plain_text(), "error: HTTP 503 [retry]");

        let overridden = default.clone().error("price unavailable");
        let fragment = project(&root, &overridden, None);
        assert_eq!(fragment.to_plain_text(), "error: price unavailable");

        let substitute = overridden.clone().error_substitute("?");
        let fragment = project(&root, &substitute, Some(retry.clone()));
        assert!(matches!(fragment.kind, FragmentKind::ErrorSubstitute { .. }));
        assert!(fragment.retry().is_some());

        let callback = substitute.clone().error_callback(|e| Text(format!("! {e}")));
        assert_eq!(project(&root, &callback, None).to_plain_text(), "! HTTP 503");

        let disabled = callback.clone().show_error_callback(false);
        assert_eq!(project(&root, &disabled, None).to_plain_text(), "?");

        let hidden = callback.show_fallback(false);
        assert!(project(&root, &hidden, None).is_empty());
    }

    #[test]
    fn static_content_ignores_errors_without_value_projection() {
        let root = error_root::<u64>("down");
        let fixed = RenderConfig::<u64>::new().static_content("Ethereum");
        assert_eq!(project(&root, &fixed, None).to_plain_text(), "Ethereum");
        assert_eq!(
            project(&Root::Value(1), &fixed, None).to_plain_text(),
            "Ethereum"
        );

        let projected = fixed.display();
        assert!(project(&root, &projected, None).is_error());
    }

    #[test]
    fn field_renders_serialized_member() {
        let root = Root::Value(gas());
        let safe = RenderConfig::new().field("SafeGasPrice");
        let block = RenderConfig::new().field("LastBlock");
        let missing = RenderConfig::new().field("FastGasPrice");
        assert_eq!(project(&root, &safe, None).to_plain_text(), "12");
        assert_eq!(project(&root, &block, None).to_plain_text(), "19000000");
        assert_eq!(project(&root, &missing, None).to_plain_text(), "");
    }

    #[test]
    fn children_receive_value_and_class_name() {
        let config = RenderConfig::<Gas>::new()
            .class_name("gas")
            .children(|g, class| Ok(Text(format!("{} gwei ({})", g.safe, class.unwrap_or("")))));
        let fragment = project(&Root::Value(gas()), &config, None);
        assert_eq!(fragment.to_plain_text(), "12 gwei (gas)");
        assert_eq!(fragment.class_name.as_deref(), Some("gas"));
    }

    #[test]
    fn class_name_reaches_placeholders() {
        let config = RenderConfig::<u64>::new().class_name("cell");
        let loading = project(&Root::Loading, &config, None);
        let error = project(&error_root("x"), &config, None);
        assert_eq!(loading.class_name.as_deref(), Some("cell"));
        assert_eq!(error.class_name.as_deref(), Some("cell"));
    }

    #[test]
    fn failing_render_callback_does_not_poison_the_state() {
        let state = manual::<Gas>();
        state.set_value(gas());

        let failing = RenderConfig::<Gas>::new()
            .children(|g, _| Ok(Text(g.safe.parse::<bool>()?.to_string())));
        let panicking = RenderConfig::<Gas>::new().children(|_, _| panic!("layout bug"));

        for config in [failing, panicking] {
            let fragment = state.render(&config);
            assert!(matches!(fragment.kind, FragmentKind::ErrorSubstitute { .. }));
            assert!(fragment.retry().is_some());
        }

        assert!(state.root().as_value().is_some());
        let plain = state.render(&RenderConfig::new().field("SafeGasPrice"));
        assert_eq!(plain.to_plain_text(), "12");
    }

    #[test]
    fn retry_refetches_the_rendered_state() {
        let mut pool = LocalPool::new();
        let scope = Scope::with_spawner(pool.spawner());
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let state = scope.run(|| {
            DataState::new(FetchConfig::new((), move |(): ()| {
                counter.set(counter.get() + 1);
                async { Ok::<_, anyhow::Error>(3_100u64) }
            }))
        });
        state.set_error("HTTP 429", None);

        let fragment = state.render(&RenderConfig::new().display());
        let retry = fragment.retry().expect("retry affordance");
        retry();
        pool.run_until_stalled();

        assert_eq!(calls.get(), 1);
        assert_eq!(state.render(&RenderConfig::new().display()).to_plain_text(), "3100");
    }

    #[test]
    fn page_snapshot() {
        let config = RenderConfig::<u64>::new().display().static_content("000000");
        let rows = [
            Root::Loading,
            Root::Value(3_100),
            error_root("HTTP 500"),
        ]
        .iter()
        .map(|root| Row(vec![Text("ETH/USD"), project(root, &config, None)]))
        .collect();
        insta::assert_snapshot!(Column(rows).to_plain_text(), @r"
        ETH/USD ░░░░░░
        ETH/USD 3100
        ETH/USD error: HTTP 500
        ");
    }
}
