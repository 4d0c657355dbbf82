use chainscope_core::Callback;

/// Width of the loading pulse when there is no static content to size it.
pub const DEFAULT_PULSE_WIDTH: usize = 8;

/// Label of the neutral error substitute.
pub const DEFAULT_SUBSTITUTE: &str = "n/a";

/// A UI fragment descriptor. The projector only decides *which* fragment to
/// show; turning it into output is up to the caller (see
/// [`Fragment::to_plain_text`]).
#[derive(Clone, Debug)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub class_name: Option<String>,
}

#[derive(Clone)]
pub enum FragmentKind {
    Empty,
    Text(String),
    LoadingMessage(String),
    LoadingPulse {
        width: usize,
    },
    ErrorIndicator {
        message: String,
        retry: Option<Callback>,
    },
    ErrorSubstitute {
        label: String,
        retry: Option<Callback>,
    },
    Row(Vec<Fragment>),
    Column(Vec<Fragment>),
}

impl std::fmt::Debug for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let retry = |r: &Option<Callback>| if r.is_some() { "<callback>" } else { "none" };
        match self {
            FragmentKind::Empty => write!(f, "Empty"),
            FragmentKind::Text(text) => f.debug_tuple("Text").field(text).finish(),
            FragmentKind::LoadingMessage(message) => {
                f.debug_tuple("LoadingMessage").field(message).finish()
            }
            FragmentKind::LoadingPulse { width } => f
                .debug_struct("LoadingPulse")
                .field("width", width)
                .finish(),
            FragmentKind::ErrorIndicator { message, retry: r } => f
                .debug_struct("ErrorIndicator")
                .field("message", message)
                .field("retry", &retry(r))
                .finish(),
            FragmentKind::ErrorSubstitute { label, retry: r } => f
                .debug_struct("ErrorSubstitute")
                .field("label", label)
                .field("retry", &retry(r))
                .finish(),
            FragmentKind::Row(children) => f.debug_tuple("Row").field(children).finish(),
            FragmentKind::Column(children) => f.debug_tuple("Column").field(children).finish(),
        }
    }
}

impl Fragment {
    pub fn new(kind: FragmentKind) -> Self {
        Self {
            kind,
            class_name: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(FragmentKind::Empty)
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, FragmentKind::Empty)
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.kind,
            FragmentKind::LoadingMessage(_) | FragmentKind::LoadingPulse { .. }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.kind,
            FragmentKind::ErrorIndicator { .. } | FragmentKind::ErrorSubstitute { .. }
        )
    }

    /// Retry affordance of an error fragment.
    pub fn retry(&self) -> Option<&Callback> {
        match &self.kind {
            FragmentKind::ErrorIndicator { retry, .. }
            | FragmentKind::ErrorSubstitute { retry, .. } => retry.as_ref(),
            _ => None,
        }
    }

    /// Terminal rendering. Rows join with a space, columns with a newline,
    /// and empty children are skipped in both.
    pub fn to_plain_text(&self) -> String {
        match &self.kind {
            FragmentKind::Empty => String::new(),
            FragmentKind::Text(text) => text.clone(),
            FragmentKind::LoadingMessage(message) => format!("{message}..."),
            FragmentKind::LoadingPulse { width } => "░".repeat(*width),
            FragmentKind::ErrorIndicator { message, retry } => {
                with_retry(format!("error: {message}"), retry)
            }
            FragmentKind::ErrorSubstitute { label, retry } => with_retry(label.clone(), retry),
            FragmentKind::Row(children) => join(children, " "),
            FragmentKind::Column(children) => join(children, "\n"),
        }
    }
}

fn with_retry(text: String, retry: &Option<Callback>) -> String {
    match retry {
        Some(_) => format!("{text} [retry]"),
        None => text,
    }
}

fn join(children: &[Fragment], sep: &str) -> String {
    children
        .iter()
        .map(Fragment::to_plain_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub fn Empty() -> Fragment {
    Fragment::empty()
}

pub fn Text(text: impl Into<String>) -> Fragment {
    Fragment::new(FragmentKind::Text(text.into()))
}

pub fn LoadingMessage(message: impl Into<String>) -> Fragment {
    Fragment::new(FragmentKind::LoadingMessage(message.into()))
}

/// Pulsing placeholder as wide as `content` would be.
pub fn LoadingPulse(content: Option<&str>) -> Fragment {
    let width = content
        .map(|c| c.chars().count())
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_PULSE_WIDTH);
    Fragment::new(FragmentKind::LoadingPulse { width })
}

pub fn ErrorIndicator(message: impl Into<String>, retry: Option<Callback>) -> Fragment {
    Fragment::new(FragmentKind::ErrorIndicator {
        message: message.into(),
        retry,
    })
}

pub fn ErrorSubstitute(label: impl Into<String>, retry: Option<Callback>) -> Fragment {
    Fragment::new(FragmentKind::ErrorSubstitute {
        label: label.into(),
        retry,
    })
}

pub fn Row(children: Vec<Fragment>) -> Fragment {
    Fragment::new(FragmentKind::Row(children))
}

pub fn Column(children: Vec<Fragment>) -> Fragment {
    Fragment::new(FragmentKind::Column(children))
}
