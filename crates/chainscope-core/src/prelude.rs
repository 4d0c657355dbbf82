pub use crate::data_state::{DataState, WeakDataState};
pub use crate::derived::{compose_roots, map_root};
pub use crate::effects::{Callback, Dispose, effect, on_unmount};
pub use crate::error::{DataError, FetchError};
pub use crate::fetch::{Arg, ArgList, FetchConfig};
pub use crate::http::{FixtureClient, HttpClient, HttpConfig, ReqwestClient};
pub use crate::root::{Root, RootTag};
pub use crate::runtime::{remember_data_state, remember_with_key};
pub use crate::scope::{Scope, current_scope};
pub use crate::signal::{Signal, signal};
