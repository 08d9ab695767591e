//! Built-in action handlers.
//!
//! | Handler              | Kind        | Result                                      |
//! |----------------------|-------------|---------------------------------------------|
//! | [`DataFetchHandler`] | `DataFetch` | `{ total, lowStockCount, lowStockItems }`   |
//! | [`ConditionHandler`] | `Condition` | `true` / `false`                            |
//! | [`NotifyHandler`]    | `Notify`    | `{ sent, recipient }`                       |
//! | [`LogHandler`]       | `Log`       | `null`                                      |
//!
//! Message parameters are minijinja templates rendered against
//! `{ upstream, results, state }`.

mod condition;
mod data_fetch;
mod log;
mod notify;
mod template;

pub use condition::{ConditionHandler, Predicate};
pub use data_fetch::{CollectionSource, DataFetchHandler, StateCollection};
pub use log::{LogHandler, MessageSink, TracingSink};
pub use notify::{Notifier, NotifyHandler};
pub use template::render;
