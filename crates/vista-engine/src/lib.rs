pub mod coordinator;
pub mod guard;
pub mod registry;
pub mod session;
pub mod source;
pub mod trigger;

pub mod mock;

pub use coordinator::{RefreshOutcome, ViewRefreshCoordinator};
pub use guard::{GuardState, ReconnectionGuard};
pub use registry::SubscriptionRegistry;
pub use session::{LiveView, LiveViewBuilder, LiveViewConfig};
pub use source::{PagedSource, RefreshMode, RefreshSource};
pub use trigger::CoalescingTrigger;
