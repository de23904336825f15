pub mod errors;
pub mod events;
pub mod fetch;
pub mod ids;
pub mod view;

pub use errors::RefreshError;
pub use events::{DomainEvent, EventHandler, EventName};
pub use fetch::{Page, PageFetcher, PageInfo, PageQuery};
pub use ids::{ConnectionId, ViewId};
pub use view::{ViewEntity, ViewError, ViewState};
