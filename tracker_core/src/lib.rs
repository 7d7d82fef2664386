pub mod clock;
pub mod config;
pub mod contracts;
pub mod domain;
pub mod error;
pub mod ids;
pub mod messages;
pub mod retry;
pub mod store_pg;

pub use clock::{Clock, SystemClock};
pub use domain::{ApplicationKey, ApplicationState, Lang, StatusCategory};
pub use error::{CoreError, ErrorMapper};
pub use ids::{ApplicationId, FetcherId, ReminderId, UserId};
pub use messages::{FetcherMetricsMessage, Fingerprint, JobMessage, RequestType, StatusUpdateMessage};
pub use store_pg::PgStore;
