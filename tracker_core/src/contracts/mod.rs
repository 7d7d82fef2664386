//! Service contracts implemented by `fabric`, `fetcher_worker`, and
//! `reconciler`. Following the teacher's dependency-inversion split between
//! `fechatter_core::contracts` (interfaces) and the service crates
//! (implementations), this crate defines only the traits; every concrete
//! adapter lives downstream.

pub mod broker;
pub mod browser;
pub mod chat_sink;
pub mod dialog;
pub mod store;

pub use broker::{Broker, Consumer, Delivery};
pub use browser::BrowserEngine;
pub use chat_sink::ChatSink;
pub use dialog::SubscriptionDialog;
pub use store::Store;
