pub mod email;
pub mod extractor;
pub mod http;
pub mod notifier;
pub mod store;
pub mod telegram;
pub mod traits;
