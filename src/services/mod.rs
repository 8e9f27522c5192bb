//! Core services: catalog import and browsing, the cart/order engine and
//! the contact directory. Each operation runs in one store transaction.

pub mod cart;
pub mod catalog;
pub mod contacts;
pub mod importer;

pub use cart::{AddItem, CartService, RemoveItem};
pub use catalog::CatalogQuery;
pub use contacts::{ContactRequest, ContactService};
pub use importer::{CatalogImporter, ImportSummary};

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::domain::value_objects::FeedUrl;
    use crate::feed::{FeedError, FeedSource};
    use crate::mail::{Mail, Mailer};

    pub const FEED_URL: &str = "https://supplier.example/feed.yaml";

    /// Serves the same feed body for every URL.
    pub struct StaticFeed {
        body: String,
        fetches: AtomicUsize,
    }

    impl StaticFeed {
        pub fn new(body: &str) -> Self {
            Self { body: body.to_string(), fetches: AtomicUsize::new(0) }
        }

        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch(&self, _url: &FeedUrl) -> Result<Vec<u8>, FeedError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone().into_bytes())
        }
    }

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<Mail>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self { sent: Mutex::default(), fail: true }
        }

        pub fn sent(&self) -> Vec<Mail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: Mail) -> Result<(), String> {
            if self.fail {
                return Err("smtp unavailable".to_string());
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }
}
