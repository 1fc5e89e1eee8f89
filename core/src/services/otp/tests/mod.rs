mod store_tests;

use std::sync::Arc;

use otp_shared::OtpConfig;

use crate::repositories::otp::InMemoryOtpRepository;
use crate::services::otp::mock::{MockOtpCache, RecordingSmsGateway};
use crate::services::otp::OtpManager;

pub(super) const PHONE: &str = "+998901234567";

pub(super) struct Harness {
    pub repository: Arc<InMemoryOtpRepository>,
    pub cache: Arc<MockOtpCache>,
    pub gateway: Arc<RecordingSmsGateway>,
    pub manager: Arc<OtpManager<InMemoryOtpRepository, MockOtpCache, RecordingSmsGateway>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(OtpConfig::default())
    }

    pub fn with_config(config: OtpConfig) -> Self {
        let repository = Arc::new(InMemoryOtpRepository::new());
        let cache = Arc::new(MockOtpCache::new());
        let gateway = Arc::new(RecordingSmsGateway::new());
        let manager = Arc::new(
            OtpManager::new(repository.clone(), cache.clone(), gateway.clone(), config).unwrap(),
        );
        Self {
            repository,
            cache,
            gateway,
            manager,
        }
    }

    /// Code of the current durable record for `phone`
    pub async fn stored_code(&self, phone: &str) -> String {
        use crate::repositories::otp::OtpRepository;

        let phone = crate::domain::value_objects::normalize(phone).unwrap();
        self.repository.find(&phone).await.unwrap().unwrap().code
    }
}

/// A code of the same length guaranteed to differ from `code`
pub(super) fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
        .collect()
}
