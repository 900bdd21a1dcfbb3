use super::IDeviceTokenRepo;
use crate::repos::shared::inmemory_repo::*;
use varsel_domain::{DeviceToken, ID};

pub struct InMemoryDeviceTokenRepo {
    device_tokens: std::sync::Mutex<Vec<DeviceToken>>,
}

impl InMemoryDeviceTokenRepo {
    pub fn new() -> Self {
        Self {
            device_tokens: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IDeviceTokenRepo for InMemoryDeviceTokenRepo {
    async fn insert(&self, device_token: &DeviceToken) -> anyhow::Result<()> {
        upsert(device_token, &self.device_tokens);
        Ok(())
    }

    async fn list_active(&self, recipient: &ID) -> anyhow::Result<Vec<DeviceToken>> {
        let res = find_by(&self.device_tokens, |device_token: &DeviceToken| {
            device_token.active && device_token.recipient == *recipient
        });
        Ok(res)
    }

    async fn deactivate(&self, tokens: &[String]) -> anyhow::Result<()> {
        update_by(
            &self.device_tokens,
            |device_token: &DeviceToken| tokens.contains(&device_token.token),
            |device_token| device_token.active = false,
        );
        Ok(())
    }
}
