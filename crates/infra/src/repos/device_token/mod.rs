mod inmemory;
mod postgres;

pub use inmemory::InMemoryDeviceTokenRepo;
pub use postgres::PostgresDeviceTokenRepo;
use varsel_domain::{DeviceToken, ID};

#[async_trait::async_trait]
pub trait IDeviceTokenRepo: Send + Sync {
    async fn insert(&self, device_token: &DeviceToken) -> anyhow::Result<()>;
    /// All active push endpoints registered for the recipient
    async fn list_active(&self, recipient: &ID) -> anyhow::Result<Vec<DeviceToken>>;
    /// Mark tokens inactive. Called by the push adapter when the
    /// provider reports a token as permanently invalid, and on explicit
    /// unregistration. Tokens are never hard-deleted.
    async fn deactivate(&self, tokens: &[String]) -> anyhow::Result<()>;
}
