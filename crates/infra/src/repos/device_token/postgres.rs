use super::IDeviceTokenRepo;
use sqlx::types::Uuid;
use sqlx::{FromRow, PgPool};
use varsel_domain::{DeviceToken, Platform, ID};

pub struct PostgresDeviceTokenRepo {
    pool: PgPool,
}

impl PostgresDeviceTokenRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DeviceTokenRaw {
    token: String,
    recipient_uid: Uuid,
    platform: String,
    active: bool,
    last_used_at: i64,
}

impl From<DeviceTokenRaw> for DeviceToken {
    fn from(raw: DeviceTokenRaw) -> Self {
        Self {
            token: raw.token,
            recipient: raw.recipient_uid.into(),
            platform: raw.platform.parse::<Platform>().unwrap_or(Platform::Web),
            active: raw.active,
            last_used_at: raw.last_used_at,
        }
    }
}

#[async_trait::async_trait]
impl IDeviceTokenRepo for PostgresDeviceTokenRepo {
    async fn insert(&self, device_token: &DeviceToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO device_tokens
            (token, recipient_uid, platform, active, last_used_at)
            VALUES($1, $2, $3, $4, $5)
            ON CONFLICT (token) DO UPDATE
            SET recipient_uid = $2, platform = $3, active = $4, last_used_at = $5
            "#,
        )
        .bind(&device_token.token)
        .bind(device_token.recipient.inner_ref())
        .bind(device_token.platform.to_string())
        .bind(device_token.active)
        .bind(device_token.last_used_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_active(&self, recipient: &ID) -> anyhow::Result<Vec<DeviceToken>> {
        let device_tokens = sqlx::query_as::<_, DeviceTokenRaw>(
            r#"
            SELECT * FROM device_tokens AS d
            WHERE d.recipient_uid = $1 AND d.active
            "#,
        )
        .bind(recipient.inner_ref())
        .fetch_all(&self.pool)
        .await?;
        Ok(device_tokens
            .into_iter()
            .map(|device_token| device_token.into())
            .collect())
    }

    async fn deactivate(&self, tokens: &[String]) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE device_tokens AS d
            SET active = FALSE
            WHERE d.token = ANY($1)
            "#,
        )
        .bind(tokens)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
