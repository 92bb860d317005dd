//! Device push-token lookup.

use crate::db::DbContext;
use crate::error::Result;

pub struct DeviceOps<'a> {
    ctx: &'a DbContext,
}

impl<'a> DeviceOps<'a> {
    pub(crate) fn new(ctx: &'a DbContext) -> Self {
        Self { ctx }
    }

    /// The active push token for a device, if any.
    pub async fn push_token(&self, device_id: &str) -> Result<Option<String>> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT push_token FROM devices WHERE device_id = $1 AND active = true",
        )
        .bind(device_id)
        .fetch_optional(self.ctx.pool())
        .await?;
        Ok(token)
    }
}
