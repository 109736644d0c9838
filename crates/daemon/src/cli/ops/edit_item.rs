use std::time::Duration;

use clap::Args;

use common::crypto::ShareLink;
use common::model::{ItemFields, ItemId};
use ephemera_daemon::http_server::api::client::ApiClient;
use ephemera_daemon::http_server::api::v0::objects::items::{
    ItemMutation, ItemResponse, MutateItemRequest,
};
use ephemera_daemon::http_server::api::v0::objects::read::ReadRequest;

use crate::cli::payload::{password_hash, ObjectOpError, TextItem};

#[derive(Args, Debug, Clone)]
pub struct EditItem {
    pub link: ShareLink,

    #[arg(long)]
    pub item: ItemId,

    /// Replace the item's text
    #[arg(long)]
    pub text: Option<String>,

    #[arg(long)]
    pub completed: Option<bool>,

    #[arg(long)]
    pub claimed: Option<bool>,

    #[arg(long)]
    pub position: Option<u32>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub admin_token: Option<String>,
}

/// Exponential delay before conflict retry `attempt` (1-based), capped at
/// `max_ms`, plus up to half of that again taken from `jitter`
fn conflict_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter: u64) -> Duration {
    let exp = base_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(32))
        .min(max_ms);
    let spread = exp / 2 + 1;
    Duration::from_millis(exp.saturating_add(jitter % spread))
}

impl EditItem {
    /// One compare-and-swap attempt against the freshest item version
    async fn attempt(&self, client: &mut ApiClient) -> Result<ItemResponse, ObjectOpError> {
        let snapshot = client
            .call(ReadRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                known_version: None,
            })
            .await?;
        let current = snapshot
            .items
            .iter()
            .find(|item| item.id == self.item)
            .ok_or_else(|| ObjectOpError::ItemNotFound(self.item.to_string()))?;

        let encrypted_payload = match &self.text {
            Some(text) => Some(
                self.link
                    .secret
                    .encrypt_json(&TextItem { text: text.clone() })?,
            ),
            None => None,
        };

        let response = client
            .call(MutateItemRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                admin_token: self.admin_token.clone(),
                mutation: ItemMutation::Update {
                    item_id: self.item,
                    expected_version: current.version,
                    encrypted_payload,
                    fields: ItemFields {
                        completed: self.completed,
                        claimed: self.claimed,
                        position: self.position,
                    },
                },
            })
            .await?;
        Ok(response)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for EditItem {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let config = ctx.app_config();
        let max_retries = config.max_conflict_retries;

        let mut retries = 0;
        loop {
            match self.attempt(&mut client).await {
                Ok(response) => {
                    return Ok(format!(
                        "Updated {} to version {} (object version {})",
                        response.item_id,
                        response.item_version.unwrap_or_default(),
                        response.object_version
                    ))
                }
                Err(ObjectOpError::Api(e)) if e.is_conflict() => {
                    if retries >= max_retries {
                        return Err(ObjectOpError::TooManyConflicts(retries + 1));
                    }
                    retries += 1;
                    let delay = conflict_backoff(
                        retries,
                        config.conflict_backoff_base_ms,
                        config.conflict_backoff_max_ms,
                        jitter(),
                    );
                    tracing::debug!(
                        item_id = %self.item,
                        retries,
                        delay_ms = delay.as_millis() as u64,
                        "lost a write race, backing off before refetching"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Random bits from a v4 uuid, so racing clients spread their retries
fn jitter() -> u64 {
    uuid::Uuid::new_v4().as_u64_pair().0
}
