use clap::Args;

use common::crypto::ShareLink;
use common::model::ItemId;
use ephemera_daemon::http_server::api::v0::objects::items::{ItemMutation, MutateItemRequest};

use crate::cli::payload::{password_hash, ObjectOpError};

#[derive(Args, Debug, Clone)]
pub struct DeleteItem {
    pub link: ShareLink,

    #[arg(long)]
    pub item: ItemId,

    /// Only delete if the item is still at this version
    #[arg(long)]
    pub expected_version: Option<u64>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub admin_token: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for DeleteItem {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client
            .call(MutateItemRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                admin_token: self.admin_token.clone(),
                mutation: ItemMutation::Delete {
                    item_id: self.item,
                    expected_version: self.expected_version,
                },
            })
            .await?;

        Ok(format!(
            "Deleted {} (object version {})",
            response.item_id, response.object_version
        ))
    }
}
