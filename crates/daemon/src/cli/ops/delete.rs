use clap::Args;

use common::crypto::ShareLink;
use ephemera_daemon::http_server::api::v0::objects::delete::DeleteRequest;

use crate::cli::payload::ObjectOpError;

#[derive(Args, Debug, Clone)]
pub struct Delete {
    pub link: ShareLink,

    /// Token printed when the object was created
    #[arg(long)]
    pub admin_token: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Delete {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        client
            .call(DeleteRequest {
                id: self.link.id.clone(),
                admin_token: self.admin_token.clone(),
            })
            .await?;
        Ok(format!("Deleted {}", self.link.id))
    }
}
