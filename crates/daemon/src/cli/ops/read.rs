use clap::Args;

use common::crypto::ShareLink;
use ephemera_daemon::http_server::api::v0::objects::read::ReadRequest;

use crate::cli::payload::{password_hash, render_snapshot, ObjectOpError};

#[derive(Args, Debug, Clone)]
pub struct Read {
    /// Share link, including the #key fragment
    pub link: ShareLink,

    #[arg(long)]
    pub password: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Read {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let snapshot = client
            .call(ReadRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                known_version: None,
            })
            .await?;

        render_snapshot(&self.link.secret, &snapshot)
    }
}
