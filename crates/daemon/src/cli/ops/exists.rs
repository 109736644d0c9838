use clap::Args;

use common::crypto::ShareLink;
use ephemera_daemon::http_server::api::v0::objects::exists::ExistsRequest;

use crate::cli::payload::ObjectOpError;

/// Check a link without opening it; never consumes a burn-after-reading note
#[derive(Args, Debug, Clone)]
pub struct Exists {
    pub link: ShareLink,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Exists {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client
            .call(ExistsRequest {
                id: self.link.id.clone(),
            })
            .await?;

        if !response.exists {
            return Ok("not found (it may have expired or been destroyed)".to_string());
        }
        let mut notes = Vec::new();
        if response.has_password {
            notes.push("password protected");
        }
        if response.burn_after_reading {
            notes.push("destroyed on first read");
        }
        Ok(if notes.is_empty() {
            "exists".to_string()
        } else {
            format!("exists ({})", notes.join(", "))
        })
    }
}
