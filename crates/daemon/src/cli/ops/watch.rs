use std::time::Duration;

use clap::Args;

use common::crypto::ShareLink;
use ephemera_daemon::http_server::api::v0::objects::read::ReadRequest;

use crate::cli::payload::{password_hash, render_snapshot, ObjectOpError};

/// Follow an object by polling with the last seen version
#[derive(Args, Debug, Clone)]
pub struct Watch {
    pub link: ShareLink,

    #[arg(long)]
    pub password: Option<String>,

    /// Seconds between polls
    #[arg(long, default_value_t = 2)]
    pub interval: u64,

    /// Stop after this many states have been printed
    #[arg(long)]
    pub updates: Option<usize>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Watch {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let interval = Duration::from_secs(self.interval.max(1));

        let mut known_version = None;
        let mut printed = 0;
        loop {
            let request = ReadRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                known_version,
            };
            match client.fetch(request).await {
                Ok(Some(snapshot)) => {
                    known_version = Some(snapshot.version());
                    println!("{}\n", render_snapshot(&self.link.secret, &snapshot)?);
                    printed += 1;

                    if snapshot.destroyed {
                        return Ok("note destroyed after reading".to_string());
                    }
                    if self.updates.is_some_and(|limit| printed >= limit) {
                        return Ok(format!("stopped after {} updates", printed));
                    }
                }
                // unchanged since last poll
                Ok(None) => {}
                Err(e) if e.is_not_found() => {
                    return Ok("object is gone (expired or deleted)".to_string());
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(interval).await;
        }
    }
}
