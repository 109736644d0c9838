use clap::Args;

use common::crypto::ShareLink;
use common::model::{ItemFields, ItemRole};
use ephemera_daemon::http_server::api::v0::objects::items::{ItemMutation, MutateItemRequest};

use crate::cli::payload::{password_hash, ObjectOpError, TextItem};

#[derive(Args, Debug, Clone)]
pub struct AddItem {
    pub link: ShareLink,

    /// entry, vote, question or answer
    #[arg(long, default_value = "entry")]
    pub role: ItemRole,

    #[arg(long)]
    pub text: String,

    #[arg(long)]
    pub completed: Option<bool>,

    /// Potluck lists only
    #[arg(long)]
    pub claimed: Option<bool>,

    /// Quiz question order
    #[arg(long)]
    pub position: Option<u32>,

    #[arg(long)]
    pub password: Option<String>,

    /// Needed for quiz questions
    #[arg(long)]
    pub admin_token: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for AddItem {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.role == ItemRole::Expense {
            return Err(ObjectOpError::Invalid(
                "use `ephemera expense` to record expenses".into(),
            ));
        }

        let mut client = ctx.client.clone();
        let payload = self.link.secret.encrypt_json(&TextItem {
            text: self.text.clone(),
        })?;

        let response = client
            .call(MutateItemRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                admin_token: self.admin_token.clone(),
                mutation: ItemMutation::Append {
                    role: self.role,
                    encrypted_payload: payload,
                    fields: ItemFields {
                        completed: self.completed,
                        claimed: self.claimed,
                        position: self.position,
                    },
                },
            })
            .await?;

        Ok(format!(
            "Added {} {} (object version {})",
            self.role, response.item_id, response.object_version
        ))
    }
}
