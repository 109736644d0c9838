use clap::{Args, ValueEnum};

use common::crypto::{Secret, ShareLink};
use common::model::{Lifetime, ListPreset, ObjectKind, PollMode};
use ephemera_daemon::http_server::api::v0::objects::create::CreateRequest;

use crate::cli::payload::{password_hash, ObjectOpError, Structure};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum KindArg {
    Note,
    List,
    Poll,
    Quiz,
    Group,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum PresetArg {
    Plain,
    Shopping,
    Potluck,
}

impl From<PresetArg> for ListPreset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Plain => ListPreset::Plain,
            PresetArg::Shopping => ListPreset::Shopping,
            PresetArg::Potluck => ListPreset::Potluck,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct Create {
    #[arg(long, value_enum)]
    pub kind: KindArg,

    /// List flavour
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Poll with a free-form availability grid instead of fixed slots
    #[arg(long)]
    pub flexible: bool,

    #[arg(long)]
    pub title: Option<String>,

    /// Note body or description
    #[arg(long)]
    pub text: Option<String>,

    /// Poll slot (repeatable)
    #[arg(long = "option")]
    pub options: Vec<String>,

    /// Expense group member (repeatable)
    #[arg(long = "member")]
    pub members: Vec<String>,

    /// One of 5m, 1h, 1d, 7d, 30d
    #[arg(long, default_value = "1d")]
    pub ttl: Lifetime,

    /// Destroy the note after its first read
    #[arg(long)]
    pub burn: bool,

    /// Require this password in addition to the link
    #[arg(long)]
    pub password: Option<String>,
}

impl Create {
    fn kind(&self) -> Result<ObjectKind, ObjectOpError> {
        if self.burn && !matches!(self.kind, KindArg::Note) {
            return Err(ObjectOpError::Invalid(
                "--burn only applies to notes".into(),
            ));
        }
        if self.preset.is_some() && !matches!(self.kind, KindArg::List) {
            return Err(ObjectOpError::Invalid(
                "--preset only applies to lists".into(),
            ));
        }

        Ok(match self.kind {
            KindArg::Note => ObjectKind::Note {
                burn_after_reading: self.burn,
            },
            KindArg::List => ObjectKind::List {
                preset: self.preset.map(ListPreset::from).unwrap_or_default(),
            },
            KindArg::Poll => ObjectKind::Poll {
                mode: if self.flexible {
                    PollMode::Flexible
                } else {
                    PollMode::Fixed
                },
            },
            KindArg::Quiz => ObjectKind::Quiz,
            KindArg::Group => ObjectKind::Group,
        })
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Create {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let kind = self.kind()?;

        // the key is generated here and only ever leaves in the link fragment
        let secret = Secret::generate()?;
        let structure = Structure {
            title: self.title.clone(),
            text: self.text.clone(),
            options: self.options.clone(),
            members: self.members.clone(),
        };

        let response = client
            .call(CreateRequest {
                kind,
                encrypted_structure: secret.encrypt_json(&structure)?,
                lifetime_secs: self.ttl.as_secs(),
                password_hash: password_hash(self.password.as_ref()),
            })
            .await?;

        let link = ShareLink::new(response.origin, response.id, secret);

        Ok(format!(
            "Created {} (expires {})\n\
             Share link:  {}\n\
             Admin token: {}\n\
             Keep the admin token private; it is shown only once.",
            kind.name(),
            response.expires_at,
            link,
            response.admin_token.expose(),
        ))
    }
}
