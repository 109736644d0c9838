use std::fmt::{self, Display};
use std::str::FromStr;

use url::Url;

use super::{Secret, SecretError};
use crate::model::{ModelError, ObjectId};

const OBJECT_PATH_SEGMENT: &str = "o";

#[derive(Debug, thiserror::Error)]
pub enum ShareLinkError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("link does not point at a shared object")]
    NotAnObjectLink,
    #[error("link has no key fragment")]
    MissingKey,
    #[error("invalid object id: {0}")]
    Id(#[from] ModelError),
    #[error("invalid key: {0}")]
    Key(#[from] SecretError),
}

/// `<origin>/o/<object id>#<key>`
///
/// The key lives in the fragment, which browsers and HTTP clients never send
/// to the server. Anyone holding the whole link may read and participate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub origin: Url,
    pub id: ObjectId,
    pub secret: Secret,
}

impl ShareLink {
    pub fn new(origin: Url, id: ObjectId, secret: Secret) -> Self {
        Self { origin, id, secret }
    }

    /// The link with the key stripped, safe to send to the server or log
    pub fn public_url(&self) -> Result<Url, ShareLinkError> {
        Ok(self
            .origin
            .join(&format!("/{}/{}", OBJECT_PATH_SEGMENT, self.id))?)
    }
}

impl FromStr for ShareLink {
    type Err = ShareLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s)?;
        let fragment = url
            .fragment()
            .filter(|f| !f.is_empty())
            .ok_or(ShareLinkError::MissingKey)?;
        let secret = Secret::from_fragment(fragment)?;

        let mut segments = url.path_segments().ok_or(ShareLinkError::NotAnObjectLink)?;
        let id = match (segments.next(), segments.next(), segments.next()) {
            (Some(OBJECT_PATH_SEGMENT), Some(id), None) => id.parse::<ObjectId>()?,
            _ => return Err(ShareLinkError::NotAnObjectLink),
        };

        let mut origin = url.clone();
        origin.set_path("/");
        origin.set_fragment(None);
        origin.set_query(None);

        Ok(Self { origin, id, secret })
    }
}

impl Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}#{}",
            self.origin.as_str().trim_end_matches('/'),
            OBJECT_PATH_SEGMENT,
            self.id,
            self.secret.to_fragment()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> ShareLink {
        ShareLink::new(
            Url::parse("https://share.example.com").unwrap(),
            ObjectId::generate().unwrap(),
            Secret::generate().unwrap(),
        )
    }

    #[test]
    fn test_link_round_trip() {
        let link = link();
        let rendered = link.to_string();
        assert!(rendered.starts_with("https://share.example.com/o/"));

        let parsed: ShareLink = rendered.parse().unwrap();
        assert_eq!(parsed, link);
    }

    #[test]
    fn test_public_url_has_no_key() {
        let link = link();
        let public = link.public_url().unwrap();
        assert!(public.fragment().is_none());
        assert!(!public.as_str().contains(&link.secret.to_fragment()));
    }

    #[test]
    fn test_rejects_links_without_key() {
        let link = link();
        let without_key = link.public_url().unwrap().to_string();
        assert!(matches!(
            without_key.parse::<ShareLink>(),
            Err(ShareLinkError::MissingKey)
        ));
    }

    #[test]
    fn test_rejects_foreign_paths() {
        let secret = Secret::generate().unwrap().to_fragment();
        let bad = format!("https://share.example.com/guides/intro#{}", secret);
        assert!(matches!(
            bad.parse::<ShareLink>(),
            Err(ShareLinkError::NotAnObjectLink)
        ));
    }
}
