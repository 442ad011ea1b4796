use std::fmt::{Display, Formatter};

/// What a registry reports back after a successful push.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct ImageIdentity {
    digest: String,
    tag: String,
}

impl ImageIdentity {
    pub fn new(digest: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            tag: tag.into(),
        }
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Display for ImageIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.tag, self.digest)
    }
}
