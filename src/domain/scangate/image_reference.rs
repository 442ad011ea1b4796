use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const DEFAULT_DOMAIN: &str = "docker.io";
const DEFAULT_TAG: &str = "latest";
const OFFICIAL_REPOSITORY_PREFIX: &str = "library";
const ECR_DOMAIN_MARKER: &str = "amazonaws.com";
pub const MAX_TAG_LENGTH: usize = 128;

static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*(?::[0-9]+)?$")
        .expect("domain pattern is a valid regex")
});

static PATH_COMPONENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$")
        .expect("path component pattern is a valid regex")
});

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag pattern is a valid regex")
});

static TAG_FORBIDDEN_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_.-]+").expect("forbidden characters pattern is a valid regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageReferenceError {
    #[error("invalid image reference: {0}")]
    InvalidReference(String),

    #[error("digest references are not supported, a tag is required: {0}")]
    DigestReferenceNotSupported(String),

    #[error("invalid image tag: {0}")]
    InvalidTag(String),

    #[error(
        "unexpected ECR registry name {0}. Expected format: AWS_ACCOUNT_ID.dkr.ecr.REGION.amazonaws.com/myrepo/name"
    )]
    NotAnEcrRepository(String),
}

/// A fully qualified `domain/path:tag` image reference.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct ImageReference {
    domain: String,
    path: String,
    tag: String,
}

impl ImageReference {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Repository path without the domain, like `some/repo/name`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }

    pub fn with_tag(&self, tag: &str) -> Result<Self, ImageReferenceError> {
        Ok(Self {
            domain: self.domain.clone(),
            path: self.path.clone(),
            tag: validate_tag(tag)?.to_string(),
        })
    }

    pub fn is_ecr(&self) -> bool {
        self.domain.contains(ECR_DOMAIN_MARKER)
    }

    pub fn require_ecr(self) -> Result<Self, ImageReferenceError> {
        if self.is_ecr() {
            Ok(self)
        } else {
            Err(ImageReferenceError::NotAnEcrRepository(self.to_string()))
        }
    }

    /// Region of an `ACCOUNT.dkr.ecr.REGION.amazonaws.com` domain.
    pub fn ecr_region(&self) -> Option<&str> {
        if !self.is_ecr() {
            return None;
        }

        let labels: Vec<&str> = self.domain.split('.').collect();
        labels
            .windows(3)
            .find(|window| window[0] == "dkr" && window[1] == "ecr")
            .map(|window| window[2])
    }

    /// Replaces every run of characters not allowed in a tag with `-` and
    /// trims the result to the maximum tag length.
    pub fn sanitize_tag(raw: &str) -> String {
        let mut sanitized = TAG_FORBIDDEN_CHARACTERS.replace_all(raw, "-").into_owned();
        if sanitized.starts_with(['.', '-']) {
            sanitized.insert(0, '_');
        }
        sanitized.truncate(MAX_TAG_LENGTH);
        sanitized
    }
}

impl FromStr for ImageReference {
    type Err = ImageReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ImageReferenceError::InvalidReference(s.to_string());

        if s.contains('@') {
            return Err(ImageReferenceError::DigestReferenceNotSupported(
                s.to_string(),
            ));
        }

        let (name, tag) = match s.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') => (name, validate_tag(tag)?),
            _ => (s, DEFAULT_TAG),
        };

        let (domain, path) = match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (first.to_string(), rest.to_string())
            }
            Some(_) => (DEFAULT_DOMAIN.to_string(), name.to_string()),
            None => (
                DEFAULT_DOMAIN.to_string(),
                format!("{OFFICIAL_REPOSITORY_PREFIX}/{name}"),
            ),
        };

        if !DOMAIN_PATTERN.is_match(&domain) {
            return Err(invalid());
        }
        if !path
            .split('/')
            .all(|component| PATH_COMPONENT_PATTERN.is_match(component))
        {
            return Err(invalid());
        }

        Ok(Self {
            domain,
            path,
            tag: tag.to_string(),
        })
    }
}

impl Display for ImageReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.domain, self.path, self.tag)
    }
}

fn validate_tag(tag: &str) -> Result<&str, ImageReferenceError> {
    if TAG_PATTERN.is_match(tag) {
        Ok(tag)
    } else {
        Err(ImageReferenceError::InvalidTag(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ImageReference, ImageReferenceError};

    const ECR_IMAGE: &str = "123456789012.dkr.ecr.eu-west-1.amazonaws.com/team/service:1.2.3";

    #[test]
    fn it_parses_an_ecr_reference() {
        let image: ImageReference = ECR_IMAGE.parse().unwrap();

        assert_eq!(
            image.domain(),
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com"
        );
        assert_eq!(image.path(), "team/service");
        assert_eq!(image.tag(), "1.2.3");
        assert_eq!(
            image.repository(),
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com/team/service"
        );
        assert_eq!(image.to_string(), ECR_IMAGE);
        assert!(image.is_ecr());
        assert_eq!(image.ecr_region(), Some("eu-west-1"));
    }

    #[rstest]
    #[case("ubuntu", "docker.io/library/ubuntu:latest")]
    #[case("ubuntu:22.04", "docker.io/library/ubuntu:22.04")]
    #[case("sysdig/agent:1", "docker.io/sysdig/agent:1")]
    #[case("localhost/app", "localhost/app:latest")]
    #[case("localhost:5000/app:dev", "localhost:5000/app:dev")]
    #[case(
        "registry.example.com/a/b/c:v_1.0-rc",
        "registry.example.com/a/b/c:v_1.0-rc"
    )]
    fn it_normalizes_references(#[case] raw: &str, #[case] expected: &str) {
        let image: ImageReference = raw.parse().unwrap();

        assert_eq!(image.to_string(), expected);
        assert!(!image.is_ecr());
        assert_eq!(image.ecr_region(), None);
    }

    #[rstest]
    #[case("Upper/Case:tag")]
    #[case("registry.example.com/")]
    #[case("registry.example.com/app:")]
    #[case("registry.example.com/app:-bad")]
    #[case("")]
    fn it_rejects_invalid_references(#[case] raw: &str) {
        assert!(raw.parse::<ImageReference>().is_err());
    }

    #[test]
    fn it_rejects_digest_references() {
        assert_eq!(
            "ubuntu@sha256:abc".parse::<ImageReference>(),
            Err(ImageReferenceError::DigestReferenceNotSupported(
                "ubuntu@sha256:abc".to_string()
            ))
        );
    }

    #[test]
    fn it_replaces_the_tag() {
        let image: ImageReference = ECR_IMAGE.parse().unwrap();

        let retagged = image.with_tag("latest").unwrap();

        assert_eq!(
            retagged.to_string(),
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com/team/service:latest"
        );
        assert!(image.with_tag("not valid").is_err());
    }

    #[test]
    fn it_requires_ecr_when_asked() {
        let image: ImageReference = "registry.example.com/app:1".parse().unwrap();

        assert_eq!(
            image.require_ecr().unwrap_err().to_string(),
            "unexpected ECR registry name registry.example.com/app:1. Expected format: AWS_ACCOUNT_ID.dkr.ecr.REGION.amazonaws.com/myrepo/name"
        );
    }

    #[rstest]
    #[case(
        "promotion-gate-scan-1700000000-1.2.3",
        "promotion-gate-scan-1700000000-1.2.3"
    )]
    #[case("scan 17/00:00", "scan-17-00-00")]
    #[case("-leading", "_-leading")]
    fn it_sanitizes_tags(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(ImageReference::sanitize_tag(raw), expected);
    }

    #[test]
    fn it_truncates_sanitized_tags_to_the_maximum_length() {
        let sanitized = ImageReference::sanitize_tag(&"a".repeat(300));

        assert_eq!(sanitized.len(), 128);
    }
}
