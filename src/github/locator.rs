//! Identity wrappers for repositories and API credentials.

use url::Url;

use super::error::IntakeError;

/// Default REST endpoint for github.com.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    fn new(value: &str) -> Option<Self> {
        is_valid_segment(value).then(|| Self(value.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    fn new(value: &str) -> Option<Self> {
        is_valid_segment(value).then(|| Self(value.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn is_valid_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains(char::is_whitespace)
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, IntakeError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

impl std::fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("PersonalAccessToken(..)")
    }
}

/// Parses the configured API base, e.g. `https://api.github.com` or a GitHub
/// Enterprise `https://ghe.example.com/api/v3`.
///
/// # Errors
///
/// Returns `IntakeError::InvalidUrl` when the value is not an absolute URL.
pub fn parse_api_base(input: &str) -> Result<Url, IntakeError> {
    let parsed = Url::parse(input).map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(IntakeError::InvalidUrl(format!(
            "{input} cannot be used as a base URL"
        )));
    }
    Ok(parsed)
}

/// A repository identified by `owner/name`, bound to an API base.
///
/// # Example
///
/// ```
/// use pullhouse::github::{RepositoryLocator, parse_api_base};
///
/// let api_base = parse_api_base("https://api.github.com").expect("valid base");
/// let locator = RepositoryLocator::from_full_name(&api_base, "octo/repo")
///     .expect("should parse repository name");
/// assert_eq!(locator.owner().as_str(), "octo");
/// assert_eq!(locator.full_name(), "octo/repo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Parses an `owner/name` repository identifier.
    ///
    /// Surrounding whitespace is ignored; anything other than exactly two
    /// non-empty segments is rejected.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidRepository` for malformed identifiers.
    pub fn from_full_name(api_base: &Url, full_name: &str) -> Result<Self, IntakeError> {
        let invalid = || IntakeError::InvalidRepository {
            value: full_name.to_owned(),
        };

        let (owner_segment, repository_segment) =
            full_name.trim().split_once('/').ok_or_else(invalid)?;
        if repository_segment.contains('/') {
            return Err(invalid());
        }

        let owner = RepositoryOwner::new(owner_segment).ok_or_else(invalid)?;
        let repository = RepositoryName::new(repository_segment).ok_or_else(invalid)?;

        Ok(Self {
            api_base: api_base.clone(),
            owner,
            repository,
        })
    }

    /// API base URL used for requests.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Returns the `owner/name` form.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.as_str(), self.repository.as_str())
    }

    /// Returns the absolute URL for listing pull requests.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidUrl` when the joined URL cannot be parsed.
    pub(crate) fn pulls_url(&self) -> Result<Url, IntakeError> {
        let joined = format!(
            "{}/repos/{}/{}/pulls",
            self.api_base.as_str().trim_end_matches('/'),
            self.owner.as_str(),
            self.repository.as_str()
        );
        Url::parse(&joined).map_err(|error| IntakeError::InvalidUrl(error.to_string()))
    }
}
