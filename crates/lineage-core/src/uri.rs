//! Content-addressed URIs for plans, activities, and entities.
//!
//! - plans:       `<base>/plans/<uuid>`
//! - activities:  `<base>/activities/<uuid>`
//! - entities:    `<base>/blob/<checksum>/<path segments...>`
//! - qualified:   `<activity>/usages/<role>`, `<activity>/generations/<role>`
//! - collections: `<activity>/blob/<checksum>/<path segments...>`
//!
//! Every path segment is percent-encoded by `url`.

use url::Url;

use crate::error::{Error, Result};
use crate::id::{ActivityId, PlanId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriBuilder {
    base: Url,
}

impl UriBuilder {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| Error::Config(format!("base url '{base}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("base url '{base}' cannot carry paths")));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    pub fn plan(&self, id: PlanId) -> String {
        self.join(["plans", &id.to_string()])
    }

    pub fn activity(&self, id: ActivityId) -> String {
        self.join(["activities", &id.to_string()])
    }

    pub fn usage(&self, activity: ActivityId, role: &str) -> String {
        self.join(["activities", &activity.to_string(), "usages", role])
    }

    pub fn generation(&self, activity: ActivityId, role: &str) -> String {
        self.join(["activities", &activity.to_string(), "generations", role])
    }

    pub fn entity(&self, checksum: &str, path: &str) -> String {
        let segments = ["blob", checksum]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.join(segments)
    }

    /// Entity scoped to one activity (used for collections, whose members
    /// depend on how the activity resolved them).
    pub fn activity_entity(&self, activity: ActivityId, checksum: &str, path: &str) -> String {
        let id = activity.to_string();
        let segments = ["activities", id.as_str(), "blob", checksum]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.join(segments)
    }

    pub fn parse_plan(&self, uri: &str) -> Result<PlanId> {
        let id = tail_after(uri, "plans")?;
        id.parse()
            .map_err(|e| Error::Document(format!("plan uri '{uri}': {e}")))
    }

    pub fn parse_activity(&self, uri: &str) -> Result<ActivityId> {
        let id = tail_after(uri, "activities")?;
        id.parse()
            .map_err(|e| Error::Document(format!("activity uri '{uri}': {e}")))
    }

    fn join<'a, I>(&self, segments: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base.clone();
        // `new` rejected cannot-be-a-base urls, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }
}

impl Default for UriBuilder {
    fn default() -> Self {
        Self {
            base: Url::parse(crate::config::DEFAULT_BASE_URL).expect("default base url is valid"),
        }
    }
}

/// The segment following the last occurrence of `kind` in the uri path.
fn tail_after(uri: &str, kind: &str) -> Result<String> {
    let url = Url::parse(uri).map_err(|e| Error::Document(format!("uri '{uri}': {e}")))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    segments
        .windows(2)
        .rev()
        .find(|w| w[0] == kind)
        .map(|w| w[1].to_string())
        .ok_or_else(|| Error::Document(format!("uri '{uri}' has no '{kind}' segment")))
}
