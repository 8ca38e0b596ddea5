//! Endpoint resolution: which HTTP resource serves a selector's logs.

use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::types::{Target, TargetSelector};

/// Characters escaped inside one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Path of a logs resource, kept as raw (unencoded) segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// Raw path segments, without encoding.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Joins this path onto an API base URL, keeping any base path prefix.
    #[must_use]
    pub fn url_for(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(&self.segments);
        }
        url
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", utf8_percent_encode(segment, PATH_SEGMENT))?;
        }
        Ok(())
    }
}

/// Resolves the single resource to poll for a selector.
///
/// - container → `/api/servers/{server}/stacks/{stack}/containers/{name}/logs`
/// - service → `/api/servers/{server}/stacks/{stack}/services/{name}/logs`
/// - stack → `/api/servers/{server}/stacks/{stack}/logs`
#[must_use]
pub fn resolve(selector: &TargetSelector) -> ResourcePath {
    let mut segments = vec![
        "api".to_string(),
        "servers".to_string(),
        selector.server_id().to_string(),
        "stacks".to_string(),
        selector.stack_name().to_string(),
    ];
    match selector.target() {
        Target::Container(name) => segments.extend(["containers".to_string(), name.clone()]),
        Target::Service(name) => segments.extend(["services".to_string(), name.clone()]),
        Target::Stack => {}
    }
    segments.push("logs".to_string());
    ResourcePath { segments }
}
