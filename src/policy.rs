use std::borrow::Cow;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::models::Role;

/// PathPattern
///
/// A route classification entry. `Subtree("/student")` covers `/student` and everything
/// below it, but never a sibling such as `/students`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Subtree(String),
}

impl PathPattern {
    pub fn exact(path: impl Into<String>) -> Self {
        PathPattern::Exact(normalize_path(&path.into()))
    }

    pub fn subtree(prefix: impl Into<String>) -> Self {
        PathPattern::Subtree(normalize_path(&prefix.into()))
    }

    /// `path` must already be normalized.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Subtree(prefix) if prefix == "/" => true,
            PathPattern::Subtree(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }

    /// Specificity used for longest-prefix selection.
    fn specificity(&self) -> usize {
        match self {
            PathPattern::Exact(path) | PathPattern::Subtree(path) => path.len(),
        }
    }
}

/// RouteRule
///
/// One row of the role table: everything under `prefix` requires `role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: PathPattern,
    pub role: Role,
}

impl RouteRule {
    pub fn new(prefix: &str, role: Role) -> Self {
        Self {
            prefix: PathPattern::subtree(prefix),
            role,
        }
    }
}

/// UnmatchedPathPolicy
///
/// What happens to a request that carries a valid credential for an intercepted,
/// non-public path that no role rule covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPathPolicy {
    /// Any authenticated role may enter.
    #[default]
    AllowAuthenticated,
    /// Only paths with an explicit role rule are reachable.
    DenyUnlisted,
}

impl FromStr for UnmatchedPathPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "allow-authenticated" => Ok(UnmatchedPathPolicy::AllowAuthenticated),
            "deny-unlisted" => Ok(UnmatchedPathPolicy::DenyUnlisted),
            other => Err(ConfigError::Invalid {
                var: "GATE_UNMATCHED_POLICY",
                reason: format!("unknown policy '{other}'"),
            }),
        }
    }
}

/// RouteTable
///
/// The static route classification, fixed at deploy time:
/// - `matcher`: the only paths the gate evaluates; everything else bypasses it.
/// - `public`: intercepted paths that never require a credential.
/// - `rules`: the role table, resolved by longest prefix (ties go to the earlier row).
#[derive(Debug, Clone)]
pub struct RouteTable {
    pub matcher: Vec<PathPattern>,
    pub public: Vec<PathPattern>,
    pub rules: Vec<RouteRule>,
    pub unmatched: UnmatchedPathPolicy,
}

impl Default for RouteTable {
    /// The portal's page layout: landing, auth pages, the three role dashboards,
    /// the learning-style assessment and the profile area.
    fn default() -> Self {
        Self {
            matcher: vec![
                PathPattern::exact("/"),
                PathPattern::subtree("/login"),
                PathPattern::subtree("/register"),
                PathPattern::subtree("/student"),
                PathPattern::subtree("/teacher"),
                PathPattern::subtree("/admin"),
                PathPattern::subtree("/assessment"),
                PathPattern::subtree("/profile"),
            ],
            public: vec![
                PathPattern::exact("/"),
                PathPattern::subtree("/login"),
                PathPattern::subtree("/register"),
            ],
            rules: vec![
                RouteRule::new("/student", Role::Siswa),
                RouteRule::new("/teacher", Role::Guru),
                RouteRule::new("/admin", Role::Admin),
            ],
            unmatched: UnmatchedPathPolicy::default(),
        }
    }
}

impl RouteTable {
    pub fn with_unmatched_policy(mut self, policy: UnmatchedPathPolicy) -> Self {
        self.unmatched = policy;
        self
    }

    pub fn intercepts(&self, path: &str) -> bool {
        self.matcher.iter().any(|pattern| pattern.matches(path))
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|pattern| pattern.matches(path))
    }

    /// True when reaching `path` would demand a credential. Redirect targets must not be.
    pub fn requires_credential(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.intercepts(&path) && !self.is_public(&path)
    }

    pub fn required_role(&self, path: &str) -> Option<Role> {
        let mut best: Option<&RouteRule> = None;
        for rule in self.rules.iter().filter(|rule| rule.prefix.matches(path)) {
            match best {
                Some(current) if current.prefix.specificity() >= rule.prefix.specificity() => {}
                _ => best = Some(rule),
            }
        }
        best.map(|rule| rule.role)
    }
}

/// normalize_path
///
/// Canonical form used for every classification lookup: percent-decoded (the raw text is
/// kept if decoding does not produce UTF-8), no empty or `.` segments, `..` resolved
/// without climbing above root, no trailing slash.
pub fn normalize_path(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    join_segments(resolve_segments(&decoded).into_iter())
}

/// canonical_path
///
/// The normalized path re-encoded segment by segment, i.e. the only spelling of a path the
/// gate forwards. Applying it twice gives the same result.
pub fn canonical_path(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    let encoded: Vec<Cow<'_, str>> = resolve_segments(&decoded)
        .into_iter()
        .map(urlencoding::encode)
        .collect();
    join_segments(encoded.iter().map(|segment| segment.as_ref()))
}

fn resolve_segments(decoded: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}

fn join_segments<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

/// Strips the query string and fragment from a request target such as
/// `/student/tests?page=2`.
pub fn path_of(target: &str) -> &str {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    &target[..end]
}
