//! HTTP method codes used by the dispatch engine.
//!
//! Requests carry an [`http::Method`], but route matching compares small integer codes:
//! every supported verb maps to a [`MethodCode`], and a route stores the verbs it accepts
//! as a [`MethodSet`] bit mask. The wildcard set [`MethodSet::ALL`] uses a reserved bit that
//! no verb maps to, so it keeps matching any verb without enumerating them.

use crate::error::RegisterError;
use http::Method;
use std::fmt;
use std::str::FromStr;

/// Name of the wildcard method accepted by [`MethodSet::parse`].
pub const METHOD_USE: &str = "USE";

/// Integer code of a supported HTTP verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MethodCode {
    Get = 0,
    Head = 1,
    Post = 2,
    Put = 3,
    Delete = 4,
    Connect = 5,
    Options = 6,
    Trace = 7,
    Patch = 8,
}

impl MethodCode {
    /// Every supported verb, ordered by code.
    pub const VERBS: [MethodCode; 9] = [
        MethodCode::Get,
        MethodCode::Head,
        MethodCode::Post,
        MethodCode::Put,
        MethodCode::Delete,
        MethodCode::Connect,
        MethodCode::Options,
        MethodCode::Trace,
        MethodCode::Patch,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Maps a request method to its code, `None` for extension methods.
    pub fn from_method(method: &Method) -> Option<Self> {
        match method.as_str() {
            "GET" => Some(MethodCode::Get),
            "HEAD" => Some(MethodCode::Head),
            "POST" => Some(MethodCode::Post),
            "PUT" => Some(MethodCode::Put),
            "DELETE" => Some(MethodCode::Delete),
            "CONNECT" => Some(MethodCode::Connect),
            "OPTIONS" => Some(MethodCode::Options),
            "TRACE" => Some(MethodCode::Trace),
            "PATCH" => Some(MethodCode::Patch),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MethodCode::Get => "GET",
            MethodCode::Head => "HEAD",
            MethodCode::Post => "POST",
            MethodCode::Put => "PUT",
            MethodCode::Delete => "DELETE",
            MethodCode::Connect => "CONNECT",
            MethodCode::Options => "OPTIONS",
            MethodCode::Trace => "TRACE",
            MethodCode::Patch => "PATCH",
        }
    }

    pub fn as_method(self) -> Method {
        match self {
            MethodCode::Get => Method::GET,
            MethodCode::Head => Method::HEAD,
            MethodCode::Post => Method::POST,
            MethodCode::Put => Method::PUT,
            MethodCode::Delete => Method::DELETE,
            MethodCode::Connect => Method::CONNECT,
            MethodCode::Options => Method::OPTIONS,
            MethodCode::Trace => Method::TRACE,
            MethodCode::Patch => Method::PATCH,
        }
    }
}

impl FromStr for MethodCode {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MethodCode::VERBS
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RegisterError::unknown_method(s))
    }
}

impl fmt::Display for MethodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of verbs a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodSet(u16);

const WILDCARD_BIT: u16 = 1 << 15;

impl MethodSet {
    /// Matches every verb, including ones added to [`MethodCode`] later.
    pub const ALL: MethodSet = MethodSet(WILDCARD_BIT);

    pub const EMPTY: MethodSet = MethodSet(0);

    #[inline]
    pub const fn of(code: MethodCode) -> Self {
        MethodSet(1 << code as u16)
    }

    #[must_use]
    pub const fn with(self, code: MethodCode) -> Self {
        MethodSet(self.0 | (1 << code as u16))
    }

    #[must_use]
    pub const fn union(self, other: MethodSet) -> Self {
        MethodSet(self.0 | other.0)
    }

    #[inline]
    pub const fn is_all(self) -> bool {
        self.0 & WILDCARD_BIT != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, code: MethodCode) -> bool {
        self.is_all() || self.0 & (1 << code as u16) != 0
    }

    /// The concrete verbs in this set; the wildcard expands to every verb.
    pub fn iter(self) -> impl Iterator<Item = MethodCode> {
        MethodCode::VERBS.into_iter().filter(move |code| self.contains(*code))
    }

    /// Parses method names as given to `add`, `"USE"` being the wildcard.
    ///
    /// # Errors
    /// Fails on an empty list or a name that is not a supported verb.
    pub fn parse<S: AsRef<str>>(methods: &[S]) -> Result<Self, RegisterError> {
        if methods.is_empty() {
            return Err(RegisterError::EmptyMethods);
        }

        methods.iter().try_fold(MethodSet::EMPTY, |set, method| {
            let method = method.as_ref();
            if method.eq_ignore_ascii_case(METHOD_USE) {
                Ok(set.union(MethodSet::ALL))
            } else {
                method.parse::<MethodCode>().map(|code| set.with(code))
            }
        })
    }
}

impl From<MethodCode> for MethodSet {
    fn from(code: MethodCode) -> Self {
        MethodSet::of(code)
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str(METHOD_USE);
        }

        for (i, code) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(code.as_str())?;
        }
        Ok(())
    }
}
