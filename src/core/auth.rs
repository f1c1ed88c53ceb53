//! Field-level authorization
//!
//! Each field of the model has a view permission (may it appear in a
//! response?) and an edit permission (may a payload write it?). A
//! permission is either a constant or a predicate over the request context:
//!
//! ```rust,ignore
//! let auth = ModelAuth::new()
//!     .field("_id", FieldAuth::open())
//!     .field("user", FieldAuth::open())
//!     .field(
//!         "text",
//!         FieldAuth::new(true, Permission::predicate(|ctx| ctx.user() == Some("admin"))),
//!     );
//! ```
//!
//! Fields without an entry use the table default, which is fully open
//! unless replaced with [`ModelAuth::with_default`].

use crate::core::context::RequestContext;
use anyhow::{Result, bail};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&RequestContext) -> bool + Send + Sync;

/// A view or edit permission
#[derive(Clone)]
pub enum Permission {
    /// Always granted (`true`) or always refused (`false`)
    Constant(bool),

    /// Decided per request
    Predicate(Arc<PredicateFn>),
}

impl Permission {
    pub fn allow() -> Self {
        Permission::Constant(true)
    }

    pub fn deny() -> Self {
        Permission::Constant(false)
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        Permission::Predicate(Arc::new(f))
    }

    /// Granted when the acting user is one of `users`
    pub fn users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let users: Vec<String> = users.into_iter().map(Into::into).collect();
        Self::predicate(move |ctx| ctx.user().is_some_and(|u| users.iter().any(|x| x == u)))
    }

    /// Granted when a hook identified any acting user
    pub fn authenticated() -> Self {
        Self::predicate(|ctx| ctx.user().is_some())
    }

    /// Granted when no acting user was identified
    pub fn anonymous() -> Self {
        Self::predicate(|ctx| ctx.user().is_none())
    }

    pub fn check(&self, ctx: &RequestContext) -> bool {
        match self {
            Permission::Constant(granted) => *granted,
            Permission::Predicate(f) => f(ctx),
        }
    }

    /// Parse a permission from configuration
    ///
    /// Accepted forms: `true`/`public`, `false`/`none`, `authenticated`,
    /// `anonymous`, `user:<name>`, `users:<a>,<b>`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "true" | "public" => return Ok(Self::allow()),
            "false" | "none" => return Ok(Self::deny()),
            "authenticated" => return Ok(Self::authenticated()),
            "anonymous" => return Ok(Self::anonymous()),
            _ => {}
        }

        let list = s
            .strip_prefix("users:")
            .or_else(|| s.strip_prefix("user:"))
            .map(|rest| {
                rest.split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            });

        match list {
            Some(users) if !users.is_empty() => Ok(Self::users(users)),
            Some(_) => bail!("permission '{}' names no user", s),
            None => bail!("unknown permission '{}'", s),
        }
    }
}

impl From<bool> for Permission {
    fn from(value: bool) -> Self {
        Permission::Constant(value)
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Constant(b) => f.debug_tuple("Constant").field(b).finish(),
            Permission::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// View and edit permissions of one field
#[derive(Debug, Clone)]
pub struct FieldAuth {
    pub view: Permission,
    pub edit: Permission,
}

impl FieldAuth {
    pub fn new(view: impl Into<Permission>, edit: impl Into<Permission>) -> Self {
        Self {
            view: view.into(),
            edit: edit.into(),
        }
    }

    /// Visible and editable by everyone
    pub fn open() -> Self {
        Self::new(true, true)
    }

    /// Visible, never editable
    pub fn read_only() -> Self {
        Self::new(true, false)
    }

    /// Neither visible nor editable
    pub fn locked() -> Self {
        Self::new(false, false)
    }
}

/// Field authorization table of a model
#[derive(Debug, Clone)]
pub struct ModelAuth {
    fields: IndexMap<String, FieldAuth>,
    default: FieldAuth,
}

impl Default for ModelAuth {
    fn default() -> Self {
        Self {
            fields: IndexMap::new(),
            default: FieldAuth::open(),
        }
    }
}

impl ModelAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, auth: FieldAuth) -> Self {
        self.fields.insert(name.into(), auth);
        self
    }

    /// Entry used for fields the table does not list
    pub fn with_default(mut self, auth: FieldAuth) -> Self {
        self.default = auth;
        self
    }

    pub fn entry(&self, field: &str) -> &FieldAuth {
        self.fields.get(field).unwrap_or(&self.default)
    }

    pub fn is_listed(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn can_view(&self, field: &str, ctx: &RequestContext) -> bool {
        self.entry(field).view.check(ctx)
    }

    pub fn can_edit(&self, field: &str, ctx: &RequestContext) -> bool {
        self.entry(field).edit.check(ctx)
    }
}
