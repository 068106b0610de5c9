//! Driver middleware.
//!
//! A middleware wraps a driver in another driver that adds behavior around
//! `send` (logging, timeouts, filtering, receiver validation, template
//! rendering). A [`Middlewares`] chain is applied to a channel's driver once,
//! when the channel enters the registry.
//!
//! Lower priority numbers wrap further out, so they run first on the way in
//! and last on the way out. Equal priorities keep registration order.

pub mod filter;
pub mod logger;
pub mod template;
pub mod timeout;
pub mod validator;

use crate::core::Driver;
use std::fmt;
use std::sync::Arc;

/// Wraps a driver into a new one.
pub type WrapFn = Arc<dyn Fn(Arc<dyn Driver>) -> Arc<dyn Driver> + Send + Sync>;

/// Decides whether a middleware applies to a driver.
pub type Matcher = Arc<dyn Fn(&dyn Driver) -> bool + Send + Sync>;

/// A named, prioritized driver decorator.
#[derive(Clone)]
pub struct Middleware {
    name: String,
    priority: i32,
    matcher: Option<Matcher>,
    wrap: WrapFn,
}

impl Middleware {
    pub fn new<F>(name: &str, priority: i32, wrap: F) -> Self
    where
        F: Fn(Arc<dyn Driver>) -> Arc<dyn Driver> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            priority,
            matcher: None,
            wrap: Arc::new(wrap),
        }
    }

    /// Restricts the middleware to drivers accepted by `matcher`.
    pub fn with_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&dyn Driver) -> bool + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Restricts the middleware to drivers of one type.
    pub fn for_type(self, driver_type: &str) -> Self {
        let driver_type = driver_type.to_string();
        self.with_matcher(move |driver| driver.driver_type() == driver_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn applies_to(&self, driver: &dyn Driver) -> bool {
        self.matcher.as_ref().map_or(true, |matcher| matcher(driver))
    }

    pub fn wrap(&self, driver: Arc<dyn Driver>) -> Arc<dyn Driver> {
        (self.wrap)(driver)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("restricted", &self.matcher.is_some())
            .finish()
    }
}

/// An ordered middleware chain.
#[derive(Clone, Debug, Default)]
pub struct Middlewares {
    // Always sorted by ascending priority; ties in insertion order.
    items: Vec<Middleware>,
}

impl Middlewares {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a middleware, keeping the chain ordered.
    pub fn push(&mut self, middleware: Middleware) -> &mut Self {
        // Insert after every entry with a priority <= the new one so ties
        // stay in registration order.
        let at = self
            .items
            .partition_point(|m| m.priority <= middleware.priority);
        self.items.insert(at, middleware);
        self
    }

    pub fn with(mut self, middleware: Middleware) -> Self {
        self.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Middleware> {
        self.items.iter()
    }

    /// Wraps `driver` with every applicable middleware.
    ///
    /// Wrapping starts from the innermost (highest priority number) so that
    /// the first middleware in the chain ends up outermost. Matchers see the
    /// base driver; skipped middlewares do not disturb the others' order.
    pub fn wrap(&self, driver: Arc<dyn Driver>) -> Arc<dyn Driver> {
        let base = driver.clone();
        self.items
            .iter()
            .rev()
            .filter(|m| m.applies_to(base.as_ref()))
            .fold(driver, |wrapped, m| m.wrap(wrapped))
    }
}

impl FromIterator<Middleware> for Middlewares {
    fn from_iter<I: IntoIterator<Item = Middleware>>(iter: I) -> Self {
        let mut chain = Self::new();
        for middleware in iter {
            chain.push(middleware);
        }
        chain
    }
}
