//! Receiver validation.

use super::Middleware;
use crate::context::Context;
use crate::core::{Driver, Message};
use crate::error::DispatchError;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub type Validate = Arc<dyn Fn(&str) -> Result<(), DispatchError> + Send + Sync>;

pub const NAME: &str = "validator";

/// Creates a middleware that checks the receiver with `validate` before
/// handing the message on. A rejected receiver never reaches the driver.
pub fn new<F>(priority: i32, validate: F) -> Middleware
where
    F: Fn(&str) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    let validate: Validate = Arc::new(validate);
    Middleware::new(NAME, priority, move |inner| {
        Arc::new(ValidatorDriver {
            inner,
            validate: validate.clone(),
        }) as Arc<dyn Driver>
    })
}

/// Rejects blank receivers.
pub fn non_empty(receiver: &str) -> Result<(), DispatchError> {
    if receiver.trim().is_empty() {
        return Err(invalid(receiver, "receiver is empty"));
    }
    Ok(())
}

/// Accepts one or more comma-separated email addresses.
pub fn email(receiver: &str) -> Result<(), DispatchError> {
    non_empty(receiver)?;
    let pattern = email_regex();
    for address in receiver.split(',').map(str::trim) {
        if !pattern.is_match(address) {
            return Err(invalid(receiver, format!("'{}' is not an email address", address)));
        }
    }
    Ok(())
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s,]+@[^@\s,]+\.[^@\s,]+$").expect("static email pattern")
    })
}

fn invalid(receiver: &str, reason: impl ToString) -> DispatchError {
    DispatchError::InvalidReceiver {
        receiver: receiver.to_string(),
        reason: reason.to_string(),
    }
}

struct ValidatorDriver {
    inner: Arc<dyn Driver>,
    validate: Validate,
}

#[async_trait]
impl Driver for ValidatorDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn driver_type(&self) -> &str {
        self.inner.driver_type()
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        (self.validate)(msg.receiver())?;
        self.inner.send(ctx, msg).await
    }

    fn stop(&self) {
        self.inner.stop()
    }
}
