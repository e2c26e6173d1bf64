//! Named request/response channels.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{HandlerError, Response};

/// A channel handler: takes no input, produces one response.
pub type Handler = Arc<dyn Fn() -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Table of handlers keyed by channel name.
#[derive(Default)]
pub struct ChannelRegistry {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` under `channel`, replacing any previous one.
    pub fn register(&self, channel: impl Into<String>, handler: Handler) {
        let channel = channel.into();
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.insert(channel.clone(), handler).is_some() {
            tracing::warn!(channel = %channel, "Replaced existing handler");
        } else {
            tracing::debug!(channel = %channel, "Registered handler");
        }
    }

    /// Remove the handler for `channel`. Returns whether one was installed.
    pub fn unregister(&self, channel: &str) -> bool {
        let removed = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel)
            .is_some();
        if removed {
            tracing::debug!(channel, "Unregistered handler");
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(channel)
    }

    /// Registered channel names, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        channels.sort();
        channels
    }

    /// Run the handler for `channel`.
    ///
    /// The handler runs on its own task so a panic inside it becomes a
    /// failed response instead of tearing down the caller.
    pub async fn dispatch(&self, channel: &str) -> Response {
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .cloned();

        let Some(handler) = handler else {
            tracing::warn!(channel, "Request for unregistered channel");
            return Response::failure(&HandlerError::UnknownChannel(channel.to_string()));
        };

        match tokio::spawn(handler()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(channel, error = %e, "Handler aborted");
                Response::failure(&HandlerError::Aborted)
            }
        }
    }
}
