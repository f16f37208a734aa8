//! Screen navigation boundary

use crate::events::StateCell;
use serde::{Deserialize, Serialize};

/// Navigation destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Level selection (main screen)
    #[default]
    Levels,
    /// Quiz player
    Player,
    /// Statistics
    Stats,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only records the current route
#[derive(Clone, Default)]
pub struct RouteCell {
    current: StateCell<Route>,
}

impl RouteCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Route {
        self.current.get()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Route> {
        self.current.subscribe()
    }
}

impl Navigator for RouteCell {
    fn navigate(&self, route: Route) {
        tracing::debug!(?route, "navigate");
        self.current.set(route);
    }
}
