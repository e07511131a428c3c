//! Silencing predicate.
//!
//! The correlation engine only depends on [`SilencingPredicate`]. The default
//! [`SubscriptionSilencing`] follows the Sensu silencing conventions: a silence
//! id is `<subscription>:<check>` where either side may be `*`, and every
//! client implicitly subscribes to `client:<name>`.

use crate::entity::{CheckResult, Silence};
use std::sync::Arc;

/// Outcome of a silencing lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Silenced {
    pub silenced: bool,
    /// Ids of every silence entry covering the target
    pub silenced_by: Vec<String>,
}

impl Silenced {
    fn push(&mut self, id: &str) {
        self.silenced = true;
        if !self.silenced_by.iter().any(|existing| existing == id) {
            self.silenced_by.push(id.to_string());
        }
    }
}

/// Does silence entry S cover client C, or check K on client C, in datacenter D
pub trait SilencingPredicate: Send + Sync {
    fn client_silenced(&self, client: &str, dc: &str, silences: &[Silence]) -> Silenced;

    fn check_silenced(
        &self,
        check: &CheckResult,
        client: &str,
        dc: &str,
        silences: &[Silence],
    ) -> Silenced;
}

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Subscription based silencing with an injectable wall clock (unix seconds)
#[derive(Clone)]
pub struct SubscriptionSilencing {
    clock: Clock,
}

impl Default for SubscriptionSilencing {
    fn default() -> Self {
        Self {
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        }
    }
}

impl std::fmt::Debug for SubscriptionSilencing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionSilencing").finish_non_exhaustive()
    }
}

impl SubscriptionSilencing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }

    /// Ids of the entries of `dc` which are already in effect
    fn active_ids<'a>(
        &self,
        dc: &'a str,
        silences: &'a [Silence],
    ) -> impl Iterator<Item = String> + 'a {
        let now = (self.clock)();
        silences
            .iter()
            .filter(move |s| s.dc == dc)
            .filter(move |s| s.begin.is_none_or(|begin| begin <= now))
            .filter_map(Silence::effective_id)
    }
}

impl SilencingPredicate for SubscriptionSilencing {
    fn client_silenced(&self, client: &str, dc: &str, silences: &[Silence]) -> Silenced {
        let target = format!("client:{client}:*");
        let mut result = Silenced::default();
        for id in self.active_ids(dc, silences) {
            if id == target {
                result.push(&id);
            }
        }
        result
    }

    fn check_silenced(
        &self,
        check: &CheckResult,
        client: &str,
        dc: &str,
        silences: &[Silence],
    ) -> Silenced {
        let mut subscriptions: Vec<String> = check.subscribers.clone();
        if !client.is_empty() {
            subscriptions.push(format!("client:{client}"));
        }

        let any_subscription = format!("*:{}", check.name);
        let mut result = Silenced::default();
        for id in self.active_ids(dc, silences) {
            let covered = id == any_subscription
                || subscriptions.iter().any(|subscription| {
                    id.strip_prefix(subscription.as_str())
                        .and_then(|rest| rest.strip_prefix(':'))
                        .is_some_and(|rest| rest == "*" || rest == check.name)
                });
            if covered {
                result.push(&id);
            }
        }
        result
    }
}
