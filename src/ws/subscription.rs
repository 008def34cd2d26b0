//! Per-connection subscription manager.
//!
//! Tracks which activity categories a WebSocket client is subscribed to and
//! filters activities server-side.

use std::collections::HashSet;

use crate::domain::ActivityCategory;

/// Manages the category subscriptions of a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed categories. Ignored while `subscribe_all` is set.
    categories: HashSet<ActivityCategory>,
    /// Whether the client subscribes to every category (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds categories to the subscription set.
    pub fn subscribe(&mut self, categories: &[ActivityCategory], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.categories.extend(categories.iter().copied());
    }

    /// Removes categories from the subscription set.
    pub fn unsubscribe(&mut self, categories: &[ActivityCategory], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for category in categories {
            self.categories.remove(category);
        }
    }

    /// Returns `true` if activities of `category` should be forwarded.
    #[must_use]
    pub fn matches(&self, category: ActivityCategory) -> bool {
        self.subscribe_all || self.categories.contains(&category)
    }

    /// Returns the explicitly subscribed categories, sorted by tag.
    #[must_use]
    pub fn categories(&self) -> Vec<ActivityCategory> {
        let mut categories: Vec<ActivityCategory> = self.categories.iter().copied().collect();
        categories.sort_by_key(|c| c.as_str());
        categories
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(ActivityCategory::Booking));
    }

    #[test]
    fn subscribe_specific_category() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[ActivityCategory::SiteAllocation], false);
        assert!(mgr.matches(ActivityCategory::SiteAllocation));
        assert!(!mgr.matches(ActivityCategory::Payment));
    }

    #[test]
    fn wildcard_matches_everything_until_dropped() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.matches(ActivityCategory::FoodLicence));
        mgr.unsubscribe(&[], true);
        assert!(!mgr.matches(ActivityCategory::FoodLicence));
    }

    #[test]
    fn categories_listed_in_tag_order() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[ActivityCategory::SiteStatus, ActivityCategory::Booking], false);
        assert_eq!(
            mgr.categories(),
            vec![ActivityCategory::Booking, ActivityCategory::SiteStatus]
        );
        mgr.unsubscribe(&[ActivityCategory::Booking], false);
        assert_eq!(mgr.categories(), vec![ActivityCategory::SiteStatus]);
    }
}
