use std::collections::BTreeSet;

use uuid::Uuid;

use crate::error::{ConnectionError, Result};

/// Active subscription ids of one connection.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegister {
    ids: BTreeSet<String>,
}

impl SubscriptionRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new subscription id. Ids must be unique per connection.
    pub fn register(&mut self, id: &str) -> Result<()> {
        if !self.ids.insert(id.to_string()) {
            return Err(ConnectionError::DuplicateSubscription(id.to_string()));
        }
        Ok(())
    }

    /// Forget a subscription id.
    pub fn unregister(&mut self, id: &str) -> Result<()> {
        if !self.ids.remove(id) {
            return Err(ConnectionError::UnknownSubscription(id.to_string()));
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// A fresh id not currently registered.
    pub fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.ids.contains(&id) {
                return id;
            }
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let mut register = SubscriptionRegister::new();
        register.register("sub-1").unwrap();
        register.register("sub-2").unwrap();

        assert!(register.contains("sub-1"));
        assert_eq!(register.ids().collect::<Vec<_>>(), vec!["sub-1", "sub-2"]);

        register.unregister("sub-1").unwrap();
        assert!(!register.contains("sub-1"));
        assert_eq!(register.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut register = SubscriptionRegister::new();
        register.register("dup").unwrap();
        assert!(matches!(
            register.register("dup"),
            Err(ConnectionError::DuplicateSubscription(id)) if id == "dup"
        ));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let mut register = SubscriptionRegister::new();
        assert!(matches!(
            register.unregister("ghost"),
            Err(ConnectionError::UnknownSubscription(_))
        ));
    }

    #[test]
    fn generated_ids_are_fresh() {
        let mut register = SubscriptionRegister::new();
        let first = register.generate_id();
        register.register(&first).unwrap();
        let second = register.generate_id();
        assert_ne!(first, second);
        assert_eq!(second.len(), 36);
        register.clear();
        assert!(register.is_empty());
    }
}
