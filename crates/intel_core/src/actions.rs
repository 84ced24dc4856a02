use std::collections::BTreeMap;
use std::fmt;

/// Per-row side effects a renderer may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowAction {
    Refresh,
    Delete,
    Open,
    OpenExternal,
}

impl RowAction {
    pub const ALL: [RowAction; 4] = [
        RowAction::Refresh,
        RowAction::Open,
        RowAction::Delete,
        RowAction::OpenExternal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RowAction::Refresh => "refresh",
            RowAction::Delete => "delete",
            RowAction::Open => "open",
            RowAction::OpenExternal => "open_external",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

type Handler<Id> = Box<dyn Fn(Id) + Send + Sync>;

/// Named call-forwarding slots. Holds no logic of its own; an empty slot is
/// inert.
pub struct RowActions<Id> {
    slots: BTreeMap<RowAction, Handler<Id>>,
}

impl<Id> Default for RowActions<Id> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<Id: Copy + 'static> RowActions<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, action: RowAction, handler: F) -> Self
    where
        F: Fn(Id) + Send + Sync + 'static,
    {
        self.slots.insert(action, Box::new(handler));
        self
    }

    pub fn on_refresh<F>(self, handler: F) -> Self
    where
        F: Fn(Id) + Send + Sync + 'static,
    {
        self.with(RowAction::Refresh, handler)
    }

    pub fn on_delete<F>(self, handler: F) -> Self
    where
        F: Fn(Id) + Send + Sync + 'static,
    {
        self.with(RowAction::Delete, handler)
    }

    pub fn has(&self, action: RowAction) -> bool {
        self.slots.contains_key(&action)
    }

    /// Actions with a handler, in display order.
    pub fn available(&self) -> Vec<RowAction> {
        RowAction::ALL
            .into_iter()
            .filter(|action| self.has(*action))
            .collect()
    }

    /// Forwards `id` to the handler for `action`. Returns false when the slot
    /// is empty.
    pub fn dispatch(&self, action: RowAction, id: Id) -> bool {
        match self.slots.get(&action) {
            Some(handler) => {
                handler(id);
                true
            }
            None => false,
        }
    }
}

impl<Id> fmt::Debug for RowActions<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.slots.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn empty_slot_is_inert() {
        let actions: RowActions<i64> = RowActions::new();
        assert!(!actions.dispatch(RowAction::Delete, 3));
        assert!(actions.available().is_empty());
    }

    #[test]
    fn dispatch_forwards_id_to_named_slot() {
        let seen = Arc::new(AtomicI64::new(0));
        let sink = seen.clone();
        let actions = RowActions::new().on_refresh(move |id: i64| sink.store(id, Ordering::SeqCst));

        assert!(actions.dispatch(RowAction::Refresh, 42));
        assert_eq!(seen.load(Ordering::SeqCst), 42);
        assert!(!actions.dispatch(RowAction::Delete, 42));
        assert_eq!(actions.available(), vec![RowAction::Refresh]);
    }

    #[test]
    fn names_round_trip() {
        for action in RowAction::ALL {
            assert_eq!(RowAction::from_name(action.name()), Some(action));
        }
        assert_eq!(RowAction::OpenExternal.name(), "open_external");
        assert_eq!(RowAction::from_name("archive"), None);
    }
}
