use std::sync::Arc;

use dashmap::DashMap;

use super::session::InspectionSession;

/// Per-actor inspection state.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub crm_token: Option<String>,
    pub inspection: Option<InspectionSession>,
}

/// In-process store holding one workspace per actor.
///
/// Cloning is cheap and every clone sees the same sessions. Entries are
/// sharded by actor id, so distinct inspectors never contend.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<DashMap<String, Workspace>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, actor: &str) -> Option<InspectionSession> {
        self.inner
            .get(actor)
            .and_then(|workspace| workspace.inspection.clone())
    }

    pub fn crm_token(&self, actor: &str) -> Option<String> {
        self.inner
            .get(actor)
            .and_then(|workspace| workspace.crm_token.clone())
    }

    /// Installs `session` for `actor`, discarding whatever was there.
    pub fn replace(&self, actor: &str, session: InspectionSession) {
        self.inner
            .entry(actor.to_string())
            .or_default()
            .inspection = Some(session);
    }

    /// Runs `f` against the actor's session, if one exists.
    pub fn update<R>(&self, actor: &str, f: impl FnOnce(&mut InspectionSession) -> R) -> Option<R> {
        let mut workspace = self.inner.get_mut(actor)?;
        workspace.inspection.as_mut().map(f)
    }

    /// Drops the actor's session and returns it. The CRM token is kept.
    pub fn clear(&self, actor: &str) -> Option<InspectionSession> {
        self.inner
            .get_mut(actor)
            .and_then(|mut workspace| workspace.inspection.take())
    }

    /// Drops the actor's session only while it still equals `expected`.
    pub fn clear_if_unchanged(&self, actor: &str, expected: &InspectionSession) -> bool {
        match self.inner.get_mut(actor) {
            Some(mut workspace) if workspace.inspection.as_ref() == Some(expected) => {
                workspace.inspection = None;
                true
            }
            _ => false,
        }
    }

    /// Stores the token for later imports and retags the running session.
    pub fn set_crm_token(&self, actor: &str, token: String) {
        let mut workspace = self.inner.entry(actor.to_string()).or_default();
        if let Some(session) = workspace.inspection.as_mut() {
            session.crm_token = Some(token.clone());
        }
        workspace.crm_token = Some(token);
    }

    pub fn active_sessions(&self) -> usize {
        self.inner
            .iter()
            .filter(|entry| entry.inspection.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::record::{sample_record, InspectionAction};

    fn session(purchase_order: i64) -> InspectionSession {
        InspectionSession::begin(vec![sample_record(1, purchase_order)], None, "a.lst")
    }

    #[test]
    fn actors_are_isolated() {
        let store = SessionStore::new();
        store.replace("ana", session(1));
        store.replace("bruno", session(2));

        store.update("ana", |s| s.mark(1, 0, InspectionAction::Inspect));

        assert!(store.get("ana").unwrap().records[0].inspected);
        assert!(store.get("bruno").unwrap().records[0].is_pending());
        assert_eq!(store.active_sessions(), 2);
    }

    #[test]
    fn replace_discards_previous_session() {
        let store = SessionStore::new();
        store.replace("ana", session(1));
        store.replace("ana", session(2));
        assert_eq!(store.get("ana").unwrap().records[0].purchase_order, 2);
    }

    #[test]
    fn update_without_session_is_none() {
        let store = SessionStore::new();
        assert!(store.update("ghost", |s| s.records.len()).is_none());
    }

    #[test]
    fn clear_keeps_crm_token() {
        let store = SessionStore::new();
        store.set_crm_token("ana", "ff00".into());
        store.replace("ana", session(1));

        assert!(store.clear("ana").is_some());
        assert!(store.get("ana").is_none());
        assert_eq!(store.crm_token("ana").as_deref(), Some("ff00"));
    }

    #[test]
    fn conditional_clear_spares_a_newer_session() {
        let store = SessionStore::new();
        store.replace("ana", session(1));
        let snapshot = store.get("ana").unwrap();

        store.replace("ana", session(2));
        assert!(!store.clear_if_unchanged("ana", &snapshot));
        assert_eq!(store.get("ana").unwrap().records[0].purchase_order, 2);

        let current = store.get("ana").unwrap();
        assert!(store.clear_if_unchanged("ana", &current));
        assert!(store.get("ana").is_none());
        assert!(!store.clear_if_unchanged("ghost", &current));
    }

    #[test]
    fn new_token_retags_running_session() {
        let store = SessionStore::new();
        store.replace("ana", session(1));
        store.set_crm_token("ana", "beef".into());
        assert_eq!(store.get("ana").unwrap().crm_token.as_deref(), Some("beef"));
    }
}
