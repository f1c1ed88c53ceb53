//! Applies field permissions to outgoing records and incoming payloads

use crate::core::auth::ModelAuth;
use crate::core::context::RequestContext;
use crate::core::record::Record;

/// Field filter bound to one request
///
/// Read mode strips fields the caller cannot view. Write mode drops fields
/// the caller cannot edit; dropping is silent, a write touching a protected
/// field still succeeds for the rest of the payload.
pub struct FieldFilter<'a> {
    auth: &'a ModelAuth,
    ctx: &'a RequestContext,
}

impl<'a> FieldFilter<'a> {
    pub fn new(auth: &'a ModelAuth, ctx: &'a RequestContext) -> Self {
        Self { auth, ctx }
    }

    pub fn can_view(&self, field: &str) -> bool {
        self.auth.can_view(field, self.ctx)
    }

    pub fn can_edit(&self, field: &str) -> bool {
        self.auth.can_edit(field, self.ctx)
    }

    /// Keep only the viewable fields, in their original order
    pub fn visible(&self, record: Record) -> Record {
        record
            .into_iter()
            .filter(|(field, _)| self.can_view(field))
            .collect()
    }

    pub fn visible_all(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().map(|r| self.visible(r)).collect()
    }

    /// Split a payload into the editable fields and the names of the dropped ones
    pub fn writable(&self, payload: Record) -> (Record, Vec<String>) {
        let mut dropped = Vec::new();
        let kept = payload
            .into_iter()
            .filter(|(field, _)| {
                let ok = self.can_edit(field);
                if !ok {
                    dropped.push(field.clone());
                }
                ok
            })
            .collect();
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{FieldAuth, Permission};
    use crate::core::context::Operation;
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn auth() -> ModelAuth {
        ModelAuth::new()
            .field("_id", FieldAuth::open())
            .field("secret", FieldAuth::locked())
            .field(
                "text",
                FieldAuth::new(
                    Permission::authenticated(),
                    Permission::predicate(|ctx| ctx.user() == Some("admin")),
                ),
            )
    }

    fn ctx_as(user: Option<&str>) -> RequestContext {
        let mut ctx = RequestContext::new("TestModel", Operation::Get);
        if let Some(u) = user {
            ctx.set_user(u);
        }
        ctx
    }

    #[test]
    fn test_visible_strips_and_preserves_order() {
        let auth = auth();
        let ctx = ctx_as(Some("user"));
        let out = FieldFilter::new(&auth, &ctx).visible(record(json!({
            "zeta": 1, "secret": "s", "_id": 4, "text": "t"
        })));
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "_id", "text"]);
    }

    #[test]
    fn test_visible_uses_predicates() {
        let auth = auth();
        let anon = ctx_as(None);
        let out = FieldFilter::new(&auth, &anon).visible(record(json!({"_id": 1, "text": "t"})));
        assert!(!out.contains_key("text"));
    }

    #[test]
    fn test_visible_all_keeps_record_order() {
        let auth = auth();
        let ctx = ctx_as(None);
        let out = FieldFilter::new(&auth, &ctx).visible_all(vec![
            record(json!({"_id": 2, "secret": 1})),
            record(json!({"_id": 1, "secret": 2})),
        ]);
        assert_eq!(out, vec![record(json!({"_id": 2})), record(json!({"_id": 1}))]);
    }

    #[test]
    fn test_writable_drops_silently() {
        let auth = auth();
        let user = ctx_as(Some("user"));
        let (kept, dropped) = FieldFilter::new(&auth, &user)
            .writable(record(json!({"text": "x", "secret": "y", "other": 1})));
        assert_eq!(kept, record(json!({"other": 1})));
        assert_eq!(dropped, vec!["text".to_string(), "secret".to_string()]);

        let admin = ctx_as(Some("admin"));
        let (kept, dropped) =
            FieldFilter::new(&auth, &admin).writable(record(json!({"text": "x"})));
        assert_eq!(kept, record(json!({"text": "x"})));
        assert!(dropped.is_empty());
    }
}
