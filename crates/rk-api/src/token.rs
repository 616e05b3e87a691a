//! Persistent entity tokens
//!
//! A token is an opaque string naming an entity, and optionally an
//! occurrence path, inside one design. It embeds the session value of the
//! design that issued it, so the same entity gets a different string after
//! the design is reopened. Compare resolved handles, never token strings.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rk_core::constants::TOKEN_VERSION;
use rk_core::{DesignId, EntityId, OccurrencePath};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{ApiError, ApiResult};
use crate::handle::Handle;

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(rename = "v")]
    version: u8,
    #[serde(rename = "s")]
    session: u32,
    #[serde(rename = "d")]
    design: DesignId,
    #[serde(rename = "e")]
    entity: EntityId,
    #[serde(rename = "p", default, skip_serializing_if = "OccurrencePath::is_empty")]
    path: OccurrencePath,
}

impl TokenPayload {
    fn encode(&self) -> Option<String> {
        let json = serde_json::to_vec(self).ok()?;
        Some(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(token: &str) -> ApiResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ApiError::MalformedToken)?;
        let payload: TokenPayload =
            serde_json::from_slice(&bytes).map_err(|_| ApiError::MalformedToken)?;
        if payload.version != TOKEN_VERSION {
            return Err(ApiError::MalformedToken);
        }
        Ok(payload)
    }
}

impl Handle {
    /// Persistent token of the entity in this handle's context
    ///
    /// Empty for transient (uncommitted) entities and stale handles.
    pub fn entity_token(&self) -> String {
        self.with_live(|_, design, record| {
            if !record.persisted {
                return None;
            }
            TokenPayload {
                version: TOKEN_VERSION,
                session: design.session(),
                design: design.id,
                entity: record.id,
                path: self.context().clone(),
            }
            .encode()
        })
        .unwrap_or_default()
    }
}

impl Document {
    /// Resolve a token issued by this design
    ///
    /// None if the token is malformed, was issued by another design, or
    /// names an entity or occurrence that no longer exists.
    pub fn resolve(&self, token: &str) -> Option<Handle> {
        self.try_resolve(token).ok()
    }

    /// Like [`Document::resolve`], naming the reason for failure
    pub fn try_resolve(&self, token: &str) -> ApiResult<Handle> {
        let result = self.resolve_payload(token);
        if let Err(e) = &result {
            tracing::debug!("Token did not resolve: {}", e);
        }
        result
    }

    fn resolve_payload(&self, token: &str) -> ApiResult<Handle> {
        let payload = TokenPayload::decode(token)?;
        let shared = self.shared();
        let design = shared.design.try_borrow().map_err(|_| ApiError::Busy)?;
        if payload.design != design.id {
            return Err(ApiError::ForeignDesign(payload.design));
        }

        let not_found = || ApiError::NotFound(payload.entity.to_string());
        let key = design.key_of(payload.entity).ok_or_else(not_found)?;
        let record = design.entity(key).ok_or_else(not_found)?;
        if !record.persisted {
            return Err(not_found());
        }
        if !payload.path.is_empty()
            && design.resolve_path(&payload.path).map(|info| info.leaf) != Some(record.component)
        {
            return Err(ApiError::Ineligible);
        }

        Ok(Handle::new(shared, design.id, key, record, payload.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use rk_core::{Design, EntityKind};

    #[test]
    fn test_native_round_trip() {
        let fx = fixture();
        let handle = fx.doc.handle(fx.extrude).unwrap();
        let token = handle.entity_token();
        assert!(!token.is_empty());

        let resolved = fx.doc.resolve(&token).unwrap();
        assert!(resolved.equivalent(&handle));
        assert_eq!(resolved.view(), "rk::Feature");
    }

    #[test]
    fn test_proxy_round_trip() {
        let fx = fixture();
        let proxy = fx
            .doc
            .handle(fx.rim)
            .unwrap()
            .create_for_assembly_context(&fx.right)
            .unwrap();

        let resolved = fx.doc.resolve(&proxy.entity_token()).unwrap();
        assert!(resolved.equivalent(&proxy));
        assert_eq!(resolved.assembly_context(), Some(fx.right.clone()));
    }

    #[test]
    fn test_round_trip_across_reopen() {
        let fx = fixture();
        let proxy = fx
            .doc
            .handle(fx.rim)
            .unwrap()
            .create_for_assembly_context(&fx.left)
            .unwrap();
        let token = proxy.entity_token();
        let identity = proxy.identity().unwrap();

        let reopened = fx.doc.reopen().unwrap();
        let resolved = reopened.resolve(&token).unwrap();
        assert_eq!(resolved.identity(), Some(identity));

        // Same entity, new session: the string changes but resolution agrees
        let reissued = resolved.entity_token();
        assert_ne!(reissued, token);
        let again = reopened.resolve(&reissued).unwrap();
        assert!(again.equivalent(&resolved));
    }

    #[test]
    fn test_foreign_design_fails() {
        let fx = fixture();
        let token = fx.doc.handle(fx.extrude).unwrap().entity_token();

        let other = Document::new(Design::new("other"));
        assert!(other.resolve(&token).is_none());
        assert!(matches!(
            other.try_resolve(&token),
            Err(ApiError::ForeignDesign(_))
        ));

        let copy = Document::new(fx.doc.read(|d| d.duplicate()).unwrap().unwrap());
        assert!(copy.resolve(&token).is_none());
    }

    #[test]
    fn test_malformed_tokens() {
        let fx = fixture();
        for token in ["", "!!!", "bm90IGpzb24", "e30"] {
            assert!(matches!(
                fx.doc.try_resolve(token),
                Err(ApiError::MalformedToken)
            ));
        }

        let token = fx.doc.handle(fx.extrude).unwrap().entity_token();
        let mut payload = TokenPayload::decode(&token).unwrap();
        payload.version = TOKEN_VERSION + 1;
        let future = payload.encode().unwrap();
        assert!(matches!(
            fx.doc.try_resolve(&future),
            Err(ApiError::MalformedToken)
        ));
    }

    #[test]
    fn test_deleted_entity_does_not_resolve() {
        let fx = fixture();
        let handle = fx.doc.handle(fx.extrude).unwrap();
        let token = handle.entity_token();
        assert!(handle.delete());

        assert!(matches!(
            fx.doc.try_resolve(&token),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(handle.entity_token(), "");

        // Undo restores the entity under the same ID; the token works again
        fx.doc.edit(|d| d.undo_delete()).unwrap().unwrap();
        let resolved = fx.doc.resolve(&token).unwrap();
        assert_eq!(resolved.name().as_deref(), Some("Extrude1"));
        assert!(!handle.is_valid());
    }

    #[test]
    fn test_transient_entity_has_no_token() {
        let fx = fixture();
        let key = fx
            .doc
            .edit(|d| d.begin_entity(fx.root, EntityKind::Sketch, "Draft"))
            .unwrap()
            .unwrap();
        let handle = fx.doc.handle(key).unwrap();
        assert_eq!(handle.entity_token(), "");

        fx.doc.edit(|d| d.commit_entity(key)).unwrap().unwrap();
        let token = handle.entity_token();
        assert!(fx.doc.resolve(&token).unwrap().equivalent(&handle));
    }

    #[test]
    fn test_removed_occurrence_token_fails() {
        let fx = fixture();
        let proxy = fx
            .doc
            .handle(fx.rim)
            .unwrap()
            .create_for_assembly_context(&fx.left)
            .unwrap();
        let token = proxy.entity_token();

        let left = fx.left.first().unwrap();
        fx.doc.edit(|d| d.remove_occurrence(left)).unwrap().unwrap();
        assert!(matches!(
            fx.doc.try_resolve(&token),
            Err(ApiError::Ineligible)
        ));
    }
}
