//! Membership directory: `UserId -> ProfileRecord`, resolved on demand.

use std::collections::BTreeMap;

use crate::{
    AuthIdentity, ProfileRecord, ResultEngine, TripId, UserId,
    util::{normalize_email, normalize_optional_text, normalize_required_text},
};

use super::Engine;

impl Engine {
    /// Profiles for every id, in id order.
    ///
    /// Unknown ids get a placeholder which is stored write-if-absent, so a
    /// real profile written concurrently wins and later calls return the
    /// same record. This never fails: when the store is unreachable the
    /// placeholder is returned without being persisted.
    pub async fn resolve_profiles<'a, I>(&self, ids: I) -> BTreeMap<UserId, ProfileRecord>
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        let mut out = BTreeMap::new();
        for user_id in ids {
            if out.contains_key(user_id) {
                continue;
            }
            let record = self.resolve_profile(user_id).await;
            out.insert(user_id.clone(), record);
        }
        out
    }

    async fn resolve_profile(&self, user_id: &UserId) -> ProfileRecord {
        match self.store.profile(user_id).await {
            Ok(Some(record)) => return record,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(%user_id, "profile lookup failed, using placeholder: {err}");
                return ProfileRecord::placeholder_for(user_id);
            }
        }

        let placeholder = ProfileRecord::placeholder_for(user_id);
        match self
            .store
            .insert_profile_if_absent(user_id, &placeholder)
            .await
        {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(%user_id, "placeholder profile not stored: {err}");
                placeholder
            }
        }
    }

    /// Account registered under `email`, matched after trimming and
    /// lowercasing.
    pub async fn find_user_by_email(&self, email: &str) -> ResultEngine<Option<UserId>> {
        let email = normalize_email(email)?;
        self.store.find_profile_by_email(&email).await
    }

    /// Called by the authentication collaborator on every sign-up and
    /// sign-in. Stores the real profile, then turns pending invites for the
    /// email into memberships. Returns the trips joined.
    pub async fn on_authenticated(&self, identity: AuthIdentity) -> ResultEngine<Vec<TripId>> {
        let email = normalize_email(&identity.email)?;
        let display_name = normalize_optional_text(identity.display_name.as_deref())
            .or_else(|| {
                email
                    .split_once('@')
                    .map(|(local, _)| local.to_string())
            })
            .unwrap_or_else(|| identity.user_id.shortened());

        self.store
            .upsert_profile(
                &identity.user_id,
                &ProfileRecord::new(display_name, email.clone()),
            )
            .await?;
        tracing::debug!(user_id = %identity.user_id, "profile stored");

        self.resolve_pending_on_auth(&email, &identity.user_id).await
    }

    pub async fn update_display_name(
        &self,
        user_id: &UserId,
        display_name: &str,
    ) -> ResultEngine<ProfileRecord> {
        let display_name = normalize_required_text(display_name, "display name")?;
        let mut record = self
            .store
            .profile(user_id)
            .await?
            .unwrap_or_else(|| ProfileRecord::placeholder_for(user_id));
        record.display_name = display_name;
        self.store.upsert_profile(user_id, &record).await?;
        Ok(record)
    }
}
