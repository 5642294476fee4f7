//! Invitation state machine.
//!
//! `NoInvite -> Pending(email) -> Active(user)`, with `cancel` leading from
//! `Pending` back to `NoInvite`. An email that already belongs to an account
//! skips `Pending` entirely.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ProfileRecord, ResultEngine, TripId, UserId, util::normalize_email};

use super::{Engine, access::ensure_writable};

/// What an invite did, so the caller can tell "added" from "invite sent".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteOutcome {
    /// The email belongs to an account which is now a participant.
    Added(UserId),
    /// No account yet; the normalized email waits in the pending set.
    Pending(String),
}

/// Participant profiles and pending emails of one trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripMembers {
    pub participants: BTreeMap<UserId, ProfileRecord>,
    pub pending: BTreeSet<String>,
}

impl Engine {
    /// Invite `email` to the trip on behalf of `actor`.
    ///
    /// Checks run in this order: email shape, trip existence, actor
    /// membership, archived trip, duplicate pending invite, existing
    /// membership of the matched account.
    pub async fn invite(
        &self,
        trip_id: TripId,
        email: &str,
        actor: &UserId,
    ) -> ResultEngine<InviteOutcome> {
        let email = normalize_email(email)?;
        let trip = self.require_participant(trip_id, actor).await?;
        ensure_writable(&trip)?;
        if trip.is_pending(&email) {
            return Err(EngineError::AlreadyInvited(email));
        }

        if let Some(user_id) = self.store.find_profile_by_email(&email).await? {
            if &user_id == actor || trip.is_participant(&user_id) {
                return Err(EngineError::AlreadyMember(email));
            }
            if !self.store.add_participant(trip_id, &user_id).await? {
                return Err(EngineError::AlreadyMember(email));
            }
            tracing::info!(%trip_id, %user_id, "participant added by invite");
            return Ok(InviteOutcome::Added(user_id));
        }

        if !self.store.add_pending(trip_id, &email, actor).await? {
            return Err(EngineError::AlreadyInvited(email));
        }
        tracing::info!(%trip_id, %email, "invite pending");
        Ok(InviteOutcome::Pending(email))
    }

    /// Moves `user_id` from pending to participant on every trip holding an
    /// invite for `email`. Repeating the call is a no-op. Archived trips
    /// keep their pending invites.
    pub async fn resolve_pending_on_auth(
        &self,
        email: &str,
        user_id: &UserId,
    ) -> ResultEngine<Vec<TripId>> {
        let email = normalize_email(email)?;
        let mut joined = Vec::new();
        for trip in self.store.trips_with_pending(&email).await? {
            if trip.is_archived() {
                tracing::debug!(trip_id = %trip.id, %email, "skipping invite on archived trip");
                continue;
            }
            if self.store.promote_pending(trip.id, &email, user_id).await? {
                tracing::info!(trip_id = %trip.id, %user_id, "pending invite resolved");
                joined.push(trip.id);
            }
        }
        Ok(joined)
    }

    pub async fn cancel_invite(
        &self,
        trip_id: TripId,
        email: &str,
        actor: &UserId,
    ) -> ResultEngine<()> {
        let email = normalize_email(email)?;
        self.require_writable(trip_id, actor).await?;
        if !self.store.remove_pending(trip_id, &email).await? {
            return Err(EngineError::NotFound(format!("invite for {email}")));
        }
        tracing::info!(%trip_id, %email, "invite cancelled");
        Ok(())
    }

    /// Removes a participant. The creator can never be removed.
    pub async fn remove_participant(
        &self,
        trip_id: TripId,
        user_id: &UserId,
        actor: &UserId,
    ) -> ResultEngine<()> {
        let trip = self.require_participant(trip_id, actor).await?;
        if trip.is_creator(user_id) {
            return Err(EngineError::CannotRemoveCreator);
        }
        ensure_writable(&trip)?;
        if !self.store.remove_participant(trip_id, user_id).await? {
            return Err(EngineError::NotFound(format!("participant {user_id}")));
        }
        tracing::info!(%trip_id, %user_id, "participant removed");
        Ok(())
    }

    pub async fn members(&self, trip_id: TripId, actor: &UserId) -> ResultEngine<TripMembers> {
        let trip = self.require_participant(trip_id, actor).await?;
        Ok(TripMembers {
            participants: self.resolve_profiles(&trip.participants).await,
            pending: trip.pending_participants,
        })
    }
}
