use super::{ensure_host, AppState};
use crate::error::PokerError;
use crate::types::*;

impl AppState {
    /// Put down (or change) a card for the active ticket
    pub async fn cast_vote(
        &self,
        code: &str,
        player_id: &str,
        card: Card,
    ) -> Result<Card, PokerError> {
        let (card, _) = self
            .mutate_session(code, |session| {
                match session.phase() {
                    VotingPhase::Idle => return Err(PokerError::NoActiveTicket),
                    VotingPhase::Revealed => return Err(PokerError::AlreadyRevealed),
                    VotingPhase::Voting => {}
                }
                match session.players.get_mut(player_id) {
                    Some(player) => {
                        player.vote = Some(card);
                        Ok(card)
                    }
                    None => Err(PokerError::NotAMember(session.code.clone())),
                }
            })
            .await?;

        tracing::debug!(code = %code, player = %player_id, "Vote cast");
        Ok(card)
    }

    /// Start estimating a new ticket. Clears every vote and hides results.
    ///
    /// Allowed when idle or once the previous ticket has been revealed.
    pub async fn start_voting(
        &self,
        code: &str,
        player_id: &str,
        ticket: &str,
    ) -> Result<Session, PokerError> {
        let ticket = ticket.trim().to_string();
        let (_, session) = self
            .mutate_session(code, |session| {
                ensure_host(session, player_id, "start voting")?;
                if ticket.is_empty() {
                    return Err(PokerError::EmptyTicket);
                }
                if let (VotingPhase::Voting, Some(active)) =
                    (session.phase(), &session.active_ticket)
                {
                    return Err(PokerError::VotingActive(active.clone()));
                }

                session.active_ticket = Some(ticket);
                session.revealed = false;
                session.clear_votes();
                Ok(())
            })
            .await?;

        tracing::info!(code = %code, ticket = ?session.active_ticket, "Voting started");
        Ok(session)
    }

    /// Reveal all votes and record the ticket in history.
    ///
    /// Without a numeric vote this fails with `NoVotes` unless `confirm` is set.
    pub async fn stop_voting(
        &self,
        code: &str,
        player_id: &str,
        confirm: bool,
    ) -> Result<Session, PokerError> {
        // History is written before the guard drops, so a concurrent
        // removal can't run in between
        let _commit = self.commit_guard(code).await;
        let (item, session) = self
            .mutate_committed(code, |session| {
                ensure_host(session, player_id, "reveal votes")?;
                match session.phase() {
                    VotingPhase::Idle => return Err(PokerError::NoActiveTicket),
                    VotingPhase::Revealed => return Err(PokerError::AlreadyRevealed),
                    VotingPhase::Voting => {}
                }
                if !session.has_numeric_votes() && !confirm {
                    return Err(PokerError::NoVotes);
                }

                session.revealed = true;
                Ok(super::history::history_item_for(session))
            })
            .await?;

        if let Some(item) = item {
            self.record_history(code, item).await;
        }

        tracing::info!(code = %code, ticket = ?session.active_ticket, "Votes revealed");
        Ok(session)
    }

    /// Clear the ticket and every vote.
    ///
    /// While a ticket is open with no numeric vote this needs `confirm`.
    pub async fn reset_voting(
        &self,
        code: &str,
        player_id: &str,
        confirm: bool,
    ) -> Result<Session, PokerError> {
        let (_, session) = self
            .mutate_session(code, |session| {
                ensure_host(session, player_id, "reset voting")?;
                if session.active_ticket.is_some() && !session.has_numeric_votes() && !confirm {
                    return Err(PokerError::NoVotes);
                }

                session.active_ticket = None;
                session.revealed = false;
                session.clear_votes();
                Ok(())
            })
            .await?;

        tracing::info!(code = %code, "Voting reset");
        Ok(session)
    }
}
