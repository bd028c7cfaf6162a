/*!
 * Offer State Machine
 *
 * Precondition checks and transitions on a single offer. Nothing in this module reads
 * storage or moves funds: every method either rejects with the first failing
 * precondition and leaves the offer untouched, or applies its whole transition to the
 * in-memory copy. The contract entry points commit that copy through the registry.
 *
 * # Transitions
 * - Open → Matched (accept)
 * - Open → removed (cancel, creator only)
 * - Matched → Matched (one confirmation) → removed (second confirmation, release)
 * - Matched → Disputed (either participant) → removed (arbiter resolution, release)
 */

use soroban_sdk::Address;

use crate::types::{Direction, Error, Offer, OfferStatus, Participant};

impl Offer {
    /// Builds a fresh open offer: no counterparty, no confirmations, no dispute.
    pub(crate) fn new(
        id: u64,
        creator: Address,
        arbiter: Address,
        asset_amount: i128,
        currency_amount: i128,
        direction: Direction,
    ) -> Self {
        Offer {
            id,
            creator,
            arbiter,
            asset_amount,
            currency_amount,
            direction,
            counterparty: None,
            creator_confirmed: false,
            counterparty_confirmed: false,
            dispute_opened: false,
        }
    }

    pub fn status(&self) -> OfferStatus {
        if self.dispute_opened {
            OfferStatus::Disputed
        } else if self.counterparty.is_some() {
            OfferStatus::Matched
        } else {
            OfferStatus::Open
        }
    }

    /// Which side `caller` is on, if any.
    ///
    /// The creator is checked first; `accept` rejects self-trades so both slots are
    /// always distinct addresses.
    pub fn participant(&self, caller: &Address) -> Option<Participant> {
        if *caller == self.creator {
            return Some(Participant::Creator);
        }
        match &self.counterparty {
            Some(counterparty) if counterparty == caller => Some(Participant::Counterparty),
            _ => None,
        }
    }

    /// Whether the vault currently holds this offer's `asset_amount`.
    ///
    /// Sell offers are funded at creation; buy offers only once the counterparty
    /// has matched and deposited.
    pub fn holds_custody(&self) -> bool {
        match self.direction {
            Direction::CreatorSells => true,
            Direction::CreatorBuys => self.counterparty.is_some(),
        }
    }

    /// The address that receives the custodied asset when both sides confirm.
    ///
    /// `None` while unmatched.
    pub fn default_recipient(&self) -> Option<Address> {
        match self.direction {
            Direction::CreatorSells => self.counterparty.clone(),
            Direction::CreatorBuys => self.counterparty.as_ref().map(|_| self.creator.clone()),
        }
    }

    /// Records `counterparty` as the other side of this offer.
    ///
    /// # Errors
    /// - AlreadyMatched: a counterparty is already set
    /// - DisputeOpen: the offer is frozen by a dispute
    /// - SelfTrade: creator accepting their own offer
    pub(crate) fn accept(&mut self, counterparty: &Address) -> Result<(), Error> {
        if self.counterparty.is_some() {
            return Err(Error::AlreadyMatched);
        }
        if self.dispute_opened {
            return Err(Error::DisputeOpen);
        }
        if *counterparty == self.creator {
            return Err(Error::SelfTrade);
        }

        self.counterparty = Some(counterparty.clone());
        Ok(())
    }

    /// Sets the caller's confirmation flag.
    ///
    /// Returns `true` when this confirmation was the second one, i.e. the offer must now
    /// be removed and its custody released.
    ///
    /// # Errors
    /// - NotMatched: no counterparty yet
    /// - DisputeOpen: confirmations are rejected unconditionally once disputed
    /// - NotParticipant: caller is neither creator nor counterparty
    /// - AlreadyConfirmed: caller's flag is already set
    pub(crate) fn confirm(&mut self, caller: &Address) -> Result<bool, Error> {
        if self.counterparty.is_none() {
            return Err(Error::NotMatched);
        }
        if self.dispute_opened {
            return Err(Error::DisputeOpen);
        }

        let flag = match self.participant(caller) {
            Some(Participant::Creator) => &mut self.creator_confirmed,
            Some(Participant::Counterparty) => &mut self.counterparty_confirmed,
            None => return Err(Error::NotParticipant),
        };
        if *flag {
            return Err(Error::AlreadyConfirmed);
        }
        *flag = true;

        Ok(self.creator_confirmed && self.counterparty_confirmed)
    }

    /// Checks that `caller` may withdraw this offer.
    ///
    /// # Errors
    /// - NotCreator: caller did not create the offer
    /// - AlreadyMatched: a counterparty is already committed
    /// - DisputeOpen: the offer is frozen by a dispute
    pub(crate) fn check_cancel(&self, caller: &Address) -> Result<(), Error> {
        if *caller != self.creator {
            return Err(Error::NotCreator);
        }
        if self.counterparty.is_some() {
            return Err(Error::AlreadyMatched);
        }
        if self.dispute_opened {
            return Err(Error::DisputeOpen);
        }
        Ok(())
    }

    /// Freezes the confirmation flow until the arbiter resolves.
    ///
    /// # Errors
    /// - NotMatched: disputes need both sides
    /// - NotParticipant: caller is neither creator nor counterparty
    /// - DisputeAlreadyOpen: already frozen
    pub(crate) fn open_dispute(&mut self, caller: &Address) -> Result<(), Error> {
        if self.counterparty.is_none() {
            return Err(Error::NotMatched);
        }
        if self.participant(caller).is_none() {
            return Err(Error::NotParticipant);
        }
        if self.dispute_opened {
            return Err(Error::DisputeAlreadyOpen);
        }

        self.dispute_opened = true;
        Ok(())
    }

    /// Returns where the arbiter's ruling sends the custodied asset.
    ///
    /// The ruling overrides direction-derived routing: the asset goes to the creator when
    /// `favor_creator`, otherwise to the counterparty, whoever deposited it.
    ///
    /// # Errors
    /// - DisputeNotOpen: nothing to resolve
    /// - NotArbiter: caller is not this offer's arbiter
    pub(crate) fn resolution_recipient(
        &self,
        caller: &Address,
        favor_creator: bool,
    ) -> Result<Address, Error> {
        if !self.dispute_opened {
            return Err(Error::DisputeNotOpen);
        }
        if *caller != self.arbiter {
            return Err(Error::NotArbiter);
        }

        if favor_creator {
            Ok(self.creator.clone())
        } else {
            // A dispute can only be opened on a matched offer.
            self.counterparty.clone().ok_or(Error::NotMatched)
        }
    }
}
