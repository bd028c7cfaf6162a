/*!
 * P2P Escrow Smart Contract
 *
 * Peer-to-peer exchange of an on-chain asset against an off-chain currency payment,
 * with the asset held in contract custody and a per-offer arbiter for disagreements.
 *
 * Key features:
 * - Offers in both directions: the creator either sells or buys the on-chain asset
 * - Dual confirmation releases custody exactly once
 * - Disputes freeze confirmations; the offer's arbiter decides who receives the asset
 * - Admin circuit breaker and amount limits
 * - Events published after every committed transition
 *
 * Business Logic:
 * 1. A creator publishes an offer (sell offers are funded immediately)
 * 2. A counterparty accepts it (buy offers are funded by the counterparty now)
 * 3. Both parties settle the currency off-chain and confirm
 * 4. The contract releases the asset to the buyer side and removes the offer
 * 5. Either party may instead open a dispute, which only the arbiter can resolve
 *
 * Every operation validates all preconditions before it changes anything; a failed
 * operation leaves offers, the creator index, the id counter and custody untouched.
 */

#![no_std]

mod offer;
mod registry;
mod types;


use soroban_sdk::{contract, contractimpl, log, token, Address, Env, Vec};

use registry::{CustodyVault, OfferRegistry};
pub use types::{Direction, Error, Offer, OfferStatus};
use types::{
    ADMIN_KEY, ADMIN_UPDATED, ASSET_TOKEN_KEY, DISPUTE_OPENED, DISPUTE_RESOLVED, MAX_AMOUNT_KEY,
    MIN_AMOUNT_KEY, OFFER_CANCELLED, OFFER_CONFIRMED, OFFER_CREATED, OFFER_MATCHED, OFFER_RELEASED,
    PAUSED_KEY,
};

#[contract]
pub struct P2PEscrowContract;

// Default configuration values - fallbacks if storage is not set
const DEFAULT_MIN_ASSET_AMOUNT: i128 = 1;
const DEFAULT_MAX_ASSET_AMOUNT: i128 = 1_000_000_000_000_000;

impl P2PEscrowContract {
    // ============================================================================================
    // INTERNAL GUARDS
    // ============================================================================================

    /// Verifies `caller` is the stored admin and has signed the invocation.
    fn _require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
        caller.require_auth();
        let admin: Address = env
            .storage()
            .persistent()
            .get(&ADMIN_KEY)
            .ok_or(Error::NotInitialized)?;
        if admin != *caller {
            return Err(Error::NotAdmin);
        }
        Ok(())
    }

    fn _require_not_paused(env: &Env) -> Result<(), Error> {
        if env.storage().instance().get(&PAUSED_KEY).unwrap_or(false) {
            return Err(Error::ContractPaused);
        }
        Ok(())
    }

    fn _validate_amounts(
        env: &Env,
        asset_amount: i128,
        currency_amount: i128,
    ) -> Result<(), Error> {
        if asset_amount <= 0 || currency_amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let (min_amount, max_amount) = Self::get_amount_limits(env.clone());
        if asset_amount < min_amount || asset_amount > max_amount {
            log!(env, "Amount out of range. Min: {}, Max: {}, Provided: {}",
                min_amount, max_amount, asset_amount);
            return Err(Error::InvalidAmount);
        }
        Ok(())
    }

    fn _filter_offers(env: &Env, keep: impl Fn(&Offer) -> bool) -> Vec<Offer> {
        let mut selected = Vec::new(env);
        for offer in Self::get_offers(env.clone()).iter() {
            if keep(&offer) {
                selected.push_back(offer);
            }
        }
        selected
    }

    fn _filter_creator_offers(
        env: &Env,
        creator: &Address,
        keep: impl Fn(&Offer) -> bool,
    ) -> Vec<Offer> {
        let mut selected = Vec::new(env);
        let Ok(registry) = OfferRegistry::load(env) else {
            return selected;
        };
        for offer in registry.creator_offers(creator).iter() {
            if keep(&offer) {
                selected.push_back(offer);
            }
        }
        selected
    }
}

#[contractimpl]
impl P2PEscrowContract {
    /// Initializes the escrow with its admin and the asset token it custodies.
    /// Can only be called once.
    ///
    /// # Arguments
    /// * `admin` - Address allowed to pause trading and change configuration
    /// * `asset_token` - Token contract of the on-chain asset being exchanged
    ///
    /// # Errors
    /// - AlreadyInitialized: If called a second time
    pub fn initialize(env: Env, admin: Address, asset_token: Address) -> Result<(), Error> {
        // Prevent double initialization
        if env.storage().persistent().has(&ADMIN_KEY) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        // Panics if the address does not implement the token interface
        let _ = token::Client::new(&env, &asset_token).decimals();

        // Configuration lives in persistent storage
        env.storage().persistent().set(&ADMIN_KEY, &admin);
        env.storage().persistent().set(&ASSET_TOKEN_KEY, &asset_token);
        env.storage().persistent().set(&MIN_AMOUNT_KEY, &DEFAULT_MIN_ASSET_AMOUNT);
        env.storage().persistent().set(&MAX_AMOUNT_KEY, &DEFAULT_MAX_ASSET_AMOUNT);

        // Runtime state lives in instance storage
        OfferRegistry::bootstrap(&env);
        env.storage().instance().set(&PAUSED_KEY, &false);

        Ok(())
    }

    // ============================================================================================
    // OFFER LIFECYCLE
    // ============================================================================================

    /// Publishes a new offer with `creator` as its proposer.
    ///
    /// # Business Flow
    /// 1. Validates authorization and amounts
    /// 2. For sell offers, moves `asset_amount` from the creator into custody
    /// 3. Allocates the next id and indexes the offer under its creator
    /// 4. Emits `offr_crt`
    ///
    /// The id counter only advances when the offer is actually stored, so a rejected
    /// creation consumes no id.
    ///
    /// # Arguments
    /// * `creator` - The proposer (must sign)
    /// * `arbiter` - The only address able to resolve a dispute on this offer
    /// * `asset_amount` - On-chain asset quantity
    /// * `currency_amount` - Off-chain currency quantity expected in exchange
    /// * `direction` - Whether the creator sells or buys the asset
    ///
    /// # Returns
    /// The id of the new offer
    ///
    /// # Errors
    /// - NotInitialized, ContractPaused
    /// - InvalidAmount: Non-positive or out-of-range amounts
    /// - InsufficientFunds: Sell offer the creator cannot fund
    pub fn create_offer(
        env: Env,
        creator: Address,
        arbiter: Address,
        asset_amount: i128,
        currency_amount: i128,
        direction: Direction,
    ) -> Result<u64, Error> {
        // Emergency brake - halt trading if contract is paused
        Self::_require_not_paused(&env)?;

        // Verify the creator has signed this transaction
        creator.require_auth();

        let mut registry = OfferRegistry::load(&env)?;
        Self::_validate_amounts(&env, asset_amount, currency_amount)?;

        // Sell offers are funded here, before an id is allocated
        let offer = registry.create(creator, arbiter, asset_amount, currency_amount, direction)?;

        // Persist changes to storage
        registry.commit();

        // Emit event for off-chain indexing
        env.events().publish(
            (OFFER_CREATED, offer.creator.clone()),
            (offer.id, asset_amount, currency_amount, direction),
        );

        Ok(offer.id)
    }

    /// Matches an open offer with `counterparty`.
    ///
    /// On a buy offer the counterparty is the seller, so their `asset_amount` moves into
    /// custody now; if they cannot cover it the match is rejected and the offer stays open.
    ///
    /// # Errors
    /// - NotInitialized, ContractPaused
    /// - NotFound: No such offer
    /// - SelfTrade: The creator cannot accept their own offer
    /// - AlreadyMatched: The offer already has a counterparty
    /// - DisputeOpen: The offer is frozen
    /// - InsufficientFunds: Buy offer the counterparty cannot fund
    pub fn accept_offer(env: Env, counterparty: Address, offer_id: u64) -> Result<(), Error> {
        Self::_require_not_paused(&env)?;
        counterparty.require_auth();

        let mut registry = OfferRegistry::load(&env)?;
        let mut offer = registry.get(offer_id)?;
        offer.accept(&counterparty)?;

        // On buy offers the counterparty funds custody now
        registry.record_match(&offer)?;
        registry.commit();

        env.events().publish((OFFER_MATCHED, counterparty), (offer_id,));

        Ok(())
    }

    /// Records that `caller` considers the off-chain leg settled.
    ///
    /// When the second participant confirms, the offer is removed and the custodied
    /// asset goes to the buying side: the counterparty on sell offers, the creator on
    /// buy offers. Removal gates the release, so it can happen only once.
    ///
    /// # Errors
    /// - NotInitialized, ContractPaused
    /// - NotFound: No such offer (including one already completed)
    /// - NotMatched: Nobody accepted the offer yet
    /// - DisputeOpen: Confirmations are frozen by a dispute
    /// - NotParticipant: Caller is neither creator nor counterparty
    /// - AlreadyConfirmed: Caller already confirmed
    pub fn complete_transaction(env: Env, caller: Address, offer_id: u64) -> Result<(), Error> {
        Self::_require_not_paused(&env)?;
        caller.require_auth();

        let mut registry = OfferRegistry::load(&env)?;
        let mut offer = registry.get(offer_id)?;
        let fully_confirmed = offer.confirm(&caller)?;

        // Second confirmation: remove the offer and pay out its custody
        let released_to = if fully_confirmed {
            let recipient = offer.default_recipient().ok_or(Error::NotMatched)?;
            registry.settle(&offer, &recipient)?;
            Some(recipient)
        } else {
            registry.update(&offer);
            None
        };
        registry.commit();

        // Confirmation first, then the release it triggered
        env.events().publish((OFFER_CONFIRMED, caller), (offer_id,));
        if let Some(recipient) = released_to {
            env.events()
                .publish((OFFER_RELEASED, recipient), (offer_id, offer.asset_amount));
        }

        Ok(())
    }

    /// Withdraws an offer nobody has accepted yet.
    ///
    /// The offer leaves the registry and the creator index together; a sell offer's
    /// deposit goes back to the creator. Every check runs before anything is removed.
    ///
    /// # Errors
    /// - NotInitialized, ContractPaused
    /// - NotFound: No such offer
    /// - NotCreator: Only the creator can cancel
    /// - AlreadyMatched: A counterparty is committed
    /// - DisputeOpen: The offer is frozen
    pub fn cancel_offer(env: Env, caller: Address, offer_id: u64) -> Result<(), Error> {
        Self::_require_not_paused(&env)?;
        caller.require_auth();

        let mut registry = OfferRegistry::load(&env)?;
        let offer = registry.get(offer_id)?;

        // All checks run before the offer is removed
        offer.check_cancel(&caller)?;

        registry.withdraw(&offer)?;
        registry.commit();

        env.events().publish((OFFER_CANCELLED, caller), (offer_id,));

        Ok(())
    }

    // ============================================================================================
    // DISPUTE RESOLUTION
    // ============================================================================================
    // Not gated by the circuit breaker, so custody can still be unwound while paused.

    /// Halts the confirmation flow on a matched offer until its arbiter resolves it.
    ///
    /// # Errors
    /// - NotInitialized
    /// - NotFound: No such offer
    /// - NotMatched: Disputes need a counterparty
    /// - NotParticipant: Caller is neither creator nor counterparty
    /// - DisputeAlreadyOpen: Already in dispute
    pub fn open_dispute(env: Env, caller: Address, offer_id: u64) -> Result<(), Error> {
        caller.require_auth();

        let mut registry = OfferRegistry::load(&env)?;
        let mut offer = registry.get(offer_id)?;
        offer.open_dispute(&caller)?;

        registry.update(&offer);
        registry.commit();

        env.events().publish((DISPUTE_OPENED, caller), (offer_id,));

        Ok(())
    }

    /// Closes a disputed offer on the arbiter's ruling.
    ///
    /// The custodied asset goes to the creator if `favor_creator`, otherwise to the
    /// counterparty, regardless of which side deposited it. The offer is removed.
    ///
    /// # Errors
    /// - NotInitialized
    /// - NotFound: No such offer
    /// - DisputeNotOpen: Nothing to resolve
    /// - NotArbiter: Caller is not this offer's arbiter
    pub fn resolve_dispute(
        env: Env,
        caller: Address,
        offer_id: u64,
        favor_creator: bool,
    ) -> Result<(), Error> {
        caller.require_auth();

        let mut registry = OfferRegistry::load(&env)?;
        let offer = registry.get(offer_id)?;
        // Only this offer's arbiter decides; the deposit's origin does not matter
        let recipient = offer.resolution_recipient(&caller, favor_creator)?;

        registry.settle(&offer, &recipient)?;
        registry.commit();

        env.events()
            .publish((DISPUTE_RESOLVED, caller), (offer_id, favor_creator));
        env.events()
            .publish((OFFER_RELEASED, recipient), (offer_id, offer.asset_amount));

        Ok(())
    }

    // ============================================================================================
    // ADMINISTRATIVE FUNCTIONS
    // ============================================================================================

    /// Halts offer creation, matching, confirmation and cancellation.
    pub fn pause(env: Env, caller: Address) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;
        env.storage().instance().set(&PAUSED_KEY, &true);
        Ok(())
    }

    pub fn unpause(env: Env, caller: Address) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;
        env.storage().instance().set(&PAUSED_KEY, &false);
        Ok(())
    }

    /// Hands administrative control to `new_admin`, who must also sign.
    pub fn update_admin(env: Env, caller: Address, new_admin: Address) -> Result<(), Error> {
        // Verify current admin authorization
        Self::_require_admin(&env, &caller)?;

        // Require new admin to sign transaction - prevents accidental transfers
        new_admin.require_auth();

        env.storage().persistent().set(&ADMIN_KEY, &new_admin);

        // Emit event for audit trail
        env.events()
            .publish((ADMIN_UPDATED, env.current_contract_address()), new_admin);

        Ok(())
    }

    /// Sets the accepted `asset_amount` range for new offers.
    /// Existing offers keep their amounts.
    ///
    /// # Errors
    /// - NotAdmin
    /// - InvalidAmount: Unless 0 < min_amount <= max_amount
    pub fn update_amount_limits(
        env: Env,
        caller: Address,
        min_amount: i128,
        max_amount: i128,
    ) -> Result<(), Error> {
        Self::_require_admin(&env, &caller)?;

        if min_amount <= 0 || min_amount > max_amount {
            return Err(Error::InvalidAmount);
        }

        env.storage().persistent().set(&MIN_AMOUNT_KEY, &min_amount);
        env.storage().persistent().set(&MAX_AMOUNT_KEY, &max_amount);
        Ok(())
    }

    // ============================================================================================
    // QUERY FUNCTIONS
    // ============================================================================================
    // Read-only projections. They never fail; before `initialize` they report empty state.

    pub fn get_admin(env: Env) -> Option<Address> {
        env.storage().persistent().get(&ADMIN_KEY)
    }

    pub fn get_asset_token(env: Env) -> Option<Address> {
        env.storage().persistent().get(&ASSET_TOKEN_KEY)
    }

    /// Returns (min_amount, max_amount) accepted for new offers.
    pub fn get_amount_limits(env: Env) -> (i128, i128) {
        let min = env
            .storage()
            .persistent()
            .get(&MIN_AMOUNT_KEY)
            .unwrap_or(DEFAULT_MIN_ASSET_AMOUNT);
        let max = env
            .storage()
            .persistent()
            .get(&MAX_AMOUNT_KEY)
            .unwrap_or(DEFAULT_MAX_ASSET_AMOUNT);
        (min, max)
    }

    pub fn is_paused(env: Env) -> bool {
        env.storage().instance().get(&PAUSED_KEY).unwrap_or(false)
    }

    /// The id the next successful `create_offer` will assign.
    pub fn get_next_offer_id(env: Env) -> u64 {
        OfferRegistry::load(&env)
            .map(|registry| registry.next_id())
            .unwrap_or(0)
    }

    /// Aggregate amount of the asset currently in custody.
    pub fn get_vault_balance(env: Env) -> i128 {
        CustodyVault::held(&env)
    }

    pub fn get_offer(env: Env, offer_id: u64) -> Option<Offer> {
        OfferRegistry::load(&env).ok()?.get(offer_id).ok()
    }

    pub fn get_offer_status(env: Env, offer_id: u64) -> Option<OfferStatus> {
        Self::get_offer(env, offer_id).map(|offer| offer.status())
    }

    /// All live offers in ascending id order.
    /// Can be expensive for large registries; prefer `get_offer` for lookups.
    pub fn get_offers(env: Env) -> Vec<Offer> {
        match OfferRegistry::load(&env) {
            Ok(registry) => registry.offers(),
            Err(_) => Vec::new(&env),
        }
    }

    /// Offers still waiting for a counterparty.
    pub fn get_unmatched_offers(env: Env) -> Vec<Offer> {
        Self::_filter_offers(&env, |offer| offer.status() == OfferStatus::Open)
    }

    /// Offers frozen by an open dispute.
    pub fn get_disputed_offers(env: Env) -> Vec<Offer> {
        Self::_filter_offers(&env, |offer| offer.status() == OfferStatus::Disputed)
    }

    /// Ids indexed under `creator`, in creation order.
    pub fn get_creator_offer_ids(env: Env, creator: Address) -> Vec<u64> {
        match OfferRegistry::load(&env) {
            Ok(registry) => registry.creator_ids(&creator),
            Err(_) => Vec::new(&env),
        }
    }

    pub fn get_creator_offers(env: Env, creator: Address) -> Vec<Offer> {
        Self::_filter_creator_offers(&env, &creator, |_| true)
    }

    pub fn get_creator_buy_offers(env: Env, creator: Address) -> Vec<Offer> {
        Self::_filter_creator_offers(&env, &creator, |offer| {
            offer.direction == Direction::CreatorBuys
        })
    }

    pub fn get_creator_sell_offers(env: Env, creator: Address) -> Vec<Offer> {
        Self::_filter_creator_offers(&env, &creator, |offer| {
            offer.direction == Direction::CreatorSells
        })
    }
}
