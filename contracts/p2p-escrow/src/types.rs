/*!
 * Type Definitions for the P2P Escrow Contract
 *
 * Data structures, enums, error codes, storage keys and event topics shared by the
 * offer state machine, the registry and the contract entry points.
 */

use soroban_sdk::{contracterror, contracttype, symbol_short, Address, Symbol};

// ================================================================================================
// CORE DATA STRUCTURES
// ================================================================================================

/// A single trade proposal between an offer creator and a (future) counterparty.
///
/// The on-chain asset side is custodied by the contract; the currency side is settled
/// off-chain and attested by both parties through confirmations.
///
/// # Lifecycle
/// - Created open (no counterparty, no confirmations, no dispute)
/// - Matched once by `accept_offer` (counterparty is never cleared or reassigned)
/// - Removed exactly once: both confirmed, cancelled before match, or dispute resolved
///
/// # Custody
/// - `CreatorSells`: the creator deposits `asset_amount` at creation
/// - `CreatorBuys`: the counterparty deposits `asset_amount` when matching
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offer {
    /// Unique ordinal assigned at creation, never reused
    pub id: u64,

    /// The address that proposed the offer
    pub creator: Address,

    /// The only address allowed to resolve a dispute on this offer
    pub arbiter: Address,

    /// Amount of the on-chain asset, in the token's smallest unit
    pub asset_amount: i128,

    /// Amount of off-chain currency expected in exchange
    /// Never verified on-chain; the ratio asset_amount/currency_amount is the price
    pub currency_amount: i128,

    /// Which side deposits the asset and who receives it on completion
    pub direction: Direction,

    /// Set exactly once when the offer is matched
    pub counterparty: Option<Address>,

    /// Creator attests the off-chain leg is settled
    pub creator_confirmed: bool,

    /// Counterparty attests the off-chain leg is settled
    pub counterparty_confirmed: bool,

    /// Once set, only the arbiter can close the offer
    pub dispute_opened: bool,
}

// ================================================================================================
// ENUMERATIONS
// ================================================================================================

/// Which side of the trade the creator is on.
///
/// - CreatorSells: creator gives the asset, receives currency off-chain
/// - CreatorBuys: creator pays currency off-chain, receives the asset
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    CreatorSells,
    CreatorBuys,
}

/// Observable status of an offer still present in the registry.
///
/// Completed, Cancelled and Resolved offers are removed, so they are never reported;
/// a lookup of their id yields nothing.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OfferStatus {
    /// Waiting for a counterparty
    Open,
    /// Counterparty set, confirmations pending
    Matched,
    /// Confirmation flow halted until the arbiter resolves
    Disputed,
}

/// The two participants of a matched offer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Participant {
    Creator,
    Counterparty,
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Every failure an escrow operation can report.
///
/// All errors are terminal for the invoking operation and leave state untouched.
///
/// # Error Code Ranges
/// - 1-2: Bootstrap
/// - 3-11: Offer lifecycle
/// - 12-14: Authorization
/// - 15-17: Funds, validation and circuit breaker
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ========== Bootstrap (1-2) ==========

    /// The contract has not been initialized yet
    NotInitialized = 1,

    /// `initialize` was already called once
    AlreadyInitialized = 2,

    // ========== Offer Lifecycle (3-11) ==========

    /// No offer with this id is in the registry (never created or already removed)
    NotFound = 3,

    /// The offer already has a counterparty
    AlreadyMatched = 4,

    /// The offer has no counterparty yet
    NotMatched = 5,

    /// Caller already confirmed this offer
    AlreadyConfirmed = 6,

    /// A dispute is open; normal flow is frozen
    DisputeOpen = 7,

    /// A dispute was already opened on this offer
    DisputeAlreadyOpen = 8,

    /// The offer is not in dispute
    DisputeNotOpen = 9,

    /// The creator tried to accept their own offer
    SelfTrade = 10,

    /// Caller is neither the creator nor the counterparty
    NotParticipant = 11,

    // ========== Authorization (12-14) ==========

    /// Only the offer creator may do this
    NotCreator = 12,

    /// Only the offer arbiter may do this
    NotArbiter = 13,

    /// Only the contract admin may do this
    NotAdmin = 14,

    // ========== Funds and Validation (15-17) ==========

    /// The depositing party's asset balance does not cover the amount,
    /// or the vault does not hold enough to release
    InsufficientFunds = 15,

    /// Amount is non-positive or outside the configured limits
    InvalidAmount = 16,

    /// Trading is halted by the admin
    ContractPaused = 17,
}

// ================================================================================================
// STORAGE KEYS
// ================================================================================================

// Persistent: configuration that survives upgrades
pub const ADMIN_KEY: Symbol = symbol_short!("ADMIN");
pub const ASSET_TOKEN_KEY: Symbol = symbol_short!("ASSET_TKN");
pub const MIN_AMOUNT_KEY: Symbol = symbol_short!("MIN_AMT");
pub const MAX_AMOUNT_KEY: Symbol = symbol_short!("MAX_AMT");

// Instance: runtime state
pub const OFFERS_KEY: Symbol = symbol_short!("OFFERS");
pub const CREATOR_INDEX_KEY: Symbol = symbol_short!("CRTR_IDX");
pub const NEXT_OFFER_ID: Symbol = symbol_short!("NEXT_O_ID");
pub const VAULT_BALANCE_KEY: Symbol = symbol_short!("VAULT_BAL");
pub const PAUSED_KEY: Symbol = symbol_short!("PAUSED");

// ================================================================================================
// EVENT TOPICS
// ================================================================================================
// Each topic is published together with the acting address, strictly after the state
// change it describes has been written.

/// Contains: (offer_id, asset_amount, currency_amount, direction)
pub const OFFER_CREATED: Symbol = symbol_short!("offr_crt");

/// Contains: (offer_id,)
pub const OFFER_MATCHED: Symbol = symbol_short!("offr_mtch");

/// Contains: (offer_id,)
pub const OFFER_CONFIRMED: Symbol = symbol_short!("offr_conf");

/// Contains: (offer_id, asset_amount)
/// Topic address is the recipient of the custodied asset
pub const OFFER_RELEASED: Symbol = symbol_short!("offr_rlse");

/// Contains: (offer_id,)
pub const OFFER_CANCELLED: Symbol = symbol_short!("offr_canc");

/// Contains: (offer_id,)
pub const DISPUTE_OPENED: Symbol = symbol_short!("dis_open");

/// Contains: (offer_id, favor_creator)
pub const DISPUTE_RESOLVED: Symbol = symbol_short!("dis_resl");

/// Contains: new_admin
/// Topic address is the escrow contract itself
pub const ADMIN_UPDATED: Symbol = symbol_short!("adm_upd");
