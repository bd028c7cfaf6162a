/*!
 * Offer Registry
 *
 * Owns the offer map, the per-creator index and the id allocator, and is the only
 * holder of the vault capability. Each contract invocation loads the registry, applies
 * one operation to the in-memory maps and writes them back with `commit`; an
 * invocation that returns early with an error never commits.
 *
 * # Storage
 * - OFFERS_KEY: Map<u64, Offer> (instance)
 * - CREATOR_INDEX_KEY: Map<Address, Vec<u64>> (instance)
 * - NEXT_OFFER_ID: u64 (instance), only advanced when an offer is actually inserted
 */

mod vault;

use soroban_sdk::{Address, Env, Map, Vec};

use crate::types::{
    Direction, Error, Offer, ASSET_TOKEN_KEY, CREATOR_INDEX_KEY, NEXT_OFFER_ID, OFFERS_KEY,
    VAULT_BALANCE_KEY,
};

pub(crate) use vault::CustodyVault;
use vault::VaultCap;

pub(crate) struct OfferRegistry<'a> {
    env: &'a Env,
    offers: Map<u64, Offer>,
    creator_index: Map<Address, Vec<u64>>,
    next_id: u64,
    vault: CustodyVault<'a>,
    cap: VaultCap,
}

impl<'a> OfferRegistry<'a> {
    /// Writes the empty registry and vault state. Called once from `initialize`.
    pub(crate) fn bootstrap(env: &Env) {
        env.storage().instance().set(&NEXT_OFFER_ID, &0u64);
        env.storage().instance().set(&OFFERS_KEY, &Map::<u64, Offer>::new(env));
        env.storage()
            .instance()
            .set(&CREATOR_INDEX_KEY, &Map::<Address, Vec<u64>>::new(env));
        env.storage().instance().set(&VAULT_BALANCE_KEY, &0i128);
    }

    pub(crate) fn load(env: &'a Env) -> Result<Self, Error> {
        let asset_token: Address = env
            .storage()
            .persistent()
            .get(&ASSET_TOKEN_KEY)
            .ok_or(Error::NotInitialized)?;
        let instance = env.storage().instance();
        let offers: Map<u64, Offer> = instance.get(&OFFERS_KEY).ok_or(Error::NotInitialized)?;
        let creator_index: Map<Address, Vec<u64>> = instance
            .get(&CREATOR_INDEX_KEY)
            .ok_or(Error::NotInitialized)?;
        let next_id: u64 = instance.get(&NEXT_OFFER_ID).ok_or(Error::NotInitialized)?;

        Ok(OfferRegistry {
            env,
            offers,
            creator_index,
            next_id,
            vault: CustodyVault::open(env, &asset_token),
            cap: VaultCap::issue(),
        })
    }

    /// Persists the offer map, the creator index and the allocator together.
    pub(crate) fn commit(self) {
        let instance = self.env.storage().instance();
        instance.set(&OFFERS_KEY, &self.offers);
        instance.set(&CREATOR_INDEX_KEY, &self.creator_index);
        instance.set(&NEXT_OFFER_ID, &self.next_id);
    }

    pub(crate) fn get(&self, offer_id: u64) -> Result<Offer, Error> {
        self.offers.get(offer_id).ok_or(Error::NotFound)
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Allocates an id and inserts a new open offer.
    ///
    /// A sell offer is funded first: if the creator cannot cover `asset_amount` the
    /// call fails before any id is consumed.
    pub(crate) fn create(
        &mut self,
        creator: Address,
        arbiter: Address,
        asset_amount: i128,
        currency_amount: i128,
        direction: Direction,
    ) -> Result<Offer, Error> {
        if direction == Direction::CreatorSells {
            self.vault.deposit(&self.cap, &creator, asset_amount)?;
        }

        let id = self.next_id;
        let offer = Offer::new(id, creator, arbiter, asset_amount, currency_amount, direction);
        self.offers.set(id, offer.clone());
        self.index_insert(&offer.creator, id);
        self.next_id = id + 1;

        Ok(offer)
    }

    /// Stores a freshly matched offer, collecting the counterparty's deposit on buy offers.
    pub(crate) fn record_match(&mut self, offer: &Offer) -> Result<(), Error> {
        let counterparty = offer.counterparty.as_ref().ok_or(Error::NotMatched)?;
        if offer.direction == Direction::CreatorBuys {
            self.vault.deposit(&self.cap, counterparty, offer.asset_amount)?;
        }
        self.offers.set(offer.id, offer.clone());
        Ok(())
    }

    /// Stores a transition that moves no funds.
    pub(crate) fn update(&mut self, offer: &Offer) {
        self.offers.set(offer.id, offer.clone());
    }

    /// Removes a funded offer and releases its custody to `recipient`.
    ///
    /// Removal and release happen together here and nowhere else, so each deposit is
    /// released at most once.
    pub(crate) fn settle(&mut self, offer: &Offer, recipient: &Address) -> Result<(), Error> {
        self.remove(offer)?;
        self.vault.release(&self.cap, recipient, offer.asset_amount)
    }

    /// Removes an unmatched offer, refunding the creator's deposit on sell offers.
    pub(crate) fn withdraw(&mut self, offer: &Offer) -> Result<(), Error> {
        self.remove(offer)?;
        if offer.holds_custody() {
            self.vault.release(&self.cap, &offer.creator, offer.asset_amount)?;
        }
        Ok(())
    }

    fn remove(&mut self, offer: &Offer) -> Result<(), Error> {
        if self.offers.remove(offer.id).is_none() {
            return Err(Error::NotFound);
        }
        self.index_remove(&offer.creator, offer.id);
        Ok(())
    }

    fn index_insert(&mut self, creator: &Address, offer_id: u64) {
        let mut ids = self
            .creator_index
            .get(creator.clone())
            .unwrap_or(Vec::new(self.env));
        ids.push_back(offer_id);
        self.creator_index.set(creator.clone(), ids);
    }

    fn index_remove(&mut self, creator: &Address, offer_id: u64) {
        let Some(mut ids) = self.creator_index.get(creator.clone()) else {
            return;
        };
        if let Some(pos) = ids.first_index_of(offer_id) {
            ids.remove(pos);
        }
        if ids.is_empty() {
            self.creator_index.remove(creator.clone());
        } else {
            self.creator_index.set(creator.clone(), ids);
        }
    }

    // ============================================================================================
    // PROJECTIONS
    // ============================================================================================

    /// Every offer in ascending id order.
    pub(crate) fn offers(&self) -> Vec<Offer> {
        self.offers.values()
    }

    /// Ids indexed under `creator`, in creation order.
    pub(crate) fn creator_ids(&self, creator: &Address) -> Vec<u64> {
        self.creator_index
            .get(creator.clone())
            .unwrap_or(Vec::new(self.env))
    }

    /// Offers indexed under `creator`, in creation order.
    pub(crate) fn creator_offers(&self, creator: &Address) -> Vec<Offer> {
        let mut offers = Vec::new(self.env);
        for id in self.creator_ids(creator).iter() {
            if let Some(offer) = self.offers.get(id) {
                offers.push_back(offer);
            }
        }
        offers
    }
}
