//! Scenario tests for the pool engine, stores and HTTP surface.

mod churn;
mod db;
mod queue;

use std::sync::Arc;

use murk_account::AccountId;
use murk_keypair::Keypair;
use murk_privacy::{Denomination, PrivateNote};
use rand::rngs::OsRng;

use crate::clock::ManualClock;
use crate::pool::PrivacyPool;
use crate::storage::{LedgerStore, MemoryStore};

pub(crate) const START: i64 = 1_700_000_000;
pub(crate) const TENTH: u64 = 100_000_000;
pub(crate) const HALF: u64 = 500_000_000;
pub(crate) const ONE: u64 = 1_000_000_000;

pub(crate) struct Harness {
    pub pool: PrivacyPool,
    pub clock: Arc<ManualClock>,
    pub authority: AccountId,
    /// Signing key of `authority`.
    pub operator: Keypair,
}

impl Harness {
    /// Fresh in-memory pool, initialized with a random authority.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn LedgerStore>) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let mut pool = PrivacyPool::new(store, clock.clone());
        let operator = Keypair::new_random();
        let authority = operator.account_id();
        pool.init_pool(authority).unwrap();
        Self {
            pool,
            clock,
            authority,
            operator,
        }
    }

    /// New account holding `lamports`.
    pub fn funded(&mut self, lamports: u64) -> Keypair {
        let kp = Keypair::new_random();
        self.pool.airdrop(kp.account_id(), lamports).unwrap();
        kp
    }

    /// Deposits a fresh note of `d` from a freshly funded depositor.
    pub fn deposit_note(&mut self, d: Denomination) -> PrivateNote {
        let depositor = self.funded(d.lamports());
        let note = PrivateNote::generate(d, self.clock_now(), &mut OsRng);
        self.pool
            .deposit(depositor.account_id(), note.commitment, note.amount)
            .unwrap();
        note
    }

    /// Funds the pool vault through plain deposits.
    pub fn seed_vault(&mut self, d: Denomination, count: usize) {
        for _ in 0..count {
            let depositor = self.funded(d.lamports());
            self.pool.pool_deposit(depositor.account_id(), d.lamports()).unwrap();
        }
    }

    /// Requests a withdrawal of `amount` for a fresh recipient.
    pub fn ready_request(&mut self, amount: u64) -> AccountId {
        let recipient = Keypair::new_random().account_id();
        self.pool.request_withdrawal(recipient, amount).unwrap();
        recipient
    }

    pub fn wait_out_delay(&self) {
        self.clock.advance(crate::pool::MAX_DELAY_SECONDS);
    }

    pub fn clock_now(&self) -> i64 {
        use crate::clock::Clock;
        self.clock.now()
    }

    pub fn vault(&self) -> u64 {
        self.pool
            .balance(&crate::pool::pool_vault_address())
            .unwrap()
    }
}
