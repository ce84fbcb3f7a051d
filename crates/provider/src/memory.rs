//! In-memory billing provider for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, WalletId};
use domain::{Coupon, Plan, Subscription, SubscriptionStatus};

use crate::BillingProvider;
use crate::error::{ProviderError, Result};

#[derive(Debug, Default)]
struct InMemoryProviderState {
    wallets: HashMap<String, f64>,
    customers: HashSet<String>,
    subscriptions: HashMap<String, Subscription>,
    coupons: HashMap<String, Coupon>,
    plans: HashMap<String, Plan>,
    top_ups: Vec<(String, u32)>,
    voids: Vec<(String, u32)>,
    pays: Vec<(String, u32)>,
    terminated_wallets: Vec<String>,
    deleted_customers: Vec<String>,
    terminated_subscriptions: Vec<String>,
    terminated_coupons: Vec<String>,
    invoices: Vec<(AccountId, String)>,
    next_wallet: u32,
    next_customer: u32,
    fail_on_create_wallet: bool,
    fail_on_create_customer: bool,
    fail_on_grant: bool,
    fail_on_create_subscription: bool,
    fail_terminations: HashSet<String>,
}

/// In-memory billing provider with failure switches for saga tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingProvider {
    state: Arc<RwLock<InMemoryProviderState>>,
}

impl InMemoryBillingProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn failed(what: &str) -> ProviderError {
        ProviderError::Transport(format!("injected {what} failure"))
    }

    // -- failure switches --

    /// Configures wallet creation to fail.
    pub fn set_fail_on_create_wallet(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_wallet = fail;
    }

    /// Configures customer creation to fail.
    pub fn set_fail_on_create_customer(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_customer = fail;
    }

    /// Configures wallet top-ups to fail.
    pub fn set_fail_on_grant(&self, fail: bool) {
        self.state.write().unwrap().fail_on_grant = fail;
    }

    /// Configures subscription creation to fail.
    pub fn set_fail_on_create_subscription(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_subscription = fail;
    }

    /// Marks a subscription external id or coupon code as failing to
    /// terminate; batch jobs must keep going past it.
    pub fn fail_termination_of(&self, id: impl Into<String>) {
        self.state.write().unwrap().fail_terminations.insert(id.into());
    }

    // -- seeds --

    /// Registers a plan.
    pub fn insert_plan(&self, plan: Plan) {
        self.state
            .write()
            .unwrap()
            .plans
            .insert(plan.code.clone(), plan);
    }

    /// Registers a coupon.
    pub fn insert_coupon(&self, coupon: Coupon) {
        self.state
            .write()
            .unwrap()
            .coupons
            .insert(coupon.code.clone(), coupon);
    }

    /// Registers a subscription.
    pub fn insert_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .unwrap()
            .subscriptions
            .insert(subscription.external_id.clone(), subscription);
    }

    /// Sets a wallet's balance directly.
    pub fn set_wallet_balance(&self, wallet_id: &WalletId, balance: f64) {
        self.state
            .write()
            .unwrap()
            .wallets
            .insert(wallet_id.as_str().to_string(), balance);
    }

    // -- observers --

    /// Number of live (non-terminated) wallets.
    pub fn wallet_count(&self) -> usize {
        self.state.read().unwrap().wallets.len()
    }

    /// Number of live customers.
    pub fn customer_count(&self) -> usize {
        self.state.read().unwrap().customers.len()
    }

    /// All top-up calls as (wallet id, credits) pairs, in order.
    pub fn top_ups(&self) -> Vec<(String, u32)> {
        self.state.read().unwrap().top_ups.clone()
    }

    /// All void (spend) calls as (wallet id, credits) pairs, in order.
    pub fn voids(&self) -> Vec<(String, u32)> {
        self.state.read().unwrap().voids.clone()
    }

    /// All paid-credit calls as (wallet id, credits) pairs, in order.
    pub fn pays(&self) -> Vec<(String, u32)> {
        self.state.read().unwrap().pays.clone()
    }

    /// Wallet ids passed to terminate, in call order (repeats included).
    pub fn terminated_wallets(&self) -> Vec<String> {
        self.state.read().unwrap().terminated_wallets.clone()
    }

    /// Customer ids passed to delete, in call order.
    pub fn deleted_customers(&self) -> Vec<String> {
        self.state.read().unwrap().deleted_customers.clone()
    }

    /// External ids of terminated subscriptions.
    pub fn terminated_subscriptions(&self) -> Vec<String> {
        self.state.read().unwrap().terminated_subscriptions.clone()
    }

    /// Codes of terminated coupons.
    pub fn terminated_coupons(&self) -> Vec<String> {
        self.state.read().unwrap().terminated_coupons.clone()
    }
}

#[async_trait]
impl BillingProvider for InMemoryBillingProvider {
    async fn create_wallet(&self, _account_id: AccountId) -> Result<WalletId> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create_wallet {
            return Err(Self::failed("create wallet"));
        }
        state.next_wallet += 1;
        let id = format!("wal-{:04}", state.next_wallet);
        state.wallets.insert(id.clone(), 0.0);
        Ok(WalletId::new(id))
    }

    async fn terminate_wallet(&self, wallet_id: &WalletId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state
            .terminated_wallets
            .push(wallet_id.as_str().to_string());
        state.wallets.remove(wallet_id.as_str());
        Ok(())
    }

    async fn wallet_balance(&self, wallet_id: &WalletId) -> Result<f64> {
        let state = self.state.read().unwrap();
        state
            .wallets
            .get(wallet_id.as_str())
            .copied()
            .ok_or_else(|| ProviderError::NotFound("wallet".to_string()))
    }

    async fn grant_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_grant {
            return Err(Self::failed("top up wallet"));
        }
        *state
            .wallets
            .entry(wallet_id.as_str().to_string())
            .or_insert(0.0) += credits as f64;
        state
            .top_ups
            .push((wallet_id.as_str().to_string(), credits));
        Ok(())
    }

    async fn void_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<()> {
        let mut state = self.state.write().unwrap();
        *state
            .wallets
            .entry(wallet_id.as_str().to_string())
            .or_insert(0.0) -= credits as f64;
        state.voids.push((wallet_id.as_str().to_string(), credits));
        Ok(())
    }

    async fn pay_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<()> {
        let mut state = self.state.write().unwrap();
        *state
            .wallets
            .entry(wallet_id.as_str().to_string())
            .or_insert(0.0) += credits as f64;
        state.pays.push((wallet_id.as_str().to_string(), credits));
        Ok(())
    }

    async fn create_customer(&self, _account_id: AccountId) -> Result<CustomerId> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create_customer {
            return Err(Self::failed("create customer"));
        }
        state.next_customer += 1;
        let id = format!("cus-{:04}", state.next_customer);
        state.customers.insert(id.clone());
        Ok(CustomerId::new(id))
    }

    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state
            .deleted_customers
            .push(customer_id.as_str().to_string());
        state.customers.remove(customer_id.as_str());
        Ok(())
    }

    async fn create_subscription(
        &self,
        account_id: AccountId,
        plan_code: &str,
        ending_at: DateTime<Utc>,
    ) -> Result<Subscription> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create_subscription {
            return Err(Self::failed("create subscription"));
        }
        let subscription = Subscription {
            external_id: format!("{plan_code}-{account_id}"),
            plan_code: plan_code.to_string(),
            status: SubscriptionStatus::Active,
            external_customer_id: Some(account_id.to_string()),
            ending_at: Some(ending_at),
        };
        state
            .subscriptions
            .insert(subscription.external_id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn find_subscription(&self, account_id: AccountId) -> Result<Subscription> {
        let customer = account_id.to_string();
        let state = self.state.read().unwrap();
        state
            .subscriptions
            .values()
            .find(|s| s.external_customer_id.as_deref() == Some(customer.as_str()))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound("subscription".to_string()))
    }

    async fn list_subscriptions(
        &self,
        page: u32,
        per_page: u32,
        statuses: &[SubscriptionStatus],
    ) -> Result<Vec<Subscription>> {
        let state = self.state.read().unwrap();
        let mut matching: Vec<Subscription> = state
            .subscriptions
            .values()
            .filter(|s| statuses.is_empty() || statuses.contains(&s.status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.external_id.cmp(&b.external_id));

        let skip = ((page.max(1) - 1) * per_page) as usize;
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect())
    }

    async fn terminate_subscription(&self, external_id: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_terminations.contains(external_id) {
            return Err(Self::failed("terminate subscription"));
        }
        match state.subscriptions.remove(external_id) {
            Some(_) => {
                state.terminated_subscriptions.push(external_id.to_string());
                Ok(())
            }
            None => Err(ProviderError::NotFound("subscription".to_string())),
        }
    }

    async fn has_active_subscription(&self, account_id: AccountId) -> Result<bool> {
        let customer = account_id.to_string();
        let state = self.state.read().unwrap();
        Ok(state.subscriptions.values().any(|s| {
            s.status == SubscriptionStatus::Active
                && s.external_customer_id.as_deref() == Some(customer.as_str())
        }))
    }

    async fn find_coupon(&self, code: &str) -> Result<Coupon> {
        let state = self.state.read().unwrap();
        state
            .coupons
            .get(code)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound("coupon".to_string()))
    }

    async fn list_coupons(&self, page: u32, per_page: u32) -> Result<Vec<Coupon>> {
        let state = self.state.read().unwrap();
        let mut coupons: Vec<Coupon> = state.coupons.values().cloned().collect();
        coupons.sort_by(|a, b| a.code.cmp(&b.code));

        let skip = ((page.max(1) - 1) * per_page) as usize;
        Ok(coupons
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect())
    }

    async fn terminate_coupon(&self, code: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_terminations.contains(code) {
            return Err(Self::failed("terminate coupon"));
        }
        match state.coupons.get_mut(code) {
            Some(coupon) => {
                coupon.terminated_at = Some(Utc::now());
                state.terminated_coupons.push(code.to_string());
                Ok(())
            }
            None => Err(ProviderError::NotFound("coupon".to_string())),
        }
    }

    async fn find_plan(&self, code: &str) -> Result<Plan> {
        let state = self.state.read().unwrap();
        state
            .plans
            .get(code)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound("plan".to_string()))
    }

    async fn list_plans(&self, page: u32, per_page: u32) -> Result<Vec<Plan>> {
        let state = self.state.read().unwrap();
        let mut plans: Vec<Plan> = state.plans.values().cloned().collect();
        plans.sort_by(|a, b| a.code.cmp(&b.code));

        let skip = ((page.max(1) - 1) * per_page) as usize;
        Ok(plans
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect())
    }

    async fn create_add_on_invoice(
        &self,
        account_id: AccountId,
        add_on_code: &str,
        _display_name: &str,
    ) -> Result<String> {
        let mut state = self.state.write().unwrap();
        state.invoices.push((account_id, add_on_code.to_string()));
        Ok(format!("inv-{:04}", state.invoices.len()))
    }
}
