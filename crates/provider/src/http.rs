//! HTTP client for a Lago-compatible billing provider.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, CustomerId, WalletId};
use domain::{Coupon, CouponType, ExpirationPolicy, Plan, Subscription, SubscriptionStatus};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Deserializer};

use crate::BillingProvider;
use crate::error::{ProviderError, Result};

/// Per-call timeout; distinct from any caller-side deadline. A timeout is
/// treated as an ordinary provider error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client against a Lago-compatible billing API.
#[derive(Clone)]
pub struct LagoClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl LagoClient {
    /// Creates a client for the given API base URL and key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Maps a provider response to the taxonomy: 404 becomes
    /// [`ProviderError::NotFound`], any other failure a generic request
    /// error. The raw body is logged here and never returned.
    async fn check(resp: Response, what: &str) -> Result<Response> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(what, status = status.as_u16(), body, "provider request failed");
            return Err(ProviderError::Request {
                status: status.as_u16(),
                context: what.to_string(),
            });
        }
        Ok(resp)
    }

    async fn wallet_transaction(
        &self,
        wallet_id: &WalletId,
        field: &str,
        credits: u32,
    ) -> Result<()> {
        // The provider distinguishes granted/voided/paid credits only by
        // which field the transaction body carries.
        let mut transaction = serde_json::Map::new();
        transaction.insert(
            "wallet_id".to_string(),
            serde_json::Value::String(wallet_id.as_str().to_string()),
        );
        transaction.insert(
            field.to_string(),
            serde_json::Value::String(credits.to_string()),
        );
        let body = serde_json::json!({ "wallet_transaction": transaction });
        let resp = self
            .http
            .post(self.url("wallet_transactions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        Self::check(resp, "wallet transaction").await?;
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for LagoClient {
    async fn create_wallet(&self, account_id: AccountId) -> Result<WalletId> {
        let body = serde_json::json!({
            "wallet": {
                "external_customer_id": account_id.to_string(),
                "name": "Prepaid",
                "rate_amount": "1",
                "currency": "USD",
            }
        });
        let resp = self
            .http
            .post(self.url("wallets"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let envelope: WalletEnvelope = Self::check(resp, "wallet").await?.json().await?;
        Ok(WalletId::new(envelope.wallet.lago_id))
    }

    async fn terminate_wallet(&self, wallet_id: &WalletId) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("wallets/{}", wallet_id.as_str())))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(resp, "wallet").await?;
        Ok(())
    }

    async fn wallet_balance(&self, wallet_id: &WalletId) -> Result<f64> {
        let resp = self
            .http
            .get(self.url(&format!("wallets/{}", wallet_id.as_str())))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: WalletEnvelope = Self::check(resp, "wallet").await?.json().await?;
        Ok(envelope.wallet.credits_balance.unwrap_or(0.0))
    }

    async fn grant_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<()> {
        self.wallet_transaction(wallet_id, "granted_credits", credits)
            .await
    }

    async fn void_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<()> {
        self.wallet_transaction(wallet_id, "voided_credits", credits)
            .await
    }

    async fn pay_credits(&self, wallet_id: &WalletId, credits: u32) -> Result<()> {
        self.wallet_transaction(wallet_id, "paid_credits", credits)
            .await
    }

    async fn create_customer(&self, account_id: AccountId) -> Result<CustomerId> {
        let body = serde_json::json!({
            "customer": { "external_id": account_id.to_string() }
        });
        let resp = self
            .http
            .post(self.url("customers"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let envelope: CustomerEnvelope = Self::check(resp, "customer").await?.json().await?;
        Ok(CustomerId::new(envelope.customer.lago_id))
    }

    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("customers/{}", customer_id.as_str())))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(resp, "customer").await?;
        Ok(())
    }

    async fn create_subscription(
        &self,
        account_id: AccountId,
        plan_code: &str,
        ending_at: DateTime<Utc>,
    ) -> Result<Subscription> {
        let body = serde_json::json!({
            "subscription": {
                "external_customer_id": account_id.to_string(),
                "plan_code": plan_code,
                "external_id": format!("{plan_code}-{account_id}"),
                "billing_time": "calendar",
                "ending_at": ending_at.to_rfc3339(),
            }
        });
        let resp = self
            .http
            .post(self.url("subscriptions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let envelope: SubscriptionEnvelope = Self::check(resp, "plan").await?.json().await?;
        Ok(envelope.subscription)
    }

    async fn find_subscription(&self, account_id: AccountId) -> Result<Subscription> {
        let resp = self
            .http
            .get(self.url(&format!("subscriptions/{account_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: SubscriptionEnvelope =
            Self::check(resp, "subscription").await?.json().await?;
        Ok(envelope.subscription)
    }

    async fn list_subscriptions(
        &self,
        page: u32,
        per_page: u32,
        statuses: &[SubscriptionStatus],
    ) -> Result<Vec<Subscription>> {
        let mut query: Vec<(String, String)> = vec![
            ("page".to_string(), page.to_string()),
            ("per_page".to_string(), per_page.to_string()),
        ];
        for status in statuses {
            query.push(("status[]".to_string(), status.as_str().to_string()));
        }
        let resp = self
            .http
            .get(self.url("subscriptions"))
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;
        let envelope: SubscriptionListEnvelope =
            Self::check(resp, "subscriptions").await?.json().await?;
        Ok(envelope.subscriptions)
    }

    async fn terminate_subscription(&self, external_id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("subscriptions/{external_id}")))
            .bearer_auth(&self.api_key)
            .query(&[("on_termination_invoice", "generate")])
            .send()
            .await?;
        Self::check(resp, "subscription").await?;
        Ok(())
    }

    async fn has_active_subscription(&self, account_id: AccountId) -> Result<bool> {
        let resp = self
            .http
            .get(self.url("subscriptions"))
            .bearer_auth(&self.api_key)
            .query(&[
                ("external_customer_id", account_id.to_string().as_str()),
                ("status[]", "active"),
            ])
            .send()
            .await?;
        match Self::check(resp, "subscriptions").await {
            Ok(resp) => {
                let envelope: SubscriptionListEnvelope = resp.json().await?;
                Ok(!envelope.subscriptions.is_empty())
            }
            Err(ProviderError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn find_coupon(&self, code: &str) -> Result<Coupon> {
        let resp = self
            .http
            .get(self.url(&format!("coupons/{code}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: CouponEnvelope = Self::check(resp, "coupon").await?.json().await?;
        Ok(envelope.coupon.into())
    }

    async fn list_coupons(&self, page: u32, per_page: u32) -> Result<Vec<Coupon>> {
        let resp = self
            .http
            .get(self.url("coupons"))
            .bearer_auth(&self.api_key)
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;
        let envelope: CouponListEnvelope = Self::check(resp, "coupons").await?.json().await?;
        Ok(envelope.coupons.into_iter().map(Coupon::from).collect())
    }

    async fn terminate_coupon(&self, code: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("coupons/{code}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(resp, "coupon").await?;
        Ok(())
    }

    async fn find_plan(&self, code: &str) -> Result<Plan> {
        let resp = self
            .http
            .get(self.url(&format!("plans/{code}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: PlanEnvelope = Self::check(resp, "plan").await?.json().await?;
        Ok(envelope.plan)
    }

    async fn list_plans(&self, page: u32, per_page: u32) -> Result<Vec<Plan>> {
        let resp = self
            .http
            .get(self.url("plans"))
            .bearer_auth(&self.api_key)
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;
        let envelope: PlanListEnvelope = Self::check(resp, "plans").await?.json().await?;
        Ok(envelope.plans)
    }

    async fn create_add_on_invoice(
        &self,
        account_id: AccountId,
        add_on_code: &str,
        display_name: &str,
    ) -> Result<String> {
        let body = serde_json::json!({
            "invoice": {
                "external_customer_id": account_id.to_string(),
                "fees": [{
                    "add_on_code": add_on_code,
                    "invoice_display_name": display_name,
                }],
            }
        });
        let resp = self
            .http
            .post(self.url("invoices"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let envelope: InvoiceEnvelope = Self::check(resp, "add-on").await?.json().await?;
        Ok(envelope.invoice.lago_id)
    }
}

// -- Wire types --

#[derive(Deserialize)]
struct WalletEnvelope {
    wallet: WalletData,
}

#[derive(Deserialize)]
struct WalletData {
    lago_id: String,
    #[serde(default, deserialize_with = "de_opt_f64")]
    credits_balance: Option<f64>,
}

#[derive(Deserialize)]
struct CustomerEnvelope {
    customer: CustomerData,
}

#[derive(Deserialize)]
struct CustomerData {
    lago_id: String,
}

#[derive(Deserialize)]
struct SubscriptionEnvelope {
    subscription: Subscription,
}

#[derive(Deserialize)]
struct SubscriptionListEnvelope {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

#[derive(Deserialize)]
struct CouponEnvelope {
    coupon: CouponData,
}

#[derive(Deserialize)]
struct CouponListEnvelope {
    #[serde(default)]
    coupons: Vec<CouponData>,
}

/// Coupon as the provider serializes it; `percentage_rate` arrives as a
/// decimal string.
#[derive(Deserialize)]
struct CouponData {
    code: String,
    name: Option<String>,
    coupon_type: CouponType,
    amount_cents: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    percentage_rate: Option<f64>,
    expiration: Option<ExpirationPolicy>,
    expiration_at: Option<DateTime<Utc>>,
    terminated_at: Option<DateTime<Utc>>,
}

impl From<CouponData> for Coupon {
    fn from(data: CouponData) -> Self {
        Coupon {
            code: data.code,
            name: data.name,
            coupon_type: data.coupon_type,
            amount_cents: data.amount_cents,
            percentage_rate: data.percentage_rate,
            expiration: data.expiration.unwrap_or(ExpirationPolicy::NoExpiration),
            expiration_at: data.expiration_at,
            terminated_at: data.terminated_at,
        }
    }
}

#[derive(Deserialize)]
struct PlanEnvelope {
    plan: Plan,
}

#[derive(Deserialize)]
struct PlanListEnvelope {
    #[serde(default)]
    plans: Vec<Plan>,
}

#[derive(Deserialize)]
struct InvoiceEnvelope {
    invoice: InvoiceData,
}

#[derive(Deserialize)]
struct InvoiceData {
    lago_id: String,
}

/// Accepts a number or a decimal string for numeric fields the provider
/// serializes inconsistently.
fn de_opt_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_wire_format_parses_string_rate() {
        let json = r#"{
            "coupon": {
                "code": "OFF25",
                "name": "25% off",
                "coupon_type": "percentage",
                "amount_cents": null,
                "percentage_rate": "25.0",
                "expiration": "time_limit",
                "expiration_at": "2030-01-01T00:00:00Z",
                "terminated_at": null
            }
        }"#;

        let envelope: CouponEnvelope = serde_json::from_str(json).unwrap();
        let coupon: Coupon = envelope.coupon.into();
        assert_eq!(coupon.coupon_type, CouponType::Percentage);
        assert_eq!(coupon.percentage_rate, Some(25.0));
        assert_eq!(coupon.expiration, ExpirationPolicy::TimeLimit);
    }

    #[test]
    fn wallet_wire_format_parses_numeric_balance() {
        let json = r#"{"wallet": {"lago_id": "wal_1", "credits_balance": 12.5}}"#;
        let envelope: WalletEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.wallet.credits_balance, Some(12.5));

        let json = r#"{"wallet": {"lago_id": "wal_1", "credits_balance": "3"}}"#;
        let envelope: WalletEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.wallet.credits_balance, Some(3.0));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = LagoClient::new("http://lago.local/", "key").unwrap();
        assert_eq!(client.url("wallets"), "http://lago.local/api/v1/wallets");
    }
}
