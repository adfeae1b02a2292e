use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{
    CheckoutSession, CheckoutSessionRequest, HostedSession, PaymentError, PaymentGateway,
    SessionLineItem,
};
use crate::config::StripeConfig;

pub struct StripeGateway {
    client: Client,
    secret_key: String,
    api_base: String,
}

#[derive(Deserialize)]
struct SessionCreated {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct LineItemPage {
    data: Vec<SessionLineItem>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// Flatten a session request into the provider's bracketed form encoding.
pub fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
        ("client_reference_id".into(), request.order_id.clone()),
        ("locale".into(), request.locale.clone()),
        ("phone_number_collection[enabled]".into(), "true".into()),
    ];

    for (i, country) in request.shipping_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.to_uppercase(),
        ));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(description) = &item.description {
            form.push((
                format!("{prefix}[price_data][product_data][description]"),
                description.clone(),
            ));
        }
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<HostedSession, PaymentError> {
        let response = self
            .client
            .post(self.url("checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&session_form(request))
            .send()
            .await?;
        let created: SessionCreated = Self::decode(response).await?;
        let url = created.url.ok_or(PaymentError::MissingField("url"))?;
        Ok(HostedSession {
            id: created.id,
            url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .get(self.url(&format!("checkout/sessions/{session_id}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn list_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionLineItem>, PaymentError> {
        let response = self
            .client
            .get(self.url(&format!("checkout/sessions/{session_id}/line_items")))
            .query(&[("limit", "100")])
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let page: LineItemPage = Self::decode(response).await?;
        Ok(page.data)
    }
}
