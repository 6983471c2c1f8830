use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use catraca_domain::payment::PaymentMethod;

use crate::domain::repository::PaymentGateway;
use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
struct TransactionStatus {
    status: String,
}

/// Status lookups against the payment gateway's REST API:
/// `GET {base_url}/{card|pix|boleto}/transactions/{transaction_id}`.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    fn transaction_url(&self, transaction_id: &str, method: &PaymentMethod) -> String {
        format!(
            "{}/{}/transactions/{}",
            self.base_url,
            method.gateway_segment(),
            transaction_id
        )
    }
}

fn classify_status(status: StatusCode) -> GatewayError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::Transient(format!("gateway responded {status}"))
    } else {
        GatewayError::Fatal(format!("gateway responded {status}"))
    }
}

impl PaymentGateway for HttpPaymentGateway {
    async fn fetch_status(
        &self,
        transaction_id: &str,
        method: &PaymentMethod,
    ) -> Result<String, GatewayError> {
        let resp = self
            .client
            .get(self.transaction_url(transaction_id, method))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body: TransactionStatus = resp
            .json()
            .await
            .map_err(|e| GatewayError::Fatal(format!("decode gateway response: {e}")))?;
        Ok(body.status)
    }
}
