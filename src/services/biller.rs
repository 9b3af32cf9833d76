use crate::{
    error::PaystrataError,
    models::{network_code, AirtimeRequest, CableRequest, DataRequest, UtilityRequest},
};
use serde_json::Value;
use std::time::Duration;

/// Client for the third-party bill payment API.
///
/// Every call is a GET carrying the account credentials plus the
/// operation's parameters; the JSON reply is handed back unchanged.
#[derive(Clone)]
pub struct BillerClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
    api_key: String,
}

impl BillerClient {
    pub fn new(base_url: &str, user_id: String, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
            api_key,
        })
    }

    pub async fn buy_airtime(&self, request: &AirtimeRequest) -> Result<Value, PaystrataError> {
        let amount = request.amount.to_string();
        self.call(
            "APIAirtimeV1.asp",
            &[
                ("MobileNetwork", network_code(&request.network_code)),
                ("MobileNumber", request.phone_number.as_str()),
                ("Amount", amount.as_str()),
            ],
        )
        .await
    }

    pub async fn buy_data(&self, request: &DataRequest) -> Result<Value, PaystrataError> {
        self.call(
            "APIDatabundleV1.asp",
            &[
                ("MobileNetwork", network_code(&request.network_code)),
                ("DataPlan", request.data_plan.as_str()),
                ("MobileNumber", request.phone_number.as_str()),
            ],
        )
        .await
    }

    pub async fn pay_cable(&self, request: &CableRequest) -> Result<Value, PaystrataError> {
        self.call(
            "APICableTVV1.asp",
            &[
                ("CableTV", request.cable_tv.as_str()),
                ("Package", request.package.as_str()),
                ("SmartCardNo", request.smart_card_no.as_str()),
                ("PhoneNo", request.phone_no.as_str()),
            ],
        )
        .await
    }

    pub async fn pay_utility(&self, request: &UtilityRequest) -> Result<Value, PaystrataError> {
        let amount = request.amount.to_string();
        self.call(
            "APIElectricityV1.asp",
            &[
                ("ElectricCompany", request.electric_company_code.as_str()),
                ("MeterType", request.meter_type.as_str()),
                ("MeterNo", request.meter_no.as_str()),
                ("Amount", amount.as_str()),
                ("PhoneNo", request.phone_no.as_str()),
            ],
        )
        .await
    }

    /// Products sold by one electricity company.
    pub async fn utility_plans(&self, provider_code: &str) -> Result<Value, PaystrataError> {
        let response = self
            .client
            .get(format!("{}/APIElectricityDiscosV1.asp", self.base_url))
            .query(&[("UserID", self.user_id.as_str())])
            .send()
            .await
            .map_err(|e| PaystrataError::Upstream(e.to_string()))?;
        let data = Self::decode(response).await?;

        let providers = data
            .get("ELECTRIC_COMPANY")
            .filter(|v| !v.is_null())
            .ok_or_else(|| PaystrataError::NotFound("No electricity providers found".to_string()))?;

        providers
            .get(provider_code)
            .and_then(|entries| entries.get(0))
            .and_then(|provider| provider.get("PRODUCT"))
            .cloned()
            .ok_or_else(|| PaystrataError::NotFound("Provider not found".to_string()))
    }

    async fn call(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, PaystrataError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        tracing::debug!(endpoint = endpoint, "Calling biller");

        let response = self
            .client
            .get(&url)
            .query(&[("UserID", self.user_id.as_str()), ("APIKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| PaystrataError::Upstream(e.to_string()))?;

        let data = Self::decode(response).await?;
        tracing::info!(endpoint = endpoint, "Biller request completed");
        Ok(data)
    }

    async fn decode(response: reqwest::Response) -> Result<Value, PaystrataError> {
        let status = response.status();
        if !status.is_success() {
            return Err(PaystrataError::Upstream(format!(
                "Biller responded with status {}",
                status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| PaystrataError::Upstream(format!("Invalid biller response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal::Decimal;

    fn client(url: &str) -> BillerClient {
        BillerClient::new(url, "CK100".to_string(), "secret".to_string()).unwrap()
    }

    #[tokio::test]
    async fn airtime_remaps_network_and_sends_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/APIAirtimeV1.asp")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("UserID".into(), "CK100".into()),
                Matcher::UrlEncoded("APIKey".into(), "secret".into()),
                Matcher::UrlEncoded("MobileNetwork".into(), "04".into()),
                Matcher::UrlEncoded("MobileNumber".into(), "08020000000".into()),
                Matcher::UrlEncoded("Amount".into(), "500".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderid":"7890","status":"ORDER_RECEIVED"}"#)
            .create_async()
            .await;

        let data = client(&server.url())
            .buy_airtime(&AirtimeRequest {
                network_code: "Airtel".to_string(),
                phone_number: "08020000000".to_string(),
                amount: Decimal::new(500, 0),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(data["status"], "ORDER_RECEIVED");
    }

    #[tokio::test]
    async fn biller_error_status_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/APICableTVV1.asp")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = client(&server.url())
            .pay_cable(&CableRequest {
                cable_tv: "dstv".to_string(),
                package: "dstv-padi".to_string(),
                smart_card_no: "7027914329".to_string(),
                phone_no: "08030000000".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaystrataError::Upstream(_)));
    }

    #[tokio::test]
    async fn utility_plans_selects_the_provider_products() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/APIElectricityDiscosV1.asp")
            .match_query(Matcher::UrlEncoded("UserID".into(), "CK100".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"ELECTRIC_COMPANY":{"01":[{"PRODUCT":[{"PRODUCT_ID":"01","PRODUCT_TYPE":"prepaid"}]}]}}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let biller = client(&server.url());
        let plans = biller.utility_plans("01").await.unwrap();
        assert_eq!(plans[0]["PRODUCT_TYPE"], "prepaid");

        let err = biller.utility_plans("99").await.unwrap_err();
        assert!(matches!(err, PaystrataError::NotFound(msg) if msg == "Provider not found"));
    }

    #[tokio::test]
    async fn utility_plans_without_providers_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/APIElectricityDiscosV1.asp")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let err = client(&server.url()).utility_plans("01").await.unwrap_err();
        assert!(
            matches!(err, PaystrataError::NotFound(msg) if msg == "No electricity providers found")
        );
    }
}
