use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PaystrataError;

/// Maps the network names used by the payment form to the biller's codes.
/// Unknown networks fall back to MTN.
pub fn network_code(network: &str) -> &'static str {
    match network {
        "MTN" => "01",
        "Glo" => "02",
        "m_9mobile" => "03",
        "Airtel" => "04",
        _ => "01",
    }
}

fn require(field: &str, value: &str) -> Result<(), PaystrataError> {
    if value.trim().is_empty() {
        return Err(PaystrataError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_positive(field: &str, value: Decimal) -> Result<(), PaystrataError> {
    if value <= Decimal::ZERO {
        return Err(PaystrataError::Validation(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtimeRequest {
    pub network_code: String,
    pub phone_number: String,
    pub amount: Decimal,
}

impl AirtimeRequest {
    pub fn validate(&self) -> Result<(), PaystrataError> {
        require("phoneNumber", &self.phone_number)?;
        require_positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequest {
    pub network_code: String,
    pub data_plan: String,
    pub phone_number: String,
}

impl DataRequest {
    pub fn validate(&self) -> Result<(), PaystrataError> {
        require("dataPlan", &self.data_plan)?;
        require("phoneNumber", &self.phone_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableRequest {
    pub cable_tv: String,
    pub package: String,
    pub smart_card_no: String,
    pub phone_no: String,
}

impl CableRequest {
    pub fn validate(&self) -> Result<(), PaystrataError> {
        require("cableTv", &self.cable_tv)?;
        require("package", &self.package)?;
        require("smartCardNo", &self.smart_card_no)?;
        require("phoneNo", &self.phone_no)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilityRequest {
    pub electric_company_code: String,
    pub meter_type: String,
    pub meter_no: String,
    pub amount: Decimal,
    pub phone_no: String,
}

impl UtilityRequest {
    pub fn validate(&self) -> Result<(), PaystrataError> {
        require("electric_company_code", &self.electric_company_code)?;
        require("meter_type", &self.meter_type)?;
        require("meter_no", &self.meter_no)?;
        require("phone_no", &self.phone_no)?;
        require_positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityPlansRequest {
    pub provider_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_networks_and_defaults_to_mtn() {
        assert_eq!(network_code("MTN"), "01");
        assert_eq!(network_code("Glo"), "02");
        assert_eq!(network_code("m_9mobile"), "03");
        assert_eq!(network_code("Airtel"), "04");
        assert_eq!(network_code("Unknown"), "01");
    }

    #[test]
    fn airtime_request_rejects_zero_amount() {
        let request: AirtimeRequest = serde_json::from_str(
            r#"{"networkCode":"MTN","phoneNumber":"08030000000","amount":0}"#,
        )
        .unwrap();
        assert!(matches!(
            request.validate(),
            Err(PaystrataError::Validation(_))
        ));
    }
}
