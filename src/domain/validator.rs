use crate::config::MerchantConfig;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Shortest message accepted as a complete confirmation SMS. Genuine
/// confirmations run well past this; truncated pastes do not.
pub const MIN_MESSAGE_LEN: usize = 100;

static TX_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z0-9]{8,11})\b").expect("valid regex"));
static CONFIRMED_AFTER_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]{8,11}\s+CONFIRMED").expect("valid regex"));
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"KSH\s?([0-9,]+(?:\.[0-9]+)?)").expect("valid regex"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{1,2}/[0-9]{1,2}/[0-9]{2,4}\b").expect("valid regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{1,2}:[0-9]{2}(\s?(AM|PM))?\b").expect("valid regex"));

/// A confirmation message that failed one of the structural checks. Each
/// variant names the first rule violated so the caller can tell the user
/// exactly what to fix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("no M-Pesa transaction code found; paste the full confirmation SMS")]
    MissingTransactionCode,
    #[error("message is not an M-Pesa payment confirmation")]
    MissingConfirmationKeyword,
    #[error("payment was not made to till {expected_till} ({expected_name})")]
    WrongRecipient {
        expected_till: String,
        expected_name: String,
    },
    #[error("message is not a payment to a merchant")]
    NotMerchantPayment,
    #[error("could not read the paid amount from the message")]
    MissingAmount,
    #[error("paid amount Ksh {paid} is less than the required Ksh {required}")]
    AmountTooLow { paid: Decimal, required: Decimal },
    #[error("no transaction date found in the message")]
    MissingDate,
    #[error("no transaction time found in the message")]
    MissingTime,
    #[error("message is too short to be a full confirmation SMS")]
    TooShort,
}

/// The fields extracted from a valid confirmation message.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfirmation {
    /// The provider-assigned transaction code; used exactly once, globally.
    pub transaction_code: String,
    pub paid_amount: Decimal,
}

/// Checks a pasted confirmation SMS against the structural markers a genuine
/// confirmation always carries, and extracts the transaction code and paid
/// amount.
///
/// This is an anti-fraud heuristic, not a protocol parser: it accepts
/// anything that looks like a real confirmation and rejects anything missing
/// a marker. Checks run in a fixed order and stop at the first failure.
pub fn validate_confirmation(
    raw_message: &str,
    expected_amount: Decimal,
    merchant: &MerchantConfig,
) -> Result<ParsedConfirmation, ValidationError> {
    let msg = raw_message.trim().to_uppercase();

    let transaction_code = TX_CODE_RE
        .captures(&msg)
        .map(|caps| caps[1].to_string())
        .ok_or(ValidationError::MissingTransactionCode)?;

    if !CONFIRMED_AFTER_CODE_RE.is_match(&msg) {
        return Err(ValidationError::MissingConfirmationKeyword);
    }

    // Both the till number and the registered business name must appear;
    // either alone is too easy to fake in a doctored message.
    let name = merchant.business_name.to_uppercase();
    if !msg.contains(&merchant.till_number) || !msg.contains(&name) {
        return Err(ValidationError::WrongRecipient {
            expected_till: merchant.till_number.clone(),
            expected_name: merchant.business_name.clone(),
        });
    }

    // "paid to" is a buy-goods payment; "sent to ... for account" a paybill
    // one. A bare "sent to" is a peer transfer and proves nothing.
    let is_merchant_payment =
        msg.contains("PAID TO") || (msg.contains("SENT TO") && msg.contains("FOR ACCOUNT"));
    if !is_merchant_payment {
        return Err(ValidationError::NotMerchantPayment);
    }

    let amount_str = AMOUNT_RE
        .captures(&msg)
        .map(|caps| caps[1].replace(',', ""))
        .ok_or(ValidationError::MissingAmount)?;
    let paid_amount =
        Decimal::from_str(&amount_str).map_err(|_| ValidationError::MissingAmount)?;
    if paid_amount < expected_amount {
        return Err(ValidationError::AmountTooLow {
            paid: paid_amount,
            required: expected_amount,
        });
    }

    if !DATE_RE.is_match(&msg) {
        return Err(ValidationError::MissingDate);
    }
    if !TIME_RE.is_match(&msg) {
        return Err(ValidationError::MissingTime);
    }

    if msg.len() < MIN_MESSAGE_LEN {
        return Err(ValidationError::TooShort);
    }

    Ok(ParsedConfirmation {
        transaction_code,
        paid_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const GOOD_MESSAGE: &str = "QGH7X8P2RT Confirmed. Ksh200.00 paid to ECERTIFY INC 3106479 \
         on 2/8/26 at 10:30 AM. New M-PESA balance is Ksh15.00.";

    fn merchant() -> MerchantConfig {
        MerchantConfig::default()
    }

    #[test]
    fn test_good_message_parses() {
        let parsed = validate_confirmation(GOOD_MESSAGE, dec!(200), &merchant()).unwrap();
        assert_eq!(parsed.transaction_code, "QGH7X8P2RT");
        assert_eq!(parsed.paid_amount, dec!(200.00));
    }

    #[test]
    fn test_case_insensitive() {
        let lower = GOOD_MESSAGE.to_lowercase();
        let parsed = validate_confirmation(&lower, dec!(200), &merchant()).unwrap();
        assert_eq!(parsed.transaction_code, "QGH7X8P2RT");
    }

    #[test]
    fn test_missing_transaction_code() {
        // Starts with a digit, so there is no leading code token
        let msg = GOOD_MESSAGE.replace("QGH7X8P2RT", "7GH7X8P2RT");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::MissingTransactionCode)
        );
    }

    #[test]
    fn test_code_too_short_rejected() {
        // 6 characters total, below the 9-character minimum
        let msg = GOOD_MESSAGE.replace("QGH7X8P2RT", "QGH7X8");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::MissingTransactionCode)
        );
    }

    #[test]
    fn test_code_too_long_rejected() {
        // 14 characters, above the 12-character maximum
        let msg = GOOD_MESSAGE.replace("QGH7X8P2RT", "QGH7X8P2RTXYZA");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::MissingTransactionCode)
        );
    }

    #[test]
    fn test_keyword_must_follow_code() {
        let msg = GOOD_MESSAGE.replace("Confirmed.", "Completed.");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::MissingConfirmationKeyword)
        );
    }

    #[test]
    fn test_till_number_alone_is_not_enough() {
        let msg = GOOD_MESSAGE.replace("ECERTIFY INC", "SOME SHOP");
        assert!(matches!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::WrongRecipient { .. })
        ));
    }

    #[test]
    fn test_business_name_alone_is_not_enough() {
        let msg = GOOD_MESSAGE.replace("3106479", "1234567");
        assert!(matches!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::WrongRecipient { .. })
        ));
    }

    #[test]
    fn test_peer_transfer_rejected() {
        let msg = GOOD_MESSAGE.replace("paid to", "sent to");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::NotMerchantPayment)
        );
    }

    #[test]
    fn test_paybill_with_account_accepted() {
        let msg = GOOD_MESSAGE.replace("paid to", "sent to") + " for account PINECOIN.";
        let parsed = validate_confirmation(&msg, dec!(200), &merchant()).unwrap();
        assert_eq!(parsed.transaction_code, "QGH7X8P2RT");
    }

    #[test]
    fn test_underpayment_rejected_citing_amount() {
        let msg = GOOD_MESSAGE.replace("Ksh200.00 paid", "Ksh150.00 paid");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::AmountTooLow {
                paid: dec!(150.00),
                required: dec!(200),
            })
        );
    }

    #[test]
    fn test_overpayment_accepted() {
        let msg = GOOD_MESSAGE.replace("Ksh200.00 paid", "Ksh250.00 paid");
        let parsed = validate_confirmation(&msg, dec!(200), &merchant()).unwrap();
        assert_eq!(parsed.paid_amount, dec!(250.00));
    }

    #[test]
    fn test_amount_with_thousands_separator() {
        let msg = GOOD_MESSAGE.replace("Ksh200.00 paid", "Ksh1,200.00 paid");
        let parsed = validate_confirmation(&msg, dec!(1200), &merchant()).unwrap();
        assert_eq!(parsed.paid_amount, dec!(1200.00));
    }

    #[test]
    fn test_missing_amount() {
        let msg = GOOD_MESSAGE
            .replace("Ksh200.00 paid", "paid")
            .replace("Ksh15.00", "nil");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::MissingAmount)
        );
    }

    #[test]
    fn test_missing_date_rejected_citing_date() {
        let msg = GOOD_MESSAGE.replace("on 2/8/26 ", "");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::MissingDate)
        );
    }

    #[test]
    fn test_missing_time_rejected_citing_time() {
        let msg = GOOD_MESSAGE.replace("at 10:30 AM. New M-PESA balance", "New M-PESA balance");
        assert_eq!(
            validate_confirmation(&msg, dec!(200), &merchant()),
            Err(ValidationError::MissingTime)
        );
    }

    #[test]
    fn test_truncated_message_rejected() {
        // Every marker survives the truncation; only the tail is missing
        let truncated = "QGH7X8P2RT Confirmed. Ksh200.00 paid to ECERTIFY INC 3106479 \
             on 2/8/26 at 10:30 AM.";
        assert!(truncated.len() < MIN_MESSAGE_LEN);
        assert_eq!(
            validate_confirmation(truncated, dec!(200), &merchant()),
            Err(ValidationError::TooShort)
        );
    }
}
