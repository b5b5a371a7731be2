use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pinledger_accounting::{Account, AccountStatus, LedgerEntry, ResetGrant};
use pinledger_core::{AccountId, AccountNumber, Money, TransactionId};
use pinledger_infra::ledger_service::{
    BalanceInquiry, CashMovement, CashReceipt, ChangePin, CheckBalance, CreateAccount,
    HistoryResult, PinChanged, PinReset, RenameAccount, ResetPin, Transfer, TransactionHistory,
    TransferReceipt,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub account_name: String,
    pub pin: String,
    #[serde(default)]
    pub initial_deposit: Decimal,
}

impl From<CreateAccountRequest> for CreateAccount {
    fn from(body: CreateAccountRequest) -> Self {
        Self {
            account_name: body.account_name,
            pin: body.pin,
            initial_deposit: body.initial_deposit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountIdRequest {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub id: i64,
    pub account_name: String,
}

impl From<UpdateAccountRequest> for RenameAccount {
    fn from(body: UpdateAccountRequest) -> Self {
        Self {
            id: body.id,
            account_name: body.account_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckBalanceRequest {
    pub account_number: String,
    pub pin: String,
}

impl From<CheckBalanceRequest> for CheckBalance {
    fn from(body: CheckBalanceRequest) -> Self {
        Self {
            account_number: body.account_number,
            pin: body.pin,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePinRequest {
    pub account_number: String,
    pub old_pin: String,
    pub new_pin: String,
}

impl From<ChangePinRequest> for ChangePin {
    fn from(body: ChangePinRequest) -> Self {
        Self {
            account_number: body.account_number,
            old_pin: body.old_pin,
            new_pin: body.new_pin,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPinRequest {
    pub account_number: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPinRequest {
    pub reset_token: String,
    pub new_pin: String,
    pub confirm_new_pin: String,
}

impl From<ResetPinRequest> for ResetPin {
    fn from(body: ResetPinRequest) -> Self {
        Self {
            reset_token: body.reset_token,
            new_pin: body.new_pin,
            confirm_new_pin: body.confirm_new_pin,
        }
    }
}

/// Deposit and withdrawal body.
#[derive(Debug, Deserialize)]
pub struct CashRequest {
    pub account_number: String,
    pub amount: Decimal,
    pub pin: String,
}

impl From<CashRequest> for CashMovement {
    fn from(body: CashRequest) -> Self {
        Self {
            account_number: body.account_number,
            amount: body.amount,
            pin: body.pin,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account_number: String,
    pub to_account_number: String,
    pub amount: Decimal,
    pub pin: String,
}

impl From<TransferRequest> for Transfer {
    fn from(body: TransferRequest) -> Self {
        Self {
            from_account_number: body.from_account_number,
            to_account_number: body.to_account_number,
            amount: body.amount,
            pin: body.pin,
        }
    }
}

/// Every field is optional; an empty body lists all transactions.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryRequest {
    pub account_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl From<HistoryRequest> for TransactionHistory {
    fn from(body: HistoryRequest) -> Self {
        Self {
            account_number: body.account_number,
            start_date: body.start_date,
            end_date: body.end_date,
            limit: body.limit,
            page: body.page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionDetailRequest {
    pub transaction_id: i64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance: Money,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_number: account.account_number,
            account_name: account.account_name,
            balance: account.balance,
            status: account.status,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountDetailResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountDetailResponse {
    fn from(account: Account) -> Self {
        let updated_at = account.updated_at;
        Self {
            account: account.into(),
            updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedAccountResponse {
    pub deleted_account_id: AccountId,
    pub account_number: AccountNumber,
    pub account_name: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance: Money,
}

impl From<BalanceInquiry> for BalanceResponse {
    fn from(inquiry: BalanceInquiry) -> Self {
        Self {
            account_number: inquiry.account_number,
            account_name: inquiry.account_name,
            balance: inquiry.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PinChangedResponse {
    pub account_number: AccountNumber,
    pub changed_at: DateTime<Utc>,
}

impl From<PinChanged> for PinChangedResponse {
    fn from(changed: PinChanged) -> Self {
        Self {
            account_number: changed.account_number,
            changed_at: changed.changed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForgotPinResponse {
    pub account_number: AccountNumber,
    pub reset_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<ResetGrant> for ForgotPinResponse {
    fn from(grant: ResetGrant) -> Self {
        Self {
            account_number: grant.account_number,
            reset_token: grant.reset_token.as_str().to_string(),
            expires_at: grant.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PinResetResponse {
    pub account_number: AccountNumber,
    pub reset_at: DateTime<Utc>,
}

impl From<PinReset> for PinResetResponse {
    fn from(reset: PinReset) -> Self {
        Self {
            account_number: reset.account_number,
            reset_at: reset.reset_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CashResponse {
    pub account_number: AccountNumber,
    pub account_name: String,
    pub balance_before: Money,
    pub amount: Money,
    pub balance_after: Money,
    pub transaction_date: DateTime<Utc>,
}

impl From<CashReceipt> for CashResponse {
    fn from(receipt: CashReceipt) -> Self {
        Self {
            account_number: receipt.account_number,
            account_name: receipt.account_name,
            balance_before: receipt.balance_before,
            amount: receipt.amount,
            balance_after: receipt.balance_after,
            transaction_date: receipt.transaction_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub from_account_number: AccountNumber,
    pub to_account_number: AccountNumber,
    pub amount: Money,
    pub from_balance_before: Money,
    pub from_balance_after: Money,
    pub to_balance_before: Money,
    pub to_balance_after: Money,
    pub transaction_date: DateTime<Utc>,
}

impl From<TransferReceipt> for TransferResponse {
    fn from(receipt: TransferReceipt) -> Self {
        Self {
            from_account_number: receipt.from_account_number,
            to_account_number: receipt.to_account_number,
            amount: receipt.amount,
            from_balance_before: receipt.from_balance_before,
            from_balance_after: receipt.from_balance_after,
            to_balance_before: receipt.to_balance_before,
            to_balance_after: receipt.to_balance_after,
            transaction_date: receipt.transaction_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub account_number: AccountNumber,
    pub account_name: String,
    pub source_number: AccountNumber,
    pub beneficiary_number: AccountNumber,
    pub transaction_type: &'static str,
    pub transaction_type_desc: &'static str,
    pub amount: Money,
    pub description: String,
    pub transaction_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for TransactionResponse {
    fn from(entry: LedgerEntry) -> Self {
        let description = entry.description();
        Self {
            id: entry.id,
            account_number: entry.account_number,
            account_name: entry.account_name,
            source_number: entry.source_number,
            beneficiary_number: entry.beneficiary_number,
            transaction_type: entry.transaction_type.code(),
            transaction_type_desc: entry.transaction_type.description(),
            amount: entry.amount,
            description,
            transaction_time: entry.transaction_time,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total_records: u64,
    pub total_pages: u64,
}

/// Paged history carries `pagination`; unpaged history carries `total_records`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    Paged {
        transactions: Vec<TransactionResponse>,
        pagination: PaginationMeta,
    },
    All {
        transactions: Vec<TransactionResponse>,
        total_records: u64,
    },
}

impl From<HistoryResult> for HistoryResponse {
    fn from(result: HistoryResult) -> Self {
        let transactions = result.entries.into_iter().map(Into::into).collect();
        match result.pagination {
            Some(page) => HistoryResponse::Paged {
                transactions,
                pagination: PaginationMeta {
                    current_page: page.current_page,
                    per_page: page.per_page,
                    total_records: result.total_records,
                    total_pages: page.total_pages,
                },
            },
            None => HistoryResponse::All {
                transactions,
                total_records: result.total_records,
            },
        }
    }
}
