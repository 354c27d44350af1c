use crate::error::{Result, SublineError};
use crate::models::MappedRecord;

// ---------------------------------------------------------------------------
// Target fields — the fixed schema a mapping may point at
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    ClientOwnerName,
    ClientName,
    ClientContactPerson,
    ClientEmail,
    ClientPhone,
    ClientAddress,
    ClientCity,
    ClientZip,
    AccountNumber,
    AccountType,
    AccountStatus,
    SubscriberPhone,
    SubscriberPlan,
    SubscriberMonthlyValue,
    SubscriberRemainingPayments,
    SubscriberContractTerm,
    SubscriberContractEndDate,
}

const ALL_TARGETS: &[TargetField] = &[
    TargetField::ClientOwnerName,
    TargetField::ClientName,
    TargetField::ClientContactPerson,
    TargetField::ClientEmail,
    TargetField::ClientPhone,
    TargetField::ClientAddress,
    TargetField::ClientCity,
    TargetField::ClientZip,
    TargetField::AccountNumber,
    TargetField::AccountType,
    TargetField::AccountStatus,
    TargetField::SubscriberPhone,
    TargetField::SubscriberPlan,
    TargetField::SubscriberMonthlyValue,
    TargetField::SubscriberRemainingPayments,
    TargetField::SubscriberContractTerm,
    TargetField::SubscriberContractEndDate,
];

impl TargetField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::ClientOwnerName => "Client.owner_name",
            Self::ClientName => "Client.name",
            Self::ClientContactPerson => "Client.contact_person",
            Self::ClientEmail => "Client.email",
            Self::ClientPhone => "Client.phone",
            Self::ClientAddress => "Client.address",
            Self::ClientCity => "Client.city",
            Self::ClientZip => "Client.zip",
            Self::AccountNumber => "Account.number",
            Self::AccountType => "Account.type",
            Self::AccountStatus => "Account.status",
            Self::SubscriberPhone => "Subscriber.phone",
            Self::SubscriberPlan => "Subscriber.plan",
            Self::SubscriberMonthlyValue => "Subscriber.monthly_value",
            Self::SubscriberRemainingPayments => "Subscriber.remaining_payments",
            Self::SubscriberContractTerm => "Subscriber.contract_term",
            Self::SubscriberContractEndDate => "Subscriber.contract_end_date",
        }
    }

    pub fn from_key(key: &str) -> Option<TargetField> {
        ALL_TARGETS.iter().find(|t| t.key() == key).copied()
    }
}

// ---------------------------------------------------------------------------
// ColumnMapping
// ---------------------------------------------------------------------------

/// User-supplied mapping from target field to source column header.
/// Validated once at import start; immutable for the whole run.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    entries: Vec<(TargetField, String)>,
}

impl ColumnMapping {
    pub fn from_entries(pairs: &[(String, String)]) -> Result<ColumnMapping> {
        let mut entries: Vec<(TargetField, String)> = Vec::with_capacity(pairs.len());
        for (key, column) in pairs {
            let target = TargetField::from_key(key)
                .ok_or_else(|| SublineError::UnknownMappingTarget(key.clone()))?;
            if entries.iter().any(|(t, _)| *t == target) {
                return Err(SublineError::DuplicateMappingTarget(key.clone()));
            }
            entries.push((target, column.clone()));
        }
        Ok(ColumnMapping { entries })
    }

    /// Parse a mapping file: a JSON object of `"Entity.field": "Source Column"`.
    pub fn from_json_str(json: &str) -> Result<ColumnMapping> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| SublineError::MappingFile(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| SublineError::MappingFile("expected a JSON object".to_string()))?;
        let mut pairs = Vec::with_capacity(object.len());
        for (key, val) in object {
            let column = val.as_str().ok_or_else(|| {
                SublineError::MappingFile(format!("value for '{key}' must be a string"))
            })?;
            pairs.push((key.clone(), column.to_string()));
        }
        ColumnMapping::from_entries(&pairs)
    }

    /// Resolve each mapped column to its index in `headers` once per import.
    /// Columns absent from the header row simply never produce a value.
    pub fn resolve(&self, headers: &[String]) -> ResolvedMapping {
        let slots = self
            .entries
            .iter()
            .map(|(target, column)| {
                let idx = headers.iter().position(|h| h.trim() == column.trim());
                (*target, idx)
            })
            .collect();
        ResolvedMapping { slots }
    }
}

/// A mapping bound to a concrete header row.
pub struct ResolvedMapping {
    slots: Vec<(TargetField, Option<usize>)>,
}

impl ResolvedMapping {
    /// Reshape one raw row into a `MappedRecord`. Pure: trims whitespace,
    /// coerces blanks to `None`, no business validation.
    pub fn map_row(&self, row: &[String]) -> MappedRecord {
        let mut record = MappedRecord::default();
        for (target, idx) in &self.slots {
            let value = idx
                .and_then(|i| row.get(i))
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .map(|cell| cell.to_string());
            if value.is_none() {
                continue;
            }
            match target {
                TargetField::ClientOwnerName => record.client.owner_name = value,
                TargetField::ClientName => record.client.name = value,
                TargetField::ClientContactPerson => record.client.contact_person = value,
                TargetField::ClientEmail => record.client.email = value,
                TargetField::ClientPhone => record.client.phone = value,
                TargetField::ClientAddress => record.client.address = value,
                TargetField::ClientCity => record.client.city = value,
                TargetField::ClientZip => record.client.zip = value,
                TargetField::AccountNumber => record.account.number = value,
                TargetField::AccountType => record.account.ban_type = value,
                TargetField::AccountStatus => record.account.status = value,
                TargetField::SubscriberPhone => record.subscriber.phone = value,
                TargetField::SubscriberPlan => record.subscriber.plan = value,
                TargetField::SubscriberMonthlyValue => record.subscriber.monthly_value = value,
                TargetField::SubscriberRemainingPayments => {
                    record.subscriber.remaining_payments = value
                }
                TargetField::SubscriberContractTerm => record.subscriber.contract_term = value,
                TargetField::SubscriberContractEndDate => {
                    record.subscriber.contract_end_date = value
                }
            }
        }
        record
    }
}
