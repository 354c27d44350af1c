#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub name_key: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub vendor_id: Option<i64>,
    pub is_active: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Ban {
    pub id: i64,
    pub client_id: i64,
    pub number: String,
    pub ban_type: Option<String>,
    pub status: String,
    pub is_active: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: i64,
    pub ban_id: i64,
    pub phone: String,
    pub plan: Option<String>,
    pub monthly_value: Option<f64>,
    pub remaining_payments: Option<i64>,
    pub contract_term: Option<i64>,
    pub contract_end_date: Option<String>,
    pub status: String,
    pub is_active: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ClosedDeal {
    pub id: i64,
    pub client_id: i64,
    pub vendor_id: Option<i64>,
    pub company_name: Option<String>,
    pub deal_date: String,
    pub new_lines: i64,
    pub renewed_lines: i64,
    pub total_amount: f64,
}

/// One spreadsheet row reshaped by the field mapper: values grouped by
/// target entity, blanks already coerced to `None`. Built per row, never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct MappedRecord {
    pub client: ClientFields,
    pub account: AccountFields,
    pub subscriber: SubscriberFields,
}

#[derive(Debug, Clone, Default)]
pub struct ClientFields {
    pub owner_name: Option<String>,
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountFields {
    pub number: Option<String>,
    pub ban_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SubscriberFields {
    pub phone: Option<String>,
    pub plan: Option<String>,
    pub monthly_value: Option<String>,
    pub remaining_payments: Option<String>,
    pub contract_term: Option<String>,
    pub contract_end_date: Option<String>,
}
