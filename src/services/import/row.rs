//! Row validation: turns one sheet row (or a manual payload) into an order draft.
//!
//! Every rule runs even after an earlier one failed, so a single pass reports
//! all problems of the row.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::models::OrderType;

use super::columns::{ColumnMap, Field};
use super::format::{ErrorKind, FieldError};
use super::workbook::GridRow;

/// Normalized spec: `<number>*<number>`.
static SPEC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?\*\d+(\.\d+)?$").expect("valid spec pattern"));

static HAN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Han}+$").expect("valid han pattern"));

const DEFAULT_CURRENCY: &str = "CNY";
const TIMESTAMP_FORMAT_HINT: &str = " 格式应为 YYYY-MM-DD HH:mm:ss";

/// Read access to the raw values of one record.
pub trait RowSource {
    /// Trimmed text for `field`; empty when absent.
    fn value(&self, field: Field) -> &str;

    /// Whether the record carries `field` at all (a column exists for it).
    fn has(&self, field: Field) -> bool;
}

/// A sheet row viewed through the detected column layout.
pub struct SheetRow<'a> {
    row: &'a GridRow,
    columns: &'a ColumnMap,
}

impl<'a> SheetRow<'a> {
    pub fn new(row: &'a GridRow, columns: &'a ColumnMap) -> Self {
        Self { row, columns }
    }
}

impl RowSource for SheetRow<'_> {
    fn value(&self, field: Field) -> &str {
        self.columns
            .get(field)
            .map(|col| self.row.cell(col))
            .unwrap_or("")
    }

    fn has(&self, field: Field) -> bool {
        self.columns.contains(field)
    }
}

/// Field values supplied directly, e.g. from a JSON payload.
#[derive(Debug, Clone, Default)]
pub struct FieldValues(HashMap<Field, String>);

impl FieldValues {
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    /// Set `field` only when a value was supplied.
    pub fn set_opt<T: ToString>(&mut self, field: Field, value: Option<T>) {
        if let Some(v) = value {
            self.0.insert(field, v.to_string());
        }
    }
}

impl RowSource for FieldValues {
    fn value(&self, field: Field) -> &str {
        self.0.get(&field).map(|v| v.trim()).unwrap_or("")
    }

    fn has(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }
}

/// Everything a row needs to know about where it came from.
#[derive(Debug, Clone)]
pub struct RowContext<'a> {
    pub sheet: &'a str,
    /// 1-based sheet row number
    pub row: u32,
    pub order_type: OrderType,
    pub default_address: &'a str,
    pub warehouse_codes: Option<&'a HashSet<String>>,
    pub now: DateTime<Utc>,
}

/// Validated, normalized order fields ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub gsp_order_no: String,
    pub order_created_at: DateTime<Utc>,
    pub status: i16,
    pub payment_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub required_sign_at: Option<DateTime<Utc>>,
    pub shipping_warehouse_code: String,
    pub shop_code: String,
    pub product_id: String,
    pub owner_name: String,
    pub product_name: String,
    pub spec: String,
    pub item_no: String,
    pub seller_sku: String,
    pub platform_sku: String,
    pub platform_skc: String,
    pub platform_spu: String,
    pub product_price: f64,
    pub expected_revenue: f64,
    pub special_product_note: Option<String>,
    pub currency_code: String,
    pub expected_fulfillment_qty: i32,
    pub item_count: i32,
    pub postal_code: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub address_line1: String,
    pub address_line2: String,
    pub customer_full_name: String,
    pub customer_last_name: String,
    pub customer_first_name: String,
    pub phone_number: String,
    pub email: String,
    pub tax_number: String,
}

impl OrderDraft {
    /// Key used to find a similar, already stored order.
    pub fn duplicate_key(&self) -> DuplicateKey<'_> {
        DuplicateKey {
            order_type: self.order_type,
            gsp_order_no: &self.gsp_order_no,
            shipping_warehouse_code: (self.order_type == OrderType::Platform)
                .then_some(self.shipping_warehouse_code.as_str()),
            shop_code: &self.shop_code,
            owner_name: &self.owner_name,
            spec: &self.spec,
            item_no: &self.item_no,
            seller_sku: &self.seller_sku,
        }
    }

    /// Value used to auto-link a library material to this order.
    pub fn material_key(&self) -> &str {
        match self.order_type {
            OrderType::Factory => &self.gsp_order_no,
            OrderType::Platform => &self.item_no,
        }
    }
}

/// Natural-key columns compared by the duplicate check. Factory orders ignore
/// the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateKey<'a> {
    pub order_type: OrderType,
    pub gsp_order_no: &'a str,
    pub shipping_warehouse_code: Option<&'a str>,
    pub shop_code: &'a str,
    pub owner_name: &'a str,
    pub spec: &'a str,
    pub item_no: &'a str,
    pub seller_sku: &'a str,
}

/// Either a clean draft or every problem found in the row.
pub type RowOutcome = Result<OrderDraft, Vec<FieldError>>;

/// Lowercase, drop whitespace and read `x` as the multiplication sign.
pub fn normalize_spec(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'x' { '*' } else { c })
        .collect()
}

pub fn is_valid_spec(normalized: &str) -> bool {
    SPEC_PATTERN.is_match(normalized)
}

pub fn is_han_only(text: &str) -> bool {
    HAN_PATTERN.is_match(text)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD` (UTC midnight).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

struct Collector<'c> {
    ctx: &'c RowContext<'c>,
    errors: Vec<FieldError>,
}

impl Collector<'_> {
    fn push(&mut self, field: Field, kind: ErrorKind, detail: impl Into<String>) {
        self.errors.push(FieldError::new(
            self.ctx.sheet,
            self.ctx.row,
            field.label(),
            kind,
            detail,
        ));
    }

    fn required(&mut self, field: Field, value: &str) {
        if value.is_empty() {
            self.push(field, ErrorKind::Required, "");
        }
    }

    fn timestamp(&mut self, source: &impl RowSource, field: Field) -> Option<DateTime<Utc>> {
        let raw = source.value(field);
        if raw.is_empty() {
            return None;
        }
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            self.push(field, ErrorKind::Custom, TIMESTAMP_FORMAT_HINT);
        }
        parsed
    }
}

/// Validate and normalize one record.
pub fn validate_row(source: &impl RowSource, ctx: &RowContext<'_>) -> RowOutcome {
    let mut c = Collector {
        ctx,
        errors: Vec::new(),
    };
    let is_platform = ctx.order_type == OrderType::Platform;
    let text = |field: Field| source.value(field).to_string();

    let gsp_order_no = text(Field::OrderNo);
    c.required(Field::OrderNo, &gsp_order_no);

    let shipping_warehouse_code = text(Field::Warehouse);
    if is_platform && shipping_warehouse_code.is_empty() {
        c.push(Field::Warehouse, ErrorKind::Required, "");
    } else if !shipping_warehouse_code.is_empty()
        && let Some(codes) = ctx.warehouse_codes
        && !codes.contains(&shipping_warehouse_code.to_uppercase())
    {
        c.push(Field::Warehouse, ErrorKind::Dict, shipping_warehouse_code.as_str());
    }

    let shop_code = text(Field::ShopCode);
    c.required(Field::ShopCode, &shop_code);
    let owner_name = text(Field::Owner);
    c.required(Field::Owner, &owner_name);

    let raw_spec = source.value(Field::Spec);
    let spec = normalize_spec(raw_spec);
    if spec.is_empty() {
        c.push(Field::Spec, ErrorKind::Required, "");
    } else if !is_valid_spec(&spec) {
        c.push(Field::Spec, ErrorKind::SpecFormat, "");
    }

    let item_no = text(Field::ItemNo);
    c.required(Field::ItemNo, &item_no);

    let price_raw = source.value(Field::Price);
    let product_price = if price_raw.is_empty() {
        None
    } else {
        match price_raw.parse::<f64>() {
            Ok(p) if p.is_finite() && p >= 0.0 => Some(p),
            _ => {
                c.push(Field::Price, ErrorKind::Numeric, "");
                None
            }
        }
    };

    let qty_raw = source.value(Field::FulfillmentQty);
    let qty = if is_platform {
        if qty_raw.is_empty() {
            c.push(Field::FulfillmentQty, ErrorKind::Required, "");
            None
        } else {
            match qty_raw.parse::<i32>() {
                Ok(q) if q > 0 => Some(q),
                _ => {
                    c.push(Field::FulfillmentQty, ErrorKind::Numeric, "");
                    None
                }
            }
        }
    } else {
        qty_raw.parse::<i32>().ok().filter(|q| *q >= 0)
    };

    let note = source.value(Field::SpecialNote);
    let special_product_note = if note.is_empty() {
        None
    } else {
        if !is_han_only(note) {
            c.push(Field::SpecialNote, ErrorKind::Hanzi, "");
        }
        Some(note.to_string())
    };

    let postal_code = text(Field::PostalCode);
    let country = text(Field::Country);
    let province = text(Field::Province);
    let city = text(Field::City);
    let customer_last_name = text(Field::LastName);
    let customer_first_name = text(Field::FirstName);
    let mut customer_full_name = text(Field::FullName);
    if customer_full_name.is_empty() {
        customer_full_name = format!("{} {}", customer_last_name, customer_first_name)
            .trim()
            .to_string();
    }
    let phone_number = text(Field::Phone);
    let email = text(Field::Email);

    if !is_platform {
        c.required(Field::PostalCode, &postal_code);
        c.required(Field::Country, &country);
        c.required(Field::Province, &province);
        c.required(Field::City, &city);
        c.required(Field::FullName, &customer_full_name);
        c.required(Field::LastName, &customer_last_name);
        c.required(Field::FirstName, &customer_first_name);
        c.required(Field::Phone, &phone_number);
        c.required(Field::Email, &email);
    }

    let mut address_line1 = text(Field::Address1);
    if address_line1.is_empty() {
        address_line1 = ctx.default_address.trim().to_string();
    }

    let mut currency_code = text(Field::Currency);
    if currency_code.is_empty() {
        currency_code = DEFAULT_CURRENCY.to_string();
    }

    let order_created_at = c.timestamp(source, Field::OrderCreatedAt).unwrap_or(ctx.now);
    let payment_time = c.timestamp(source, Field::PaymentTime);
    let completed_at = c.timestamp(source, Field::CompletedAt);
    let required_sign_at = c.timestamp(source, Field::RequiredSignAt);

    let revenue_raw = source.value(Field::ExpectedRevenue);
    let expected_revenue = if revenue_raw.is_empty() {
        None
    } else {
        match revenue_raw.parse::<f64>() {
            Ok(r) if r.is_finite() => Some(r),
            _ => {
                c.push(Field::ExpectedRevenue, ErrorKind::Numeric, "");
                None
            }
        }
    };

    if !c.errors.is_empty() {
        return Err(c.errors);
    }

    let expected_fulfillment_qty = qty.unwrap_or(0);
    let expected_revenue = match (expected_revenue, product_price, qty) {
        (Some(r), _, _) => r,
        (None, Some(p), Some(q)) => p * f64::from(q),
        _ => 0.0,
    };

    Ok(OrderDraft {
        order_type: ctx.order_type,
        gsp_order_no,
        order_created_at,
        status: 0,
        payment_time,
        completed_at,
        required_sign_at,
        shipping_warehouse_code,
        shop_code,
        product_id: text(Field::ProductId),
        owner_name,
        product_name: text(Field::ProductName),
        spec,
        item_no,
        seller_sku: text(Field::SellerSku),
        platform_sku: text(Field::PlatformSku),
        platform_skc: text(Field::PlatformSkc),
        platform_spu: text(Field::PlatformSpu),
        product_price: product_price.unwrap_or(0.0),
        expected_revenue,
        special_product_note,
        currency_code,
        expected_fulfillment_qty,
        item_count: if expected_fulfillment_qty > 0 {
            expected_fulfillment_qty
        } else {
            1
        },
        postal_code,
        country,
        province,
        city,
        district: text(Field::District),
        address_line1,
        address_line2: text(Field::Address2),
        customer_full_name,
        customer_last_name,
        customer_first_name,
        phone_number,
        email,
        tax_number: text(Field::TaxNumber),
    })
}
