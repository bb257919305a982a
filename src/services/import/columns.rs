//! Header detection: maps free-form sheet headers onto order fields.

use std::collections::HashMap;

use crate::models::OrderType;

use super::workbook::GridRow;

/// Number of leading rows searched for a header line.
pub const HEADER_SCAN_ROWS: usize = 10;

/// Anchor columns a row must resolve before it is treated as the header.
pub const HEADER_ANCHOR_THRESHOLD: usize = 3;

/// Logical order field a sheet column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    OrderNo,
    OrderCreatedAt,
    RequiredSignAt,
    Warehouse,
    ShopCode,
    Owner,
    ProductId,
    ProductName,
    Spec,
    ItemNo,
    SellerSku,
    PlatformSku,
    PlatformSkc,
    PlatformSpu,
    Price,
    ExpectedRevenue,
    SpecialNote,
    FulfillmentQty,
    Currency,
    PostalCode,
    Country,
    Province,
    City,
    District,
    Address1,
    Address2,
    FullName,
    LastName,
    FirstName,
    Phone,
    Email,
    TaxNumber,
    PaymentTime,
    CompletedAt,
}

impl Field {
    /// Template header text, used when reporting errors.
    pub fn label(self) -> &'static str {
        match self {
            Self::OrderNo => "GSP订单号",
            Self::OrderCreatedAt => "订单创建时间",
            Self::RequiredSignAt => "要求签收时间",
            Self::Warehouse => "发货仓库",
            Self::ShopCode => "店铺编号",
            Self::Owner => "负责人",
            Self::ProductId => "商品ID",
            Self::ProductName => "商品名称",
            Self::Spec => "规格",
            Self::ItemNo => "货号",
            Self::SellerSku => "卖家SKU",
            Self::PlatformSku => "平台SKU",
            Self::PlatformSkc => "平台SKC",
            Self::PlatformSpu => "平台SPU",
            Self::Price => "商品价格",
            Self::ExpectedRevenue => "商品预计收入",
            Self::SpecialNote => "特殊产品备注",
            Self::FulfillmentQty => "应履约件数",
            Self::Currency => "币种",
            Self::PostalCode => "邮编",
            Self::Country => "国家",
            Self::Province => "省份",
            Self::City => "城市",
            Self::District => "区",
            Self::Address1 => "用户地址1",
            Self::Address2 => "用户地址2",
            Self::FullName => "用户全称",
            Self::LastName => "用户姓氏",
            Self::FirstName => "用户名字",
            Self::Phone => "手机号",
            Self::Email => "用户邮箱",
            Self::TaxNumber => "税号",
            Self::PaymentTime => "支付时间",
            Self::CompletedAt => "完成时间",
        }
    }
}

struct AliasRule {
    field: Field,
    keywords: &'static [&'static str],
    excludes: &'static [&'static str],
}

const fn rule(field: Field, keywords: &'static [&'static str]) -> AliasRule {
    AliasRule {
        field,
        keywords,
        excludes: &[],
    }
}

// Order matters: the first rule whose keyword occurs in the normalized header wins,
// so more specific spellings sit above the generic ones ("special" before "spec").
const ALIAS_RULES: &[AliasRule] = &[
    rule(Field::OrderNo, &["gsp订单号", "gsporderid", "gsporderno"]),
    rule(Field::OrderCreatedAt, &["订单创建时间", "ordercreated"]),
    rule(Field::RequiredSignAt, &["要求签收时间", "requiredsign"]),
    rule(Field::Warehouse, &["发货仓库", "warehouse", "shipfrom"]),
    rule(Field::ShopCode, &["店铺编号", "shop", "store"]),
    rule(Field::Owner, &["负责人", "owner"]),
    rule(Field::ProductId, &["商品id", "productid"]),
    rule(Field::ProductName, &["商品名称", "productname", "itemname"]),
    rule(Field::SpecialNote, &["特殊产品备注", "special"]),
    rule(Field::Spec, &["规格", "spec"]),
    rule(Field::ItemNo, &["货号", "itemno"]),
    rule(Field::SellerSku, &["卖家sku", "sellersku"]),
    AliasRule {
        field: Field::PlatformSku,
        keywords: &["平台sku", "platformsku"],
        excludes: &["skc"],
    },
    rule(Field::PlatformSkc, &["平台skc", "platformskc"]),
    rule(Field::PlatformSpu, &["平台spu", "platformspu"]),
    rule(Field::ExpectedRevenue, &["商品预计收入", "expectedrevenue"]),
    rule(Field::Price, &["商品价格", "price"]),
    rule(Field::FulfillmentQty, &["履约件数", "expectedfulfillment", "件数"]),
    rule(Field::Currency, &["币种", "currency"]),
    rule(Field::PostalCode, &["邮编", "postal", "zipcode"]),
    rule(Field::Country, &["国家", "country"]),
    rule(Field::Province, &["省份", "province"]),
    rule(Field::City, &["城市", "city"]),
    rule(Field::Address1, &["用户地址1", "address1", "addressline1"]),
    rule(Field::Address2, &["用户地址2", "address2", "addressline2"]),
    rule(Field::FullName, &["用户全称", "fullname"]),
    rule(Field::LastName, &["用户姓氏", "lastname"]),
    rule(Field::FirstName, &["用户名字", "firstname"]),
    rule(Field::Phone, &["手机号", "phone", "mobile"]),
    rule(Field::Email, &["邮箱", "email"]),
    rule(Field::TaxNumber, &["税号", "tax"]),
    rule(Field::PaymentTime, &["支付时间", "payment"]),
    rule(Field::CompletedAt, &["完成时间", "complete", "finished"]),
    rule(Field::District, &["区", "district"]),
];

const ANCHORS: [Field; 5] = [
    Field::OrderNo,
    Field::ShopCode,
    Field::Owner,
    Field::ProductName,
    Field::Spec,
];

const COMMON_REQUIRED: [Field; 20] = [
    Field::OrderNo,
    Field::ShopCode,
    Field::Owner,
    Field::ProductName,
    Field::Spec,
    Field::ItemNo,
    Field::SellerSku,
    Field::PlatformSku,
    Field::PlatformSkc,
    Field::PlatformSpu,
    Field::Price,
    Field::PostalCode,
    Field::Country,
    Field::Province,
    Field::City,
    Field::FullName,
    Field::LastName,
    Field::FirstName,
    Field::Phone,
    Field::Email,
];

/// Column positions (0-based) resolved for each field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Record `field` at `column` unless the field already has a column.
    pub fn set_if_absent(&mut self, field: Field, column: usize) {
        self.columns.entry(field).or_insert(column);
    }
}

/// Canonical form of a header cell used for alias matching.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter_map(|c| match c {
            '（' | '[' => Some('('),
            '）' | ']' => Some(')'),
            '，' | ',' | '。' | '/' | '\\' | '-' | '_' | ':' | '：' => None,
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect::<String>()
        .to_lowercase()
}

/// Field a single header names, if any.
pub fn match_header(header: &str) -> Option<Field> {
    let title = header.trim();
    if title.is_empty() || title.starts_with('#') {
        return None;
    }
    let normalized = normalize_header(title);
    ALIAS_RULES
        .iter()
        .find(|r| {
            r.keywords.iter().any(|k| normalized.contains(k))
                && !r.excludes.iter().any(|x| normalized.contains(x))
        })
        .map(|r| r.field)
}

/// Map a header row to field positions. A field keeps the first column naming it.
pub fn detect_columns(headers: &[String]) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(field) = match_header(header) {
            map.set_if_absent(field, idx);
        }
    }
    map
}

/// Whether enough anchor columns were found for the row to count as a header.
pub fn looks_like_header(map: &ColumnMap) -> bool {
    ANCHORS.iter().filter(|f| map.contains(**f)).count() >= HEADER_ANCHOR_THRESHOLD
}

/// Columns that must be present for the given order type.
pub fn required_fields(order_type: OrderType) -> Vec<Field> {
    let mut fields = COMMON_REQUIRED.to_vec();
    if order_type == OrderType::Platform {
        fields.push(Field::Warehouse);
        fields.push(Field::FulfillmentQty);
    }
    fields
}

/// Required columns absent from `map`, in declaration order.
pub fn missing_required(map: &ColumnMap, order_type: OrderType) -> Vec<Field> {
    required_fields(order_type)
        .into_iter()
        .filter(|f| !map.contains(*f))
        .collect()
}

/// Fill fields that detection left unset with the legacy fixed layout.
pub fn apply_fallback_layout(map: &mut ColumnMap, order_type: OrderType) {
    if order_type == OrderType::Platform {
        map.set_if_absent(Field::Warehouse, 1);
    }
    map.set_if_absent(Field::ShopCode, 2);
    map.set_if_absent(Field::Owner, 3);
    map.set_if_absent(Field::Spec, 5);
    map.set_if_absent(Field::ItemNo, 6);
    map.set_if_absent(Field::SpecialNote, 12);
    map.set_if_absent(Field::FulfillmentQty, 13);
}

/// Outcome of the header search over a sheet.
#[derive(Debug, Clone)]
pub struct HeaderLayout {
    /// Position in the row list of the header row; `None` when the fallback was used.
    pub header_position: Option<usize>,
    /// 1-based sheet row number of the header (1 for the fallback layout).
    pub header_row_number: u32,
    pub columns: ColumnMap,
    pub missing: Vec<Field>,
}

impl HeaderLayout {
    /// Index of the first data row in the row list.
    pub fn data_start(&self) -> usize {
        self.header_position.map(|p| p + 1).unwrap_or(1)
    }
}

/// Find the header within the first rows of a sheet, falling back to the fixed
/// layout when no row qualifies.
pub fn locate_header(rows: &[GridRow], order_type: OrderType) -> HeaderLayout {
    let found = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .map(|(pos, row)| (pos, row.number, detect_columns(&row.cells)))
        .find(|(_, _, map)| looks_like_header(map));

    let (header_position, header_row_number, mut columns) = match found {
        Some((pos, number, map)) => (Some(pos), number, map),
        None => (None, 1, ColumnMap::default()),
    };

    apply_fallback_layout(&mut columns, order_type);
    let missing = missing_required(&columns, order_type);

    HeaderLayout {
        header_position,
        header_row_number,
        columns,
        missing,
    }
}
