/// Column-name constants for the salespulse schema.
/// Single source of truth for loader, filter and aggregation code.

// ── Order columns ───────────────────────────────────────────────────────────
pub mod order {
    pub const ORDER_DATE: &str = "order_date";
    pub const REGION: &str = "region";
    pub const SEGMENT: &str = "segment";
    pub const SHIP_MODE: &str = "ship_mode";
    pub const SUB_CATEGORY: &str = "sub_category";
    pub const SALES: &str = "sales";
    pub const PROFIT: &str = "profit";

    /// Derived at load time: 100 * year + month of the order date.
    pub const ORDER_YEAR_MONTH: &str = "order_year_month";

    /// Columns the input resource must provide.
    pub const REQUIRED: [&str; 7] = [
        ORDER_DATE,
        REGION,
        SEGMENT,
        SHIP_MODE,
        SUB_CATEGORY,
        SALES,
        PROFIT,
    ];
}

// ── Aggregation output columns ──────────────────────────────────────────────
pub mod series {
    /// Quarter label column: quarter start formatted as YYYY-MM.
    pub const QUARTER: &str = "quarter";
}
