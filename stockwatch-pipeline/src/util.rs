/// Short, human-readable type name for log lines.
///
/// `"stockwatch_pipeline::components::low_stock_rule::LowStockRule"` becomes
/// `"LowStockRule"`. Generic arguments are dropped, so
/// `"a::Wrapper<b::Inner>"` becomes `"Wrapper"`.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
