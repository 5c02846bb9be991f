pub mod high_value_rule;
pub mod low_stock_rule;
pub mod telegram_notifier;
