//! Chat message rendering (Markdown, emoji-annotated).
//!
//! The text layout is free-form; the field set per alert type is not.
//! Alert and reorder text is sent with the legacy Markdown parse mode, so
//! every interpolated value goes through `escape_markdown`. Product and
//! supplier cards are plain console text.

use crate::catalog::ProductView;
use crate::types::{Alert, ReorderRecommendation, Supplier};

/// Backslash-escape the characters legacy Markdown treats as entity
/// delimiters: `_`, `*`, `` ` `` and `[`.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render an alert: bold title line, blank, detail lines, blank, timestamp.
pub fn format_alert(alert: &Alert, timestamp: &str) -> String {
    let mut lines = Vec::with_capacity(alert.detail_lines.len() + 4);
    lines.push(format!("{} *{}*", alert.emoji, escape_markdown(&alert.title)));
    lines.push(String::new());
    lines.extend(alert.detail_lines.iter().map(|line| escape_markdown(line)));
    lines.push(String::new());
    lines.push(format!("\u{1f552} {}", escape_markdown(timestamp)));
    lines.join("\n")
}

pub fn format_recommendation(rec: &ReorderRecommendation) -> String {
    [
        format!(
            "\u{1f4ca} *Reorder Analysis for {}*",
            escape_markdown(&rec.product_name)
        ),
        String::new(),
        rec.status.to_string(),
        String::new(),
        format!("Current Stock: {} units", rec.current_stock),
        format!("Reorder Point: {} units", rec.reorder_point),
        format!("Lead Time: {} days", rec.lead_time_days),
        String::new(),
        "\u{1f4e6} Recommendation:".to_string(),
        format!(
            "   Quantity to Order: {} units ({} urgency)",
            rec.recommended_qty, rec.urgency
        ),
        format!(
            "   Supplier: {} ({})",
            escape_markdown(&rec.supplier_name),
            escape_markdown(&rec.supplier_id)
        ),
        format!("   Expected Delivery: {} days from order", rec.lead_time_days),
        format!("   Estimated Cost: ${:.2} (wholesale)", rec.estimated_cost),
    ]
    .join("\n")
}

pub fn format_product(view: &ProductView) -> String {
    let p = &view.product;
    [
        format!("\u{1f4e6} Product: {}", p.name),
        format!("   SKU: {}", p.id),
        format!("   Category: {}", p.category),
        format!("   Price: ${:.2}", p.base_price),
        format!("   Stock: {} units", p.stock),
        format!("   Reorder Point: {} units", p.reorder_point),
        format!("   Lead Time: {} days", p.lead_time_days),
        format!("   Supplier: {}", view.supplier_name),
    ]
    .join("\n")
}

pub fn format_supplier(supplier: &Supplier) -> String {
    [
        format!("\u{1f3ed} {} (ID: {})", supplier.name, supplier.id),
        format!("   \u{1f4de} Contact: {}", supplier.contact),
        format!("   \u{1f4e7} Email: {}", supplier.email),
        format!("   \u{2b50} Rating: {:.1}/5", supplier.rating),
        format!("   \u{23f1}\u{fe0f} Avg Lead Time: {} days", supplier.avg_lead_time_days),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertType, ReorderStatus, Urgency};

    #[test]
    fn alert_layout() {
        let alert = Alert {
            alert_type: AlertType::HighValue,
            emoji: "\u{1f680}".into(),
            title: "High-Value Sale Detected!".into(),
            detail_lines: vec!["a".into(), "b".into()],
        };
        let text = format_alert(&alert, "2025-01-01T10:00:00");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\u{1f680} *High-Value Sale Detected!*");
        assert_eq!(lines[1], "");
        assert_eq!(&lines[2..4], &["a", "b"]);
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "\u{1f552} 2025-01-01T10:00:00");
    }

    #[test]
    fn recommendation_mentions_quantity_and_cost() {
        let rec = ReorderRecommendation {
            product_id: "SKU005".into(),
            product_name: "Winter Jacket".into(),
            current_stock: 2,
            reorder_point: 3,
            urgency: Urgency::High,
            status: ReorderStatus::Urgent,
            recommended_qty: 12,
            supplier_id: "SUP002".into(),
            supplier_name: "Premium Apparel Ltd.".into(),
            lead_time_days: 14,
            estimated_cost: 1079.928,
        };
        let text = format_recommendation(&rec);
        assert!(text.contains("URGENT"));
        assert!(text.contains("Quantity to Order: 12 units (high urgency)"));
        assert!(text.contains("$1079.93"));
        assert!(text.contains("Premium Apparel Ltd."));
    }

    #[test]
    fn interpolated_values_are_escaped_but_title_stays_bold() {
        let alert = Alert {
            alert_type: AlertType::LowStock,
            emoji: "\u{26a0}\u{fe0f}".into(),
            title: "Low Stock Alert!".into(),
            detail_lines: vec![
                "\u{1f4e6} Product: Tee *limited* [v2]".into(),
                "\u{1f3ea} Last Sale: Online_Store".into(),
            ],
        };
        let text = format_alert(&alert, "2025-01-01T10:00:00");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\u{26a0}\u{fe0f} *Low Stock Alert!*");
        assert_eq!(lines[2], "\u{1f4e6} Product: Tee \\*limited\\* \\[v2]");
        assert_eq!(lines[3], "\u{1f3ea} Last Sale: Online\\_Store");
    }

    #[test]
    fn recommendation_escapes_names() {
        let rec = ReorderRecommendation {
            product_id: "SKU_9".into(),
            product_name: "Snow_Boot".into(),
            current_stock: 0,
            reorder_point: 1,
            urgency: Urgency::Low,
            status: ReorderStatus::Urgent,
            recommended_qty: 2,
            supplier_id: "SUP_1".into(),
            supplier_name: "Acme_Co".into(),
            lead_time_days: 3,
            estimated_cost: 10.0,
        };
        let text = format_recommendation(&rec);
        assert!(text.starts_with("\u{1f4ca} *Reorder Analysis for Snow\\_Boot*"));
        assert!(text.contains("Supplier: Acme\\_Co (SUP\\_1)"));
    }

    #[test]
    fn escape_leaves_plain_text_alone() {
        assert_eq!(escape_markdown("Berlin 01 $299.98"), "Berlin 01 $299.98");
        assert_eq!(escape_markdown("a_b`c"), "a\\_b\\`c");
    }
}
