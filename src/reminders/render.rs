//! Template rendering.

use crate::models::customer::Model as CustomerModel;

/// Token replaced by the customer's display name.
pub const CUSTOMER_NAME_PLACEHOLDER: &str = "[CustomerName]";

/// Substitute customer attributes into `template`. Everything other than the
/// placeholder is left as written.
pub fn render(template: &str, customer: &CustomerModel) -> String {
    template.replace(CUSTOMER_NAME_PLACEHOLDER, customer.name.trim())
}
