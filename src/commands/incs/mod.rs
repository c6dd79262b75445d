pub mod create_inc_command;
pub mod delete_inc_command;
pub mod update_inc_command;

pub use create_inc_command::CreateIncCommand;
pub use delete_inc_command::DeleteIncCommand;
pub use update_inc_command::UpdateIncCommand;

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Item codes look like `MPR.02199`.
    static ref ITEM_CODE: Regex = Regex::new(r"^[A-Z]{3}\.\d{5}$").unwrap();
}

/// Item codes are accepted in any case and stored upper-cased.
pub fn normalize_item_code(item: &str) -> String {
    item.trim().to_uppercase()
}

pub(crate) fn validate_item_code(item: &str) -> Result<(), ValidationError> {
    if ITEM_CODE.is_match(&normalize_item_code(item)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("item_code");
        err.message = Some("Item must follow the format AAA.00000".into());
        Err(err)
    }
}

pub(crate) fn check_quantities(received: f64, defective: f64) -> Result<(), ValidationError> {
    if defective > received {
        let mut err = ValidationError::new("quantity_defective");
        err.message =
            Some("Defective quantity cannot exceed the quantity received".into());
        return Err(err);
    }
    Ok(())
}
