pub mod create_supplier_command;
pub mod delete_supplier_command;
pub mod update_supplier_command;

pub use create_supplier_command::CreateSupplierCommand;
pub use delete_supplier_command::DeleteSupplierCommand;
pub use update_supplier_command::UpdateSupplierCommand;

use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::*;
use uuid::Uuid;

use crate::{entities::supplier, errors::ServiceError};

lazy_static! {
    /// CNPJ, bare (`12345678000195`) or punctuated (`12.345.678/0001-95`).
    pub(crate) static ref CNPJ_PATTERN: Regex =
        Regex::new(r"^\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}$").unwrap();
}

/// Fails with `Conflict` when another supplier already holds `cnpj`.
pub(crate) async fn ensure_cnpj_available(
    db: &DatabaseConnection,
    cnpj: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = supplier::Entity::find().filter(supplier::Column::Cnpj.eq(cnpj));
    if let Some(id) = except {
        query = query.filter(supplier::Column::Id.ne(id));
    }
    let taken = query
        .one(db)
        .await
        .map_err(ServiceError::DatabaseError)?
        .is_some();
    if taken {
        return Err(ServiceError::Conflict(format!(
            "CNPJ {} is already registered",
            cnpj
        )));
    }
    Ok(())
}
