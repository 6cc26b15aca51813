/// unwrap a diesel query result or bail out of the surrounding function
/// with the crate error taxonomy: `NotFound` becomes a not-found signal
/// for the named entity, anything else is logged and wrapped
macro_rules! db_handle_get_error {
    ( $data:expr, $target:expr, $entity:expr, $id:expr) => {
        match $data {
            Ok(e) => e,
            Err(diesel::result::Error::NotFound) => {
                return Err(crate::errors::Error::NotFoundError {
                    entity: $entity,
                    id: $id.to_string(),
                });
            }
            Err(error) => {
                error!(target:$target, "Error getting {}. (error: {})", $entity, error);
                return Err(crate::errors::Error::DatabaseError { source: error });
            }
        }
    };
}

pub(crate) use db_handle_get_error;
