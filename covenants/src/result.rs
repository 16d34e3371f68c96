use crate::error::CovenantError;

pub type CovenantResult<T> = std::result::Result<T, CovenantError>;
