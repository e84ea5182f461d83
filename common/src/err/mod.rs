pub mod cdc_error;

pub use cdc_error::{CResult, CdcError};
