use tracing::error;

use crate::manager::ErrorHandler;
use crate::WmError;

/// The stock error hook: report and carry on. Whether an error is
/// survivable at all is decided before it gets here; fatal conditions
/// unwind through `run` instead.
pub(crate) struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn call(&self, error: WmError) {
        error!("{}", error)
    }
}
