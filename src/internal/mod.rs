//! Internal implementation details.

mod dispose_bag;

pub(crate) use dispose_bag::{AsyncHook, BoxFutureUnit, DisposeBag, SyncHook};

use std::any::Any;

/// Renders a panic payload as a readable message.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
