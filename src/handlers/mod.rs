//! Method handlers invoked by the dispatcher (C9).

pub mod eth;
