//! Application state for the inventory service

use std::sync::Arc;

use crate::reconciler::StockReconciler;

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<StockReconciler>,
}

impl AppState {
    pub fn new(reconciler: Arc<StockReconciler>) -> Self {
        Self { reconciler }
    }
}
